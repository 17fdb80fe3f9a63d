//! Case-insensitive keyword matching.

/// A keyword hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    /// The keyword as configured (original casing).
    pub keyword: String,
    /// Its position in the configured list.
    pub position: usize,
}

/// Ordered keyword list; the first keyword contained in the text wins.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    /// (configured, lower-cased) pairs in configured order.
    keywords: Vec<(String, String)>,
}

impl KeywordMatcher {
    /// Build from keywords in priority order. Blank entries are dropped.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.trim().is_empty())
            .map(|k| {
                let lower = k.to_lowercase();
                (k, lower)
            })
            .collect();
        Self { keywords }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Configured keywords, in order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|(k, _)| k.as_str())
    }

    /// First keyword (in configured order) that occurs in `text`,
    /// ignoring case.
    pub fn find(&self, text: &str) -> Option<KeywordMatch> {
        if self.keywords.is_empty() {
            return None;
        }
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .enumerate()
            .find(|(_, (_, lower))| haystack.contains(lower.as_str()))
            .map(|(position, (keyword, _))| KeywordMatch {
                keyword: keyword.clone(),
                position,
            })
    }
}
