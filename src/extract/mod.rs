//! Document text extraction for office attachments.
//!
//! Two formats are recognized, dispatched on the attachment's file
//! extension:
//!
//! - `.pdf` via `pdf-extract`
//! - `.docx` via `docx-rs`
//!
//! Both parsers are synchronous and run inside `spawn_blocking`. A parser
//! panic surfaces as [`ExtractError::TaskJoin`] instead of unwinding into the
//! worker.

mod docx;
mod pdf;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use crate::error::ExtractError;
pub use pdf::join_pages;

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// A document format the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Classify a file name by its extension (case-insensitive).
    ///
    /// Returns `None` for anything that is not `.pdf` or `.docx`.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lower.ends_with(".docx") {
            Some(Self::Docx)
        } else {
            None
        }
    }

    /// Extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Docx => ".docx",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        };
        write!(f, "{s}")
    }
}

/// Converts a document on disk into plain text.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Text of every page, in page order, concatenated.
    async fn read_pdf(&self, path: &Path) -> ExtractResult<String>;

    /// Text of the document body, in document order.
    async fn read_docx(&self, path: &Path) -> ExtractResult<String>;

    /// Dispatch on `kind`.
    async fn extract(&self, path: &Path, kind: DocumentKind) -> ExtractResult<String> {
        match kind {
            DocumentKind::Pdf => self.read_pdf(path).await,
            DocumentKind::Docx => self.read_docx(path).await,
        }
    }

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// Production extractor backed by `pdf-extract` and `docx-rs`.
#[derive(Debug, Clone, Default)]
pub struct OfficeExtractor;

impl OfficeExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentExtractor for OfficeExtractor {
    async fn read_pdf(&self, path: &Path) -> ExtractResult<String> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || pdf::read_pdf_sync(&path)).await?
    }

    async fn read_docx(&self, path: &Path) -> ExtractResult<String> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || docx::read_docx_sync(&path)).await?
    }

    fn name(&self) -> &str {
        "office"
    }
}
