//! PDF text extraction using pdf-extract.

use std::path::Path;

use crate::error::ExtractError;

/// Read a PDF and return the text of all pages in order.
///
/// Called within `spawn_blocking`.
pub(super) fn read_pdf_sync(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| ExtractError::Pdf(format!("Failed to parse PDF: {e}")))?;
    Ok(join_pages(pages.iter().map(|page| strip_page_break(page))))
}

/// pdf-extract starts each page with the line breaks it emits when moving
/// from its initial pen position to the first glyph. Those are not page
/// content.
fn strip_page_break(page: &str) -> &str {
    page.trim_start_matches(['\r', '\n'])
}

/// Concatenate page texts in order. No separator is inserted; whatever
/// whitespace the parser emitted is kept.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages.into_iter().fold(String::new(), |mut acc, page| {
        acc.push_str(page.as_ref());
        acc
    })
}
