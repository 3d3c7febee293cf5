//! Text extraction from the disclosure form.
//!
//! The pre-check compares checklist points against the form's text with a
//! plain substring search, so the text is normalised for that: lower-cased,
//! every whitespace run (including line breaks) collapsed to one space,
//! pages concatenated in page order.
//!
//! lopdf parsing is synchronous; async callers run [`extract_text`] inside
//! `tokio::task::spawn_blocking`.

use crate::error::AnalyzerError;
use lopdf::Document;
use tracing::{debug, warn};

/// Normalised text of a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
    /// Pages whose text could not be decoded and were skipped.
    pub failed_pages: Vec<u32>,
}

/// Lower-case and collapse whitespace.
pub fn normalize_text(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract and normalise the text of every page of `bytes`.
///
/// A page whose content cannot be decoded is skipped with a warning; the
/// call fails only when the file cannot be parsed at all or no page yields
/// text.
pub fn extract_text(bytes: &[u8]) -> Result<ExtractedText, AnalyzerError> {
    let doc = Document::load_mem(bytes).map_err(|e| AnalyzerError::PdfExtraction {
        detail: e.to_string(),
    })?;

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Err(AnalyzerError::PdfExtraction {
            detail: "document has no pages".into(),
        });
    }

    let mut parts = Vec::with_capacity(pages.len());
    let mut failed_pages = Vec::new();
    for &page in &pages {
        match doc.extract_text(&[page]) {
            Ok(text) => parts.push(text),
            Err(e) => {
                warn!("Skipping page {}: {}", page, e);
                failed_pages.push(page);
            }
        }
    }

    if parts.is_empty() {
        return Err(AnalyzerError::PdfExtraction {
            detail: format!("no text could be decoded from any of {} page(s)", pages.len()),
        });
    }

    let text = normalize_text(&parts.join(" "));
    debug!(
        "Extracted {} chars from {} page(s) ({} skipped)",
        text.len(),
        pages.len(),
        failed_pages.len()
    );

    Ok(ExtractedText {
        text,
        page_count: pages.len(),
        failed_pages,
    })
}
