//! PDF text extraction module
//!
//! Extracts per-page text content from uploaded PDF bytes using lopdf.

use crate::errors::ExtractionError;
use tracing::{debug, warn};

/// Extracted text of a single page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number
    pub number: u32,
    /// Cleaned page text; empty when the page has no text layer
    pub text: String,
}

/// A PDF document loaded from uploaded bytes
pub struct PdfDocument {
    doc: lopdf::Document,
}

impl PdfDocument {
    /// Parse a document from raw upload bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractionError> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractionError::PdfParse {
            message: format!("Failed to load PDF: {}", e),
        })?;

        Ok(Self { doc })
    }

    /// Number of pages in the document
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Extract the text of one page (1-based)
    pub fn page_text(&self, page: u32) -> Result<String, ExtractionError> {
        let total = self.page_count();
        if page == 0 || page > total {
            return Err(ExtractionError::PageOutOfRange { page, total });
        }

        let raw = self
            .doc
            .extract_text(&[page])
            .map_err(|e| ExtractionError::PdfParse {
                message: format!("Failed to extract text from page {}: {}", page, e),
            })?;

        Ok(clean_page_text(&raw))
    }

    /// Extract every page of the document.
    ///
    /// A page that fails to extract is logged and skipped; it does not
    /// abort the document. Pages without a text layer come back empty.
    pub fn pages(&self) -> Vec<PageText> {
        let total = self.page_count();
        debug!(page_count = total, "Extracting text from PDF");

        let mut pages = Vec::with_capacity(total as usize);
        for number in 1..=total {
            match self.page_text(number) {
                Ok(text) => pages.push(PageText { number, text }),
                Err(e) => {
                    warn!(page = number, error = %e, "Failed to extract text from page, skipping");
                }
            }
        }

        pages
    }
}

/// Clean extracted page text: collapse runs of whitespace within each line,
/// drop blank lines, keep the line structure.
fn clean_page_text(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
