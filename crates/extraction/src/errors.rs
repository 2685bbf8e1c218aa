//! Extraction error types

use thaidoc_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF parse error: {message}")]
    PdfParse { message: String },

    #[error("page {page} is out of range: document has {total} pages")]
    PageOutOfRange { page: u32, total: u32 },

    #[error("page {page} contains no extractable text")]
    EmptyPage { page: u32 },
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::PdfParse { message } => AppError::PdfParse { message },
            ExtractionError::PageOutOfRange { page, total } => {
                AppError::PageOutOfRange { page, total }
            }
            ExtractionError::EmptyPage { page } => AppError::EmptyPage { page },
        }
    }
}
