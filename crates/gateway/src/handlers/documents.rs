//! PDF upload and correction handlers

use crate::AppState;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use thaidoc_common::errors::AppError;
use thaidoc_common::metrics;
use thaidoc_extraction::{PageCorrector, PageText, PdfDocument};
use tracing::{info, instrument};

#[derive(Serialize)]
pub struct ProcessPdfResponse {
    pub filename: String,
    pub page_read: u32,
    pub corrected_text: String,
}

struct ProcessPdfUpload {
    filename: String,
    bytes: axum::body::Bytes,
    page: Option<u32>,
}

/// Extract one page of an uploaded PDF and correct it through the LLM.
///
/// The page defaults to the configured one (page 2: Thai novel PDFs carry
/// a cover on page 1).
#[instrument(skip_all)]
pub async fn process_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProcessPdfResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    validate_pdf_filename(&upload.filename)?;

    let page_number = upload.page.unwrap_or(state.config.extraction.default_page);

    let doc = PdfDocument::from_bytes(&upload.bytes)?;
    let text = doc.page_text(page_number)?;
    let page = PageText {
        number: page_number,
        text,
    };

    let corrector = PageCorrector::new(state.generator.clone());
    let corrected_text = corrector.correct_page(&page).await?;

    metrics::record_document_processed(1);
    info!(
        filename = %upload.filename,
        page = page_number,
        "PDF page corrected"
    );

    Ok(Json(ProcessPdfResponse {
        filename: upload.filename,
        page_read: page_number,
        corrected_text,
    }))
}

async fn read_upload(mut multipart: Multipart) -> Result<ProcessPdfUpload, AppError> {
    let mut filename = None;
    let mut bytes = None;
    let mut page = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                bytes = Some(field.bytes().await?);
                filename = file_name;
            }
            Some("page") => {
                let value = field.text().await?;
                page = Some(parse_field::<u32>("page", &value)?);
            }
            _ => {}
        }
    }

    let filename = filename.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;
    let bytes = bytes.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;

    Ok(ProcessPdfUpload {
        filename,
        bytes,
        page,
    })
}

/// Parse a numeric multipart text field
pub(crate) fn parse_field<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AppError> {
    value.trim().parse().map_err(|_| AppError::InvalidFormat {
        message: format!("field '{}' is not a valid number: {}", name, value),
    })
}

/// Uploads must carry a .pdf filename
pub(crate) fn validate_pdf_filename(filename: &str) -> Result<(), AppError> {
    if filename.to_lowercase().ends_with(".pdf") {
        Ok(())
    } else {
        Err(AppError::Validation {
            message: format!("'{}' is not a PDF file", filename),
            field: Some("file".to_string()),
        })
    }
}
