//! Chapter mapping handlers

use super::documents::{parse_field, validate_pdf_filename};
use crate::AppState;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use std::time::Instant;
use thaidoc_common::errors::AppError;
use thaidoc_common::metrics;
use thaidoc_extraction::{ChapterRange, ChapterScanner, PdfDocument};
use tracing::{info, instrument};
use validator::Validate;

#[derive(Serialize)]
pub struct MapChaptersResponse {
    pub chapters: Vec<ChapterRange>,
}

#[derive(Debug, Validate)]
struct ChapterRangeParams {
    #[validate(range(min = 1))]
    start_chapter: u32,
    #[validate(range(min = 1))]
    end_chapter: u32,
}

/// Scan an uploaded novel PDF for "ตอนที่ N" headings and map the requested
/// chapter range to page ranges.
#[instrument(skip_all)]
pub async fn map_chapters(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MapChaptersResponse>, AppError> {
    let mut filename = None;
    let mut bytes = None;
    let mut start_chapter = None;
    let mut end_chapter = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                bytes = Some(field.bytes().await?);
                filename = file_name;
            }
            Some("start_chapter") => {
                let value = field.text().await?;
                start_chapter = Some(parse_field::<u32>("start_chapter", &value)?);
            }
            Some("end_chapter") => {
                let value = field.text().await?;
                end_chapter = Some(parse_field::<u32>("end_chapter", &value)?);
            }
            _ => {}
        }
    }

    let filename = filename.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;
    validate_pdf_filename(&filename)?;

    let bytes = bytes.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;

    let params = ChapterRangeParams {
        start_chapter: start_chapter.ok_or_else(|| AppError::MissingField {
            field: "start_chapter".to_string(),
        })?,
        end_chapter: end_chapter.ok_or_else(|| AppError::MissingField {
            field: "end_chapter".to_string(),
        })?,
    };

    params.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;
    if params.start_chapter > params.end_chapter {
        return Err(AppError::Validation {
            message: "start_chapter must not exceed end_chapter".to_string(),
            field: Some("start_chapter".to_string()),
        });
    }

    let start = Instant::now();

    let doc = PdfDocument::from_bytes(&bytes)?;
    let pages = doc.pages();

    let scanner = ChapterScanner::new(state.generator.clone(), &state.config.extraction);
    let chapters = scanner
        .map_chapters(&pages, params.start_chapter, params.end_chapter)
        .await;

    metrics::record_chapter_scan(start.elapsed().as_secs_f64(), chapters.len());
    info!(
        filename = %filename,
        pages = pages.len(),
        chapters = chapters.len(),
        "Chapter map complete"
    );

    Ok(Json(MapChaptersResponse { chapters }))
}
