//! Chapter scanner
//!
//! Sequentially walks the extracted pages, corrects each page header
//! through the LLM, and detects "ตอนที่ N" headings. One generation call
//! per page, in page order; a failed call falls back to matching the raw
//! header, so a flaky upstream never aborts the scan.

use crate::chapters::{find_chapter_number, fold_chapter_starts, page_header, ChapterRange, ChapterStart};
use crate::pdf::PageText;
use crate::prompt;
use std::sync::Arc;
use thaidoc_common::config::ExtractionConfig;
use thaidoc_common::llm::TextGenerator;
use tracing::{debug, info, instrument, warn};

pub struct ChapterScanner {
    generator: Arc<dyn TextGenerator>,
    header_lines: usize,
    header_max_chars: usize,
}

impl ChapterScanner {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &ExtractionConfig) -> Self {
        Self {
            generator,
            header_lines: config.header_lines,
            header_max_chars: config.header_max_chars,
        }
    }

    /// Map the chapters `[start_chapter, end_chapter]` to page ranges.
    ///
    /// Scanning stops once a heading past `end_chapter` is seen; that
    /// heading still closes the page range of the last requested chapter.
    #[instrument(skip(self, pages), fields(pages = pages.len(), start_chapter, end_chapter))]
    pub async fn map_chapters(
        &self,
        pages: &[PageText],
        start_chapter: u32,
        end_chapter: u32,
    ) -> Vec<ChapterRange> {
        let last_page = pages.last().map(|p| p.number).unwrap_or(0);
        let mut starts: Vec<ChapterStart> = Vec::new();
        let mut last_seen: Option<u32> = None;

        for page in pages {
            let header = page_header(&page.text, self.header_lines, self.header_max_chars);
            if header.is_empty() {
                continue;
            }

            let corrected = match self
                .generator
                .generate(&prompt::header_prompt(&header), None)
                .await
            {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(
                        page = page.number,
                        error = %e,
                        "Header correction failed, matching raw header"
                    );
                    None
                }
            };

            let detected = corrected
                .as_deref()
                .and_then(find_chapter_number)
                .or_else(|| find_chapter_number(&header));

            let Some(chapter) = detected else { continue };
            if last_seen == Some(chapter) {
                continue;
            }
            last_seen = Some(chapter);

            debug!(page = page.number, chapter, "Detected chapter heading");
            starts.push(ChapterStart {
                chapter,
                page: page.number,
            });

            // Headings are ascending; anything past the range only serves
            // as the closing boundary recorded above
            if chapter > end_chapter {
                break;
            }
        }

        let ranges = fold_chapter_starts(&starts, start_chapter, end_chapter, last_page);
        info!(
            headings = starts.len(),
            chapters = ranges.len(),
            "Chapter scan complete"
        );

        ranges
    }
}
