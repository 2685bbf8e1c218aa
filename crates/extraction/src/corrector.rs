//! Full-page LLM correction service

use crate::errors::ExtractionError;
use crate::pdf::PageText;
use crate::prompt;
use std::sync::Arc;
use thaidoc_common::errors::Result;
use thaidoc_common::llm::TextGenerator;
use tracing::{debug, instrument};

/// Corrects extracted page text through the configured generator
pub struct PageCorrector {
    generator: Arc<dyn TextGenerator>,
}

impl PageCorrector {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Send one extracted page to the LLM and return the corrected text.
    ///
    /// A page without extractable text is rejected before any generation
    /// call is made.
    #[instrument(skip(self, page), fields(page = page.number))]
    pub async fn correct_page(&self, page: &PageText) -> Result<String> {
        if page.text.trim().is_empty() {
            return Err(ExtractionError::EmptyPage { page: page.number }.into());
        }

        let prompt = prompt::page_prompt(&page.text);
        let corrected = self.generator.generate(&prompt, None).await?;

        debug!(
            input_len = page.text.len(),
            output_len = corrected.len(),
            "Page corrected"
        );

        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thaidoc_common::errors::AppError;
    use thaidoc_common::llm::MockGenerator;

    fn page(number: u32, text: &str) -> PageText {
        PageText {
            number,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn corrects_page_through_generator() {
        let generator = Arc::new(MockGenerator::with_response("ข้อความที่แก้ไขแล้ว"));
        let corrector = PageCorrector::new(generator);

        let corrected = corrector
            .correct_page(&page(2, "ขอ้ความทีเ่พีย้น"))
            .await
            .unwrap();
        assert_eq!(corrected, "ข้อความที่แก้ไขแล้ว");
    }

    #[tokio::test]
    async fn rejects_empty_page() {
        let generator = Arc::new(MockGenerator::new());
        let corrector = PageCorrector::new(generator);

        let err = corrector.correct_page(&page(2, "  \n ")).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyPage { page: 2 }));
    }
}
