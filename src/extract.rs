//! Identifier extraction: one strategy per deployment.
//!
//! [`Extractor`] is a closed enum rather than a trait object because the two
//! strategies differ in what they fail with: vision degrades every failure
//! to a sentinel, while text reconstruction treats an unreadable page as
//! fatal.

use crate::candidate::RawCandidate;
use crate::config::{ExtractionStrategy, SlicerConfig};
use crate::error::SlicerError;
use crate::pipeline::cascade::find_document_number;
use crate::pipeline::source::{run_blocking, PageSource, SourceDocument};
use crate::pipeline::vision::VisionExtractor;
use std::sync::Arc;
use tracing::debug;

/// Offline strategy: reading order + pattern cascade.
///
/// A page without any embedded text is treated as unreadable and aborts the
/// batch.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    pub line_tolerance: f32,
}

impl TextExtractor {
    pub async fn extract(
        &self,
        source: &Arc<dyn PageSource>,
        doc: &SourceDocument,
        page_num: usize,
    ) -> Result<RawCandidate, SlicerError> {
        let bytes = doc.fresh_copy();
        let items = run_blocking(source, move |s| s.page_as_text(bytes, page_num)).await?;
        debug!("Page {}: {} text items", page_num, items.len());
        // Image-only page: nothing for the cascade to read.
        if items.iter().all(|item| item.text.trim().is_empty()) {
            return Err(SlicerError::TextExtractionFailed {
                page: page_num,
                detail: "no embedded text layer".into(),
            });
        }
        Ok(find_document_number(&items, self.line_tolerance))
    }
}

#[derive(Debug)]
pub enum Extractor {
    Vision(VisionExtractor),
    Text(TextExtractor),
}

impl Extractor {
    pub fn from_config(config: &SlicerConfig) -> Result<Self, SlicerError> {
        Ok(match config.strategy {
            ExtractionStrategy::Vision => Extractor::Vision(VisionExtractor::from_config(config)?),
            ExtractionStrategy::Text => Extractor::Text(TextExtractor {
                line_tolerance: config.line_tolerance,
            }),
        })
    }

    pub fn strategy(&self) -> ExtractionStrategy {
        match self {
            Extractor::Vision(_) => ExtractionStrategy::Vision,
            Extractor::Text(_) => ExtractionStrategy::Text,
        }
    }

    /// Variable to name when a missing credential aborts the batch.
    pub fn credential_env(&self) -> Option<&str> {
        match self {
            Extractor::Vision(v) => Some(v.credential_env()),
            Extractor::Text(_) => None,
        }
    }

    /// Raw candidate for one page. Page-local failures are sentinels; an
    /// error here is fatal for the batch.
    pub async fn extract(
        &self,
        source: &Arc<dyn PageSource>,
        doc: &SourceDocument,
        page_num: usize,
    ) -> Result<RawCandidate, SlicerError> {
        match self {
            Extractor::Vision(v) => v.extract(source, doc, page_num).await,
            Extractor::Text(t) => t.extract(source, doc, page_num).await,
        }
    }
}
