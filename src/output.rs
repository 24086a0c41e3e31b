//! Result types produced by the orchestrator.

use crate::candidate::{NormalizedIdentifier, RawCandidate};
use crate::config::ExtractionStrategy;
use serde::Serialize;

/// One processed page, in page order. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedPage {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    pub identifier: NormalizedIdentifier,
    /// Output file name. `<identifier>.pdf`, or `<identifier>_<page>.pdf`
    /// when an earlier page already claimed the identifier.
    pub file_name: String,
    /// What the extractor returned before normalization.
    pub raw_candidate: RawCandidate,
    /// The page as a standalone single-page PDF.
    #[serde(skip)]
    pub pdf_bytes: Vec<u8>,
}

impl ProcessedPage {
    /// Whether the page fell back to its positional placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.identifier.is_placeholder()
    }
}

/// Aggregate statistics for a finished batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SliceStats {
    pub total_pages: usize,
    pub identified_pages: usize,
    pub placeholder_pages: usize,
    pub strategy: Option<ExtractionStrategy>,
    pub duration_ms: u64,
}

impl SliceStats {
    pub fn from_pages(pages: &[ProcessedPage], strategy: ExtractionStrategy, duration_ms: u64) -> Self {
        let placeholder_pages = pages.iter().filter(|p| p.is_placeholder()).count();
        Self {
            total_pages: pages.len(),
            identified_pages: pages.len() - placeholder_pages,
            placeholder_pages,
            strategy: Some(strategy),
            duration_ms,
        }
    }
}

/// Complete output of an eager slicing run.
#[derive(Debug, Clone, Serialize)]
pub struct SliceOutput {
    pub pages: Vec<ProcessedPage>,
    pub stats: SliceStats,
}

/// Document facts available without extraction.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub size_bytes: usize,
}
