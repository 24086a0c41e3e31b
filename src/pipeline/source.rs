//! The page-source seam: everything the pipeline needs from a PDF backend.
//!
//! The orchestrator never touches pdfium directly. It receives an
//! `Arc<dyn PageSource>` (see [`crate::config::SlicerConfig::page_source`])
//! so tests can substitute an in-memory fake and the backend's global setup
//! (library binding, paths) stays out of the core.
//!
//! ## Why owned `Vec<u8>` arguments?
//!
//! Decoders consume their input buffer. Each call therefore receives a fresh
//! copy of the source document ([`SourceDocument::fresh_copy`]) instead of a
//! shared cursor, so page-count, per-page extraction and per-page export stay
//! independent of each other.

use crate::error::SlicerError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The uploaded multi-page PDF. Immutable; cloned cheaply.
#[derive(Clone)]
pub struct SourceDocument {
    bytes: Arc<[u8]>,
}

impl SourceDocument {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// A new owned copy of the original bytes for one independent read.
    pub fn fresh_copy(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One positioned run of text from a page's drawing operations.
///
/// Coordinates are PDF user space: `y` grows towards the top of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

impl TextItem {
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

/// Trusted PDF backend. All page numbers are 1-based.
///
/// Every method fails with a decode error when `bytes` is not a valid
/// document and with [`SlicerError::PageOutOfRange`] when `page_num` is not
/// in `1..=page_count`. Implementations are blocking; the pipeline calls
/// them through [`run_blocking`].
pub trait PageSource: Send + Sync {
    fn page_count(&self, bytes: Vec<u8>) -> Result<usize, SlicerError>;

    /// Rasterise the page at `scale` times its natural size.
    fn page_as_image(
        &self,
        bytes: Vec<u8>,
        page_num: usize,
        scale: f32,
    ) -> Result<DynamicImage, SlicerError>;

    /// Positioned text runs, in no particular order.
    fn page_as_text(&self, bytes: Vec<u8>, page_num: usize) -> Result<Vec<TextItem>, SlicerError>;

    /// The page as a standalone single-page PDF.
    fn extract_page(&self, bytes: Vec<u8>, page_num: usize) -> Result<Vec<u8>, SlicerError>;
}

/// Run a blocking page-source call on tokio's blocking pool.
pub async fn run_blocking<T, F>(source: &Arc<dyn PageSource>, f: F) -> Result<T, SlicerError>
where
    T: Send + 'static,
    F: FnOnce(&dyn PageSource) -> Result<T, SlicerError> + Send + 'static,
{
    let source = Arc::clone(source);
    tokio::task::spawn_blocking(move || f(source.as_ref()))
        .await
        .map_err(|e| SlicerError::Internal(format!("Page source task panicked: {e}")))?
}

/// Validate a 1-based page number against the document's page count.
pub fn check_page(page_num: usize, total: usize) -> Result<(), SlicerError> {
    if page_num == 0 || page_num > total {
        return Err(SlicerError::PageOutOfRange {
            page: page_num,
            total,
        });
    }
    Ok(())
}
