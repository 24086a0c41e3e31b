//! Progress-callback trait for per-page slicing events.
//!
//! Inject an [`Arc<dyn SliceProgressCallback>`] via
//! [`crate::config::SlicerConfigBuilder::progress_callback`] to receive
//! events as the orchestrator walks the document.
//!
//! Pages are processed strictly in order, one at a time, so events for a
//! batch never interleave. The trait is still `Send + Sync` because the
//! streaming entry point drives the batch from a spawned task.
//!
//! # Example
//!
//! ```rust
//! use boleto_slicer::{SliceProgressCallback, SlicerConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl SliceProgressCallback for Counter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, label: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{page_num}/{total_pages} -> {label}.pdf");
//!     }
//! }
//!
//! let config = SlicerConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::candidate::Sentinel;
use std::sync::Arc;

/// Called by the orchestrator as it processes each page.
///
/// All methods default to no-ops.
pub trait SliceProgressCallback: Send + Sync {
    /// Once, after the page count is known and before page 1.
    fn on_slice_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Before extraction starts for a page.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// After a page is exported, with its final label (identifier or
    /// placeholder).
    fn on_page_complete(&self, page_num: usize, total_pages: usize, label: &str) {
        let _ = (page_num, total_pages, label);
    }

    /// When extraction yielded a sentinel and the page falls back to its
    /// placeholder. Fired before `on_page_complete` for the same page.
    fn on_page_degraded(&self, page_num: usize, total_pages: usize, reason: Sentinel) {
        let _ = (page_num, total_pages, reason);
    }

    /// Once, after the last page.
    ///
    /// # Arguments
    /// * `identified`: pages labelled with a real identifier
    fn on_slice_complete(&self, total_pages: usize, identified: usize) {
        let _ = (total_pages, identified);
    }

    /// When the batch aborts. No further events follow.
    fn on_slice_error(&self, error: &str) {
        let _ = error;
    }
}

/// Default when no callback is configured.
pub struct NoopProgressCallback;

impl SliceProgressCallback for NoopProgressCallback {}

/// Type stored in [`crate::config::SlicerConfig`].
pub type ProgressCallback = Arc<dyn SliceProgressCallback>;

/// Fraction of the batch done, in `0.0..=1.0`; `0.0` for an empty batch.
pub fn progress_fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (done.min(total) as f64) / (total as f64)
}
