//! # boleto-slicer
//!
//! Split a multi-page PDF of Brazilian bank payment slips (boletos) into one
//! single-page PDF per page, each named after the "Num. do Documento" printed
//! on it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      local file or URL, loaded once into memory
//!  ├─ 2. Extract    per page, one of:
//!  │                  vision: render → vision model → reply cleanup
//!  │                  text:   reading order → pattern cascade
//!  ├─ 3. Normalize  digits and hyphens only, else BOLETO-PAG-<page>
//!  ├─ 4. Export     page copied into its own single-page PDF
//!  └─ 5. Output     <identifier>.pdf files, optional BOLETOS_<millis>.zip
//! ```
//!
//! Pages are processed one at a time, in order. A page whose identifier
//! cannot be read is still exported under its placeholder name; only fatal
//! errors (unreadable document, missing API key, ...) stop the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use boleto_slicer::{slice_to_dir, SlicerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Vision strategy; reads GEMINI_API_KEY.
//!     let config = SlicerConfig::default();
//!     let output = slice_to_dir("boletos.pdf", "./boletos", &config).await?;
//!     eprintln!(
//!         "{} pages, {} identified",
//!         output.stats.total_pages, output.stats.identified_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Choosing a Strategy
//!
//! | Strategy | Needs            | Good for                                |
//! |----------|------------------|-----------------------------------------|
//! | `vision` | API key, network | scanned slips with no usable text layer |
//! | `text`   | embedded text    | offline, deterministic runs             |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `boleto-slicer` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod candidate;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod slice;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use candidate::{NormalizedIdentifier, RawCandidate, Sentinel};
pub use config::{ExtractionStrategy, SlicerConfig, SlicerConfigBuilder};
pub use error::SlicerError;
pub use extract::Extractor;
pub use output::{DocumentInfo, ProcessedPage, SliceOutput, SliceStats};
pub use pipeline::normalize::normalize;
pub use pipeline::pdfium::PdfiumPageSource;
pub use pipeline::source::{PageSource, SourceDocument, TextItem};
pub use progress::{progress_fraction, NoopProgressCallback, ProgressCallback, SliceProgressCallback};
pub use slice::{inspect, slice, slice_bytes, slice_document, slice_sync, slice_to_dir};
pub use stream::{slice_stream, slice_stream_from_bytes, PageStream};
