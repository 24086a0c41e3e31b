//! Eager (whole-document) slicing entry points.
//!
//! The batch walks pages 1..=N strictly in order, one at a time:
//!
//! ```text
//! for page in 1..=N:
//!     extract ──▶ normalize ──▶ export single page ──▶ ProcessedPage
//! ```
//!
//! A page whose extraction yields a sentinel is still exported, under its
//! placeholder name. The one exception is a missing API credential: it would
//! fail identically on every page, so the batch stops on the first page with
//! [`SlicerError::MissingCredential`].
//!
//! Use [`crate::stream::slice_stream`] to receive pages as they complete.

use crate::config::SlicerConfig;
use crate::error::SlicerError;
use crate::extract::Extractor;
use crate::output::{DocumentInfo, ProcessedPage, SliceOutput, SliceStats};
use crate::pipeline::export;
use crate::pipeline::input;
use crate::pipeline::normalize::normalize;
use crate::pipeline::pdfium::PdfiumPageSource;
use crate::pipeline::source::{run_blocking, PageSource, SourceDocument};
use crate::progress::{progress_fraction, NoopProgressCallback, ProgressCallback};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Slice a PDF file or URL.
///
/// # Errors
/// Only fatal errors: unreadable input, a document the page source cannot
/// decode, a failed page export, a missing vision credential, or (text
/// strategy) an unreadable text layer. Per-page extraction failures are
/// reported as placeholder names in the output.
pub async fn slice(
    input_str: impl AsRef<str>,
    config: &SlicerConfig,
) -> Result<SliceOutput, SlicerError> {
    let input_str = input_str.as_ref();
    info!("Slicing: {}", input_str);
    let document = input::load_input(input_str, config.download_timeout_secs).await?;
    slice_document(document, resolve_source(config), config).await
}

/// Slice an in-memory PDF.
///
/// # Example
/// ```rust,no_run
/// use boleto_slicer::{slice_bytes, ExtractionStrategy, SlicerConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("boletos.pdf")?;
/// let config = SlicerConfig::builder()
///     .strategy(ExtractionStrategy::Text)
///     .build()?;
/// let output = slice_bytes(bytes, &config).await?;
/// for page in &output.pages {
///     println!("{} -> {}", page.page_num, page.file_name);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn slice_bytes(
    bytes: impl Into<Vec<u8>>,
    config: &SlicerConfig,
) -> Result<SliceOutput, SlicerError> {
    let bytes = bytes.into();
    input::check_magic(&bytes)?;
    slice_document(SourceDocument::new(bytes), resolve_source(config), config).await
}

/// Slice an already-loaded document through an explicit page source.
pub async fn slice_document(
    document: SourceDocument,
    source: Arc<dyn PageSource>,
    config: &SlicerConfig,
) -> Result<SliceOutput, SlicerError> {
    let start = Instant::now();
    let mut batch = Batch::prepare(document, source, config).await?;

    let mut pages = Vec::with_capacity(batch.total_pages());
    for page_num in 1..=batch.total_pages() {
        match batch.process_page(page_num).await {
            Ok(page) => pages.push(page),
            Err(e) => {
                batch.fail(&e);
                return Err(e);
            }
        }
    }

    let stats = SliceStats::from_pages(
        &pages,
        batch.extractor.strategy(),
        start.elapsed().as_millis() as u64,
    );
    batch.finish(stats.identified_pages);
    info!(
        "Slicing complete: {}/{} pages identified, {}ms",
        stats.identified_pages, stats.total_pages, stats.duration_ms
    );

    Ok(SliceOutput { pages, stats })
}

/// Slice a PDF and write one file per page into `dir`.
///
/// Files are named `<identifier>.pdf`; a later page with an already-used
/// identifier is written as `<identifier>_<page>.pdf`.
pub async fn slice_to_dir(
    input_str: impl AsRef<str>,
    dir: impl AsRef<Path>,
    config: &SlicerConfig,
) -> Result<SliceOutput, SlicerError> {
    let output = slice(input_str, config).await?;
    export::write_pages(dir.as_ref(), &output.pages).await?;
    Ok(output)
}

/// Synchronous wrapper around [`slice`].
///
/// Creates a temporary tokio runtime internally.
pub fn slice_sync(
    input_str: impl AsRef<str>,
    config: &SlicerConfig,
) -> Result<SliceOutput, SlicerError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SlicerError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(slice(input_str, config))
}

/// Page count and size of a PDF, without extraction.
///
/// Does not require an API key. Uses the configured page source, password
/// and download timeout; the strategy settings are ignored.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &SlicerConfig,
) -> Result<DocumentInfo, SlicerError> {
    let document = input::load_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let source = resolve_source(config);
    let bytes = document.fresh_copy();
    let page_count = run_blocking(&source, move |s| s.page_count(bytes)).await?;
    Ok(DocumentInfo {
        page_count,
        size_bytes: document.len(),
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// The configured page source, or pdfium.
pub(crate) fn resolve_source(config: &SlicerConfig) -> Arc<dyn PageSource> {
    match &config.page_source {
        Some(source) => Arc::clone(source),
        None => Arc::new(PdfiumPageSource::new().with_password(config.password.clone())),
    }
}

/// State of one running batch, shared by the eager and streaming APIs.
pub(crate) struct Batch {
    document: SourceDocument,
    source: Arc<dyn PageSource>,
    extractor: Extractor,
    callback: ProgressCallback,
    total_pages: usize,
    claimed_names: HashSet<String>,
}

impl Batch {
    /// Build the extractor and count pages. Fires `on_slice_start`.
    pub(crate) async fn prepare(
        document: SourceDocument,
        source: Arc<dyn PageSource>,
        config: &SlicerConfig,
    ) -> Result<Self, SlicerError> {
        let callback = config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback));

        let prepared = async {
            let extractor = Extractor::from_config(config)?;
            let bytes = document.fresh_copy();
            let total_pages = run_blocking(&source, move |s| s.page_count(bytes)).await?;
            Ok::<_, SlicerError>((extractor, total_pages))
        }
        .await;

        let (extractor, total_pages) = match prepared {
            Ok(p) => p,
            Err(e) => {
                callback.on_slice_error(&e.to_string());
                return Err(e);
            }
        };

        info!(
            "PDF has {} pages, strategy {}",
            total_pages,
            extractor.strategy()
        );
        callback.on_slice_start(total_pages);

        Ok(Self {
            document,
            source,
            extractor,
            callback,
            total_pages,
            claimed_names: HashSet::new(),
        })
    }

    pub(crate) fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Extract, normalize and export one page.
    pub(crate) async fn process_page(&mut self, page_num: usize) -> Result<ProcessedPage, SlicerError> {
        let total = self.total_pages;
        self.callback.on_page_start(page_num, total);

        let raw = self
            .extractor
            .extract(&self.source, &self.document, page_num)
            .await?;

        if raw.is_missing_credential() {
            return Err(SlicerError::MissingCredential {
                env_var: self.extractor.credential_env().unwrap_or("(none)").to_string(),
            });
        }

        let identifier = normalize(&raw, page_num);
        if let Some(reason) = raw.sentinel() {
            warn!("Page {}: no identifier ({}), using {}", page_num, reason, identifier);
            self.callback.on_page_degraded(page_num, total, reason);
        } else if identifier.is_placeholder() {
            warn!("Page {}: unusable candidate {:?}, using {}", page_num, raw.as_str(), identifier);
        }

        let bytes = self.document.fresh_copy();
        let pdf_bytes =
            run_blocking(&self.source, move |s| s.extract_page(bytes, page_num)).await?;

        let file_name = self.claim_file_name(&identifier.to_string(), page_num);
        debug!("Page {}: {} -> {}", page_num, raw.as_str(), file_name);
        self.callback
            .on_page_complete(page_num, total, &identifier.to_string());
        debug!(
            "Batch {:.0}% done",
            progress_fraction(page_num, total) * 100.0
        );

        Ok(ProcessedPage {
            page_num,
            identifier,
            file_name,
            raw_candidate: raw,
            pdf_bytes,
        })
    }

    pub(crate) fn fail(&self, error: &SlicerError) {
        self.callback.on_slice_error(&error.to_string());
    }

    pub(crate) fn finish(&self, identified: usize) {
        self.callback.on_slice_complete(self.total_pages, identified);
    }

    /// `<label>.pdf`, or `<label>_<page>.pdf` if an earlier page took it.
    fn claim_file_name(&mut self, label: &str, page_num: usize) -> String {
        let name = format!("{label}.pdf");
        if self.claimed_names.insert(name.clone()) {
            return name;
        }
        let name = format!("{label}_{page_num}.pdf");
        self.claimed_names.insert(name.clone());
        name
    }
}
