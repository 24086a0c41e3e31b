//! Streaming slicing API: emit pages as they complete.
//!
//! Runs the same sequential batch as [`crate::slice::slice`] in one spawned
//! task that feeds a bounded channel. Pages arrive in page order. After a
//! fatal error the stream yields that `Err` and ends; no later page is
//! attempted. Dropping the stream stops the batch at its next send.
//!
//! Input loading, the page count and the extractor setup happen before the
//! stream is returned, so those failures surface as the outer `Err`.

use crate::config::SlicerConfig;
use crate::error::SlicerError;
use crate::output::ProcessedPage;
use crate::pipeline::input;
use crate::pipeline::source::SourceDocument;
use crate::slice::{resolve_source, Batch};
use futures::Stream;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

/// A boxed stream of processed pages.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<ProcessedPage, SlicerError>> + Send>>;

/// Pages buffered ahead of a slow consumer.
const CHANNEL_CAPACITY: usize = 2;

/// Slice a PDF file or URL, streaming pages as they are ready.
///
/// # Example
/// ```rust,no_run
/// use boleto_slicer::{slice_stream, SlicerConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SlicerConfig::default();
/// let mut pages = slice_stream("boletos.pdf", &config).await?;
/// while let Some(page) = pages.next().await {
///     let page = page?;
///     println!("page {} -> {}", page.page_num, page.file_name);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn slice_stream(
    input_str: impl AsRef<str>,
    config: &SlicerConfig,
) -> Result<PageStream, SlicerError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming slice: {}", input_str);
    let document = input::load_input(input_str, config.download_timeout_secs).await?;
    start_stream(document, config).await
}

/// Streaming equivalent of [`crate::slice::slice_bytes`].
pub async fn slice_stream_from_bytes(
    bytes: impl Into<Vec<u8>>,
    config: &SlicerConfig,
) -> Result<PageStream, SlicerError> {
    let bytes = bytes.into();
    input::check_magic(&bytes)?;
    start_stream(SourceDocument::new(bytes), config).await
}

async fn start_stream(
    document: SourceDocument,
    config: &SlicerConfig,
) -> Result<PageStream, SlicerError> {
    let mut batch = Batch::prepare(document, resolve_source(config), config).await?;
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut identified = 0;
        for page_num in 1..=batch.total_pages() {
            match batch.process_page(page_num).await {
                Ok(page) => {
                    if !page.is_placeholder() {
                        identified += 1;
                    }
                    if tx.send(Ok(page)).await.is_err() {
                        debug!("Page stream dropped after page {}", page_num);
                        return;
                    }
                }
                Err(e) => {
                    batch.fail(&e);
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
        batch.finish(identified);
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}
