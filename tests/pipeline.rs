//! Integration tests for the slicing pipeline.
//!
//! An in-memory `PageSource` stands in for pdfium, so these run without
//! the native library, network access or an API key.

use boleto_slicer::{
    slice_bytes, slice_document, slice_stream_from_bytes, slice_to_dir, ExtractionStrategy,
    NormalizedIdentifier, PageSource, RawCandidate, Sentinel, SliceProgressCallback,
    SlicerConfig, SlicerError, SourceDocument, TextItem,
};
use async_trait::async_trait;
use edgequake_llm::{
    ChatMessage, CompletionOptions, LLMProvider, LLMResponse, LlmError, MockProvider,
};
use futures::StreamExt;
use image::{DynamicImage, RgbaImage};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const PDF: &[u8] = b"%PDF-1.7 fake multi-page document";

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs through the test harness; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Page source backed by per-page text items.
#[derive(Default)]
struct FakeSource {
    pages: Vec<Vec<TextItem>>,
    /// Page whose text layer cannot be read.
    unreadable_page: Option<usize>,
    renders: AtomicUsize,
    exports: Mutex<Vec<usize>>,
    /// Set when a call received anything but a full copy of the document.
    saw_consumed_buffer: Mutex<bool>,
}

impl FakeSource {
    fn with_pages(pages: Vec<Vec<TextItem>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    fn check_bytes(&self, bytes: &[u8]) {
        if bytes != PDF {
            *self.saw_consumed_buffer.lock().unwrap() = true;
        }
    }

    fn check_page(&self, page_num: usize) -> Result<(), SlicerError> {
        if page_num == 0 || page_num > self.pages.len() {
            return Err(SlicerError::PageOutOfRange {
                page: page_num,
                total: self.pages.len(),
            });
        }
        Ok(())
    }
}

impl PageSource for FakeSource {
    fn page_count(&self, bytes: Vec<u8>) -> Result<usize, SlicerError> {
        self.check_bytes(&bytes);
        Ok(self.pages.len())
    }

    fn page_as_image(
        &self,
        bytes: Vec<u8>,
        page_num: usize,
        _scale: f32,
    ) -> Result<DynamicImage, SlicerError> {
        self.check_bytes(&bytes);
        self.check_page(page_num)?;
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(DynamicImage::ImageRgba8(RgbaImage::new(8, 8)))
    }

    fn page_as_text(&self, bytes: Vec<u8>, page_num: usize) -> Result<Vec<TextItem>, SlicerError> {
        self.check_bytes(&bytes);
        self.check_page(page_num)?;
        if self.unreadable_page == Some(page_num) {
            return Err(SlicerError::TextExtractionFailed {
                page: page_num,
                detail: "no text layer".into(),
            });
        }
        Ok(self.pages[page_num - 1].clone())
    }

    fn extract_page(&self, bytes: Vec<u8>, page_num: usize) -> Result<Vec<u8>, SlicerError> {
        self.check_bytes(&bytes);
        self.check_page(page_num)?;
        self.exports.lock().unwrap().push(page_num);
        Ok(format!("%PDF-1.7 single page {page_num}").into_bytes())
    }
}

fn slip_with_date_pair(code: &str) -> Vec<TextItem> {
    vec![
        TextItem::new("Banco Bradesco S.A.", 20.0, 800.0),
        TextItem::new("Nosso Número 09/00001234567-8", 300.0, 760.0),
        TextItem::new("Data do Documento", 20.0, 700.0),
        TextItem::new("Num. do Documento", 150.0, 700.4),
        TextItem::new("06/11/2025", 20.0, 688.0),
        TextItem::new(code, 150.0, 687.2),
    ]
}

fn slip_with_isolated_code(code: &str) -> Vec<TextItem> {
    vec![
        TextItem::new("Pagador: EMPRESA EXEMPLO LTDA", 20.0, 500.0),
        TextItem::new("Referência", 20.0, 480.0),
        TextItem::new(code, 120.0, 480.0),
    ]
}

fn slip_without_code() -> Vec<TextItem> {
    vec![
        TextItem::new("Recibo do Pagador", 20.0, 800.0),
        TextItem::new("Vencimento 10/12/2025", 20.0, 700.0),
    ]
}

fn text_config(source: Arc<FakeSource>) -> SlicerConfig {
    init_tracing();
    SlicerConfig::builder()
        .strategy(ExtractionStrategy::Text)
        .page_source(source)
        .build()
        .unwrap()
}

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl SliceProgressCallback for RecordingCallback {
    fn on_slice_start(&self, total_pages: usize) {
        self.events.lock().unwrap().push(format!("start {total_pages}"));
    }
    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.events.lock().unwrap().push(format!("page {page_num}"));
    }
    fn on_page_degraded(&self, page_num: usize, _total_pages: usize, reason: Sentinel) {
        self.events
            .lock()
            .unwrap()
            .push(format!("degraded {page_num} {reason}"));
    }
    fn on_page_complete(&self, page_num: usize, _total_pages: usize, label: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {page_num} {label}"));
    }
    fn on_slice_complete(&self, total_pages: usize, identified: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete {identified}/{total_pages}"));
    }
    fn on_slice_error(&self, _error: &str) {
        self.events.lock().unwrap().push("error".to_string());
    }
}

// ── Text strategy ────────────────────────────────────────────────────────────

#[tokio::test]
async fn date_adjacent_code_names_the_file() {
    let source = Arc::new(FakeSource::with_pages(vec![slip_with_date_pair("24277-4")]));
    let output = slice_bytes(PDF, &text_config(source.clone())).await.unwrap();

    let page = &output.pages[0];
    assert_eq!(page.raw_candidate, RawCandidate::Value("24277-4".into()));
    assert_eq!(page.identifier, NormalizedIdentifier::Identifier("24277-4".into()));
    assert_eq!(page.file_name, "24277-4.pdf");
    assert_eq!(page.pdf_bytes, b"%PDF-1.7 single page 1");
}

#[tokio::test]
async fn isolated_code_found_without_date_pair() {
    let source = Arc::new(FakeSource::with_pages(vec![slip_with_isolated_code("00012-3")]));
    let output = slice_bytes(PDF, &text_config(source)).await.unwrap();
    assert_eq!(output.pages[0].file_name, "00012-3.pdf");
}

#[tokio::test]
async fn page_without_code_gets_positional_placeholder() {
    let mut pages: Vec<Vec<TextItem>> = (0..6)
        .map(|i| slip_with_isolated_code(&format!("1000{i}-{i}")))
        .collect();
    pages.push(slip_without_code());
    let source = Arc::new(FakeSource::with_pages(pages));

    let output = slice_bytes(PDF, &text_config(source.clone())).await.unwrap();

    assert_eq!(output.pages.len(), 7);
    let last = &output.pages[6];
    assert_eq!(last.page_num, 7);
    assert_eq!(last.raw_candidate, RawCandidate::Sentinel(Sentinel::NotFound));
    assert_eq!(last.identifier.to_string(), "BOLETO-PAG-7");
    assert_eq!(last.file_name, "BOLETO-PAG-7.pdf");
    assert_eq!(output.stats.identified_pages, 6);
    assert_eq!(output.stats.placeholder_pages, 1);
    assert_eq!(*source.exports.lock().unwrap(), vec![1, 2, 3, 4, 5, 6, 7]);
}

#[tokio::test]
async fn every_read_gets_a_fresh_copy() {
    let source = Arc::new(FakeSource::with_pages(vec![
        slip_with_date_pair("24277-4"),
        slip_without_code(),
    ]));
    slice_bytes(PDF, &text_config(source.clone())).await.unwrap();
    assert!(!*source.saw_consumed_buffer.lock().unwrap());
}

#[tokio::test]
async fn duplicate_identifiers_do_not_overwrite() {
    let source = Arc::new(FakeSource::with_pages(vec![
        slip_with_date_pair("24277-4"),
        slip_with_date_pair("24277-4"),
        slip_with_date_pair("24277-4"),
    ]));
    let output = slice_bytes(PDF, &text_config(source)).await.unwrap();
    let names: Vec<_> = output.pages.iter().map(|p| p.file_name.as_str()).collect();
    assert_eq!(names, vec!["24277-4.pdf", "24277-4_2.pdf", "24277-4_3.pdf"]);
}

#[tokio::test]
async fn unreadable_text_layer_aborts_the_batch() {
    let source = Arc::new(FakeSource {
        unreadable_page: Some(2),
        ..FakeSource::with_pages(vec![
            slip_with_date_pair("24277-4"),
            slip_with_date_pair("11111-1"),
            slip_with_date_pair("22222-2"),
        ])
    });
    let err = slice_bytes(PDF, &text_config(source.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, SlicerError::TextExtractionFailed { page: 2, .. }));
    assert_eq!(*source.exports.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn image_only_document_aborts_instead_of_placeholders() {
    let source = Arc::new(FakeSource::with_pages(vec![vec![], vec![], vec![]]));
    let err = slice_bytes(PDF, &text_config(source.clone()))
        .await
        .unwrap_err();
    match err {
        SlicerError::TextExtractionFailed { page, detail } => {
            assert_eq!(page, 1);
            assert_eq!(detail, "no embedded text layer");
        }
        other => panic!("expected TextExtractionFailed, got {other:?}"),
    }
    assert!(source.exports.lock().unwrap().is_empty());
}

#[tokio::test]
async fn blank_text_items_count_as_no_text_layer() {
    let source = Arc::new(FakeSource::with_pages(vec![
        slip_with_date_pair("24277-4"),
        vec![TextItem::new("  ", 10.0, 700.0), TextItem::new("", 10.0, 600.0)],
    ]));
    let err = slice_bytes(PDF, &text_config(source.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, SlicerError::TextExtractionFailed { page: 2, .. }));
    assert_eq!(*source.exports.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn progress_events_follow_page_order() {
    let source = Arc::new(FakeSource::with_pages(vec![
        slip_with_date_pair("24277-4"),
        slip_without_code(),
    ]));
    let recorder = Arc::new(RecordingCallback::default());
    let config = SlicerConfig::builder()
        .strategy(ExtractionStrategy::Text)
        .page_source(source)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    slice_bytes(PDF, &config).await.unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "start 2",
            "page 1",
            "done 1 24277-4",
            "page 2",
            "degraded 2 NAO_ENCONTRADO",
            "done 2 BOLETO-PAG-2",
            "complete 1/2",
        ]
    );
}

#[tokio::test]
async fn non_pdf_bytes_are_rejected() {
    let source = Arc::new(FakeSource::with_pages(vec![slip_without_code()]));
    let err = slice_bytes(b"GIF89a...".to_vec(), &text_config(source))
        .await
        .unwrap_err();
    assert!(matches!(err, SlicerError::NotAPdf { .. }));
}

#[tokio::test]
async fn empty_document_yields_empty_output() {
    let source = Arc::new(FakeSource::with_pages(vec![]));
    let output = slice_bytes(PDF, &text_config(source)).await.unwrap();
    assert!(output.pages.is_empty());
    assert_eq!(output.stats.total_pages, 0);
}

// ── Vision strategy ──────────────────────────────────────────────────────────

/// Provider that fails a set number of calls, then answers `reply`. An
/// optional delay makes every call outlive short timeouts.
struct ScriptedProvider {
    failures_left: AtomicUsize,
    calls: AtomicUsize,
    delay: Option<std::time::Duration>,
    reply: String,
}

impl ScriptedProvider {
    fn failing_then(failures: usize, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
            delay: None,
            reply: reply.to_string(),
        })
    }

    fn always_failing() -> Arc<Self> {
        Self::failing_then(usize::MAX, "unused")
    }

    fn slow(delay: std::time::Duration, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            delay: Some(delay),
            reply: reply.to_string(),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-vision"
    }

    fn max_context_length(&self) -> usize {
        4096
    }

    async fn complete(&self, _prompt: &str) -> edgequake_llm::Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(LlmError::NetworkError("connection reset by peer".into()));
        }
        Ok(LLMResponse::new(self.reply.clone(), "scripted-vision"))
    }

    async fn complete_with_options(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.complete(prompt).await
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _options: Option<&CompletionOptions>,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.complete("").await
    }
}

fn vision_config(
    source: Arc<FakeSource>,
    provider: Arc<dyn LLMProvider>,
    max_retries: u32,
) -> SlicerConfig {
    init_tracing();
    SlicerConfig::builder()
        .strategy(ExtractionStrategy::Vision)
        .provider(provider)
        .max_retries(max_retries)
        .retry_backoff_ms(1)
        .page_source(source)
        .build()
        .unwrap()
}

fn two_slips() -> Arc<FakeSource> {
    Arc::new(FakeSource::with_pages(vec![
        slip_with_date_pair("24277-4"),
        slip_with_date_pair("11111-1"),
    ]))
}

#[tokio::test]
async fn vision_reply_with_label_names_the_file() {
    let mock = MockProvider::new();
    mock.add_response("Num. do Documento: 05551-2").await;
    mock.add_response("NAO_ENCONTRADO").await;
    let source = two_slips();

    let output = slice_bytes(PDF, &vision_config(source.clone(), Arc::new(mock), 2))
        .await
        .unwrap();

    let names: Vec<_> = output.pages.iter().map(|p| p.file_name.as_str()).collect();
    assert_eq!(names, vec!["05551-2.pdf", "BOLETO-PAG-2.pdf"]);
    assert_eq!(output.pages[0].raw_candidate, RawCandidate::Value("05551-2".into()));
    assert_eq!(
        output.pages[1].raw_candidate,
        RawCandidate::Sentinel(Sentinel::NotFound)
    );
    assert_eq!(output.stats.strategy, Some(ExtractionStrategy::Vision));
    assert_eq!(source.renders.load(Ordering::SeqCst), 2);
    assert!(!*source.saw_consumed_buffer.lock().unwrap());
}

#[tokio::test]
async fn provider_failure_degrades_page_and_batch_continues() {
    let provider = ScriptedProvider::always_failing();
    let source = two_slips();
    let recorder = Arc::new(RecordingCallback::default());
    let config = SlicerConfig::builder()
        .provider(provider.clone())
        .max_retries(2)
        .retry_backoff_ms(1)
        .page_source(source.clone())
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let output = slice_bytes(PDF, &config).await.unwrap();

    let names: Vec<_> = output.pages.iter().map(|p| p.file_name.as_str()).collect();
    assert_eq!(names, vec!["BOLETO-PAG-1.pdf", "BOLETO-PAG-2.pdf"]);
    assert_eq!(
        output.pages[0].raw_candidate,
        RawCandidate::Sentinel(Sentinel::ModelError)
    );
    // One call plus two retries per page.
    assert_eq!(provider.calls(), 6);
    assert_eq!(*source.exports.lock().unwrap(), vec![1, 2]);
    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "start 2",
            "page 1",
            "degraded 1 ERRO_IA",
            "done 1 BOLETO-PAG-1",
            "page 2",
            "degraded 2 ERRO_IA",
            "done 2 BOLETO-PAG-2",
            "complete 0/2",
        ]
    );
}

#[tokio::test]
async fn transient_failures_are_retried_until_a_reply() {
    let provider = ScriptedProvider::failing_then(2, "24277-4");
    let source = Arc::new(FakeSource::with_pages(vec![slip_with_date_pair("24277-4")]));

    let output = slice_bytes(PDF, &vision_config(source, provider.clone(), 2))
        .await
        .unwrap();

    assert_eq!(output.pages[0].file_name, "24277-4.pdf");
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn retries_disabled_means_a_single_attempt() {
    let provider = ScriptedProvider::failing_then(1, "24277-4");
    let source = Arc::new(FakeSource::with_pages(vec![slip_with_date_pair("24277-4")]));

    let output = slice_bytes(PDF, &vision_config(source, provider.clone(), 0))
        .await
        .unwrap();

    assert_eq!(output.pages[0].file_name, "BOLETO-PAG-1.pdf");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn slow_provider_times_out_as_model_error() {
    let provider = ScriptedProvider::slow(std::time::Duration::from_secs(5), "24277-4");
    let source = Arc::new(FakeSource::with_pages(vec![slip_with_date_pair("24277-4")]));
    let config = SlicerConfig::builder()
        .provider(provider.clone())
        .max_retries(0)
        .api_timeout_secs(1)
        .page_source(source)
        .build()
        .unwrap();

    let output = slice_bytes(PDF, &config).await.unwrap();

    assert_eq!(
        output.pages[0].raw_candidate,
        RawCandidate::Sentinel(Sentinel::ModelError)
    );
    assert_eq!(output.pages[0].file_name, "BOLETO-PAG-1.pdf");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn credential_sentinel_from_a_live_provider_does_not_abort() {
    let mock = MockProvider::new();
    mock.add_response("ERRO_SEM_CHAVE").await;
    mock.add_response("00012-3").await;

    let output = slice_bytes(PDF, &vision_config(two_slips(), Arc::new(mock), 0))
        .await
        .unwrap();

    assert_eq!(
        output.pages[0].raw_candidate,
        RawCandidate::Sentinel(Sentinel::ModelError)
    );
    let names: Vec<_> = output.pages.iter().map(|p| p.file_name.as_str()).collect();
    assert_eq!(names, vec!["BOLETO-PAG-1.pdf", "00012-3.pdf"]);
}

#[tokio::test]
async fn missing_credential_aborts_before_second_page() {
    let source = Arc::new(FakeSource::with_pages(vec![
        slip_with_date_pair("24277-4"),
        slip_with_date_pair("11111-1"),
    ]));
    let recorder = Arc::new(RecordingCallback::default());
    let config = SlicerConfig::builder()
        .strategy(ExtractionStrategy::Vision)
        .credential_env("BOLETO_SLICER_IT_KEY_NEVER_SET")
        .page_source(source.clone())
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let err = slice_document(SourceDocument::new(PDF.to_vec()), source.clone(), &config)
        .await
        .unwrap_err();

    match &err {
        SlicerError::MissingCredential { env_var } => {
            assert_eq!(env_var, "BOLETO_SLICER_IT_KEY_NEVER_SET")
        }
        other => panic!("expected MissingCredential, got {other:?}"),
    }
    assert!(err.is_configuration());
    assert_eq!(source.renders.load(Ordering::SeqCst), 0);
    assert!(source.exports.lock().unwrap().is_empty());
    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start 2", "page 1", "error"]
    );
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_yields_pages_in_order() {
    let source = Arc::new(FakeSource::with_pages(vec![
        slip_with_date_pair("24277-4"),
        slip_without_code(),
        slip_with_isolated_code("00012-3"),
    ]));
    let stream = slice_stream_from_bytes(PDF, &text_config(source))
        .await
        .unwrap();
    let pages: Vec<_> = stream.collect().await;

    let labels: Vec<String> = pages
        .into_iter()
        .map(|p| p.unwrap().identifier.to_string())
        .collect();
    assert_eq!(labels, vec!["24277-4", "BOLETO-PAG-2", "00012-3"]);
}

#[tokio::test]
async fn stream_ends_after_fatal_error() {
    let source = Arc::new(FakeSource {
        unreadable_page: Some(2),
        ..FakeSource::with_pages(vec![
            slip_with_date_pair("24277-4"),
            slip_with_date_pair("11111-1"),
            slip_with_date_pair("22222-2"),
        ])
    });
    let mut stream = slice_stream_from_bytes(PDF, &text_config(source.clone()))
        .await
        .unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap().page_num, 1);
    assert!(matches!(
        stream.next().await,
        Some(Err(SlicerError::TextExtractionFailed { page: 2, .. }))
    ));
    assert!(stream.next().await.is_none());
    assert_eq!(*source.exports.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn stream_reports_missing_credential() {
    let source = Arc::new(FakeSource::with_pages(vec![slip_without_code()]));
    let config = SlicerConfig::builder()
        .credential_env("BOLETO_SLICER_IT_KEY_NEVER_SET")
        .page_source(source)
        .build()
        .unwrap();
    let mut stream = slice_stream_from_bytes(PDF, &config).await.unwrap();
    assert!(matches!(
        stream.next().await,
        Some(Err(SlicerError::MissingCredential { .. }))
    ));
    assert!(stream.next().await.is_none());
}

// ── Files on disk ────────────────────────────────────────────────────────────

#[tokio::test]
async fn slice_to_dir_writes_one_file_per_page() {
    let mut input = tempfile::NamedTempFile::new().unwrap();
    input.write_all(PDF).unwrap();
    let out = tempfile::tempdir().unwrap();

    let source = Arc::new(FakeSource::with_pages(vec![
        slip_with_date_pair("24277-4"),
        slip_without_code(),
    ]));
    let output = slice_to_dir(
        input.path().to_str().unwrap(),
        out.path(),
        &text_config(source),
    )
    .await
    .unwrap();

    assert_eq!(output.pages.len(), 2);
    assert_eq!(
        std::fs::read(out.path().join("24277-4.pdf")).unwrap(),
        b"%PDF-1.7 single page 1"
    );
    assert_eq!(
        std::fs::read(out.path().join("BOLETO-PAG-2.pdf")).unwrap(),
        b"%PDF-1.7 single page 2"
    );
}
