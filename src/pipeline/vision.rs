//! Vision strategy: render the page, ask a vision-language model for the
//! document number, clean the reply.
//!
//! ```text
//! page ──▶ render (scale 2.0–2.5) ──▶ PNG ──▶ base64 ──▶ provider.chat()
//!      ──▶ last ':'-separated segment ──▶ RawCandidate
//! ```
//!
//! Every page-local failure comes back as a [`Sentinel`], never as an
//! error:
//!
//! | Failure                         | Sentinel                        |
//! |---------------------------------|---------------------------------|
//! | no API key in the environment   | [`Sentinel::MissingCredential`] |
//! | page could not be rendered      | [`Sentinel::ReadError`]         |
//! | PNG encoding failed             | [`Sentinel::ProcessingError`]   |
//! | provider error after retries    | [`Sentinel::ModelError`]        |
//! | model replied `ERRO_SEM_CHAVE`  | [`Sentinel::ModelError`]        |
//! | model answered "not found"      | [`Sentinel::NotFound`]          |
//!
//! The credential is checked before anything is rendered, so a missing key
//! costs nothing and the orchestrator can abort the batch on page 1.
//!
//! ## Retry Strategy
//!
//! Transport errors and timeouts are retried with exponential backoff
//! (`retry_backoff_ms * 2^attempt`). A well-formed reply is never retried,
//! even a "not found" one.

use crate::candidate::{RawCandidate, Sentinel};
use crate::config::SlicerConfig;
use crate::error::SlicerError;
use crate::pipeline::source::{run_blocking, PageSource, SourceDocument};
use crate::prompts::{DOC_NUMBER_PROMPT, PROMPT_VERSION};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use image::DynamicImage;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Reads a page's document number through a vision-language model.
pub struct VisionExtractor {
    /// None when the credential is missing; every page then reports
    /// [`Sentinel::MissingCredential`].
    provider: Option<Arc<dyn LLMProvider>>,
    credential_env: String,
    prompt: String,
    render_scale: f32,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout: Duration,
}

impl VisionExtractor {
    /// Resolve the provider from the configuration.
    ///
    /// An explicit [`SlicerConfig::provider`] wins. Otherwise the credential
    /// variable is checked first: if it is unset or blank the extractor is
    /// still built, without a provider, so the run fails with the
    /// missing-credential outcome instead of a factory error.
    pub fn from_config(config: &SlicerConfig) -> Result<Self, SlicerError> {
        let credential_env = config
            .effective_credential_env()
            .unwrap_or_else(|| "(none)".to_string());

        let provider = match &config.provider {
            Some(p) => Some(Arc::clone(p)),
            None => {
                let has_key = config
                    .effective_credential_env()
                    .map(|var| credential_present(&var))
                    .unwrap_or(true);
                if has_key {
                    let model = config.effective_model();
                    debug!(
                        "Creating vision provider '{}' with model '{}'",
                        config.provider_name, model
                    );
                    let p = ProviderFactory::create_llm_provider(&config.provider_name, &model)
                        .map_err(|e| SlicerError::ProviderNotConfigured {
                            provider: config.provider_name.clone(),
                            hint: format!("{e}"),
                        })?;
                    Some(p)
                } else {
                    warn!("{} is not set; vision extraction unavailable", credential_env);
                    None
                }
            }
        };

        Ok(Self {
            provider,
            credential_env,
            prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DOC_NUMBER_PROMPT.to_string()),
            render_scale: config.render_scale,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout: Duration::from_secs(config.api_timeout_secs),
        })
    }

    /// Environment variable the credential is read from.
    pub fn credential_env(&self) -> &str {
        &self.credential_env
    }

    pub fn has_credential(&self) -> bool {
        self.provider.is_some()
    }

    /// Extract one page's raw candidate.
    ///
    /// Errors only on a panicked blocking task; everything page-local is a
    /// sentinel.
    pub async fn extract(
        &self,
        source: &Arc<dyn PageSource>,
        doc: &SourceDocument,
        page_num: usize,
    ) -> Result<RawCandidate, SlicerError> {
        let Some(provider) = &self.provider else {
            return Ok(RawCandidate::Sentinel(Sentinel::MissingCredential));
        };

        let bytes = doc.fresh_copy();
        let scale = self.render_scale;
        let image = match run_blocking(source, move |s| s.page_as_image(bytes, page_num, scale))
            .await
        {
            Ok(img) => img,
            Err(SlicerError::Internal(e)) => return Err(SlicerError::Internal(e)),
            Err(e) => {
                warn!("Page {}: render failed: {}", page_num, e);
                return Ok(RawCandidate::Sentinel(Sentinel::ReadError));
            }
        };

        let image_data = match encode_page_image(&image) {
            Ok(d) => d,
            Err(e) => {
                warn!("Page {}: PNG encoding failed: {}", page_num, e);
                return Ok(RawCandidate::Sentinel(Sentinel::ProcessingError));
            }
        };

        let reply = self.ask(provider, page_num, image_data).await;
        Ok(interpret_reply(reply))
    }

    /// One model request with timeout and retries. Err carries the last
    /// failure message.
    async fn ask(
        &self,
        provider: &Arc<dyn LLMProvider>,
        page_num: usize,
        image_data: ImageData,
    ) -> Result<String, String> {
        let start = Instant::now();
        let messages = build_messages(&self.prompt, image_data);
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let mut last_err = String::from("no attempt made");

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Page {}: retry {}/{} after {}ms",
                    page_num, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(self.api_timeout, provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "Page {}: prompt {} replied in {:?} ({} output tokens)",
                        page_num,
                        PROMPT_VERSION,
                        start.elapsed(),
                        response.completion_tokens
                    );
                    return Ok(response.content);
                }
                Ok(Err(e)) => {
                    last_err = format!("{e}");
                    warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, last_err);
                }
                Err(_) => {
                    last_err = format!("timed out after {:?}", self.api_timeout);
                    warn!("Page {}: attempt {} {}", page_num, attempt + 1, last_err);
                }
            }
        }

        Err(last_err)
    }
}

impl std::fmt::Debug for VisionExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionExtractor")
            .field("credential_env", &self.credential_env)
            .field("has_credential", &self.provider.is_some())
            .field("render_scale", &self.render_scale)
            .field("temperature", &self.temperature)
            .finish()
    }
}

fn credential_present(var: &str) -> bool {
    std::env::var(var)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

/// System instruction followed by the page image with empty user text.
fn build_messages(prompt: &str, image_data: ImageData) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(prompt),
        ChatMessage::user_with_images("", vec![image_data]),
    ]
}

/// Encode a rendered page as a base64 PNG.
///
/// PNG keeps the printed digits crisp; `detail: "high"` stops tiling
/// providers from downsampling the fine print.
pub fn encode_page_image(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page image: {} bytes base64", b64.len());
    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Clean a model reply into a candidate.
///
/// Models sometimes echo the label ("Num. do Documento: 05551-2"), so only
/// the text after the last `:` is kept. The prompt's not-found reply
/// ([`crate::prompts::not_found_reply`]) becomes [`Sentinel::NotFound`].
///
/// A provider that answered cannot be missing its credential, so a reply
/// spelling the missing-credential wire value is a [`Sentinel::ModelError`].
pub fn clean_reply(reply: &str) -> RawCandidate {
    let trimmed = reply.trim();
    let value = match trimmed.rfind(':') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    };
    match RawCandidate::from_text(value.trim()) {
        raw if raw.is_missing_credential() => RawCandidate::Sentinel(Sentinel::ModelError),
        raw => raw,
    }
}

/// Map the outcome of a model request to a candidate.
pub fn interpret_reply(reply: Result<String, String>) -> RawCandidate {
    match reply {
        Ok(text) => clean_reply(&text),
        Err(_) => RawCandidate::Sentinel(Sentinel::ModelError),
    }
}
