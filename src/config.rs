//! Configuration types for slicing a boleto PDF.
//!
//! All run behaviour is controlled through [`SlicerConfig`], built via its
//! [`SlicerConfigBuilder`]. The extraction strategy is chosen here, once per
//! deployment, and never changes from page to page.

use crate::error::SlicerError;
use crate::pipeline::layout::DEFAULT_LINE_TOLERANCE;
use crate::pipeline::source::PageSource;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lowest scale at which the small printed digits stay machine-readable.
pub const MIN_RENDER_SCALE: f32 = 2.0;
/// Above this the image grows without helping the model.
pub const MAX_RENDER_SCALE: f32 = 2.5;
/// Ceiling for the vision sampling temperature; the reply must be repeatable.
pub const MAX_TEMPERATURE: f32 = 0.2;

/// How a page's document number is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStrategy {
    /// Render the page and ask a vision-language model. Needs an API key.
    #[default]
    Vision,
    /// Rebuild reading order from the text layer and run the pattern cascade.
    /// Offline and deterministic; needs a PDF with embedded text.
    Text,
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStrategy::Vision => f.write_str("vision"),
            ExtractionStrategy::Text => f.write_str("text"),
        }
    }
}

/// Configuration for one slicing run.
///
/// # Example
/// ```rust
/// use boleto_slicer::{ExtractionStrategy, SlicerConfig};
///
/// let config = SlicerConfig::builder()
///     .strategy(ExtractionStrategy::Text)
///     .line_tolerance(4.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SlicerConfig {
    /// Extraction strategy. Default: [`ExtractionStrategy::Vision`].
    pub strategy: ExtractionStrategy,

    /// Page render scale for the vision strategy. Range 2.0–2.5. Default: 2.0.
    pub render_scale: f32,

    /// Vision provider name, e.g. "gemini", "openai". Default: "gemini".
    pub provider_name: String,

    /// Vision model identifier. If None, uses [`default_model`] for the provider.
    pub model: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name` and
    /// skips the credential check.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Environment variable holding the API key. If None, derived from
    /// `provider_name` via [`default_credential_env`].
    pub credential_env: Option<String>,

    /// Sampling temperature. Clamped to 0.0–0.2. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may answer with. Default: 32.
    pub max_tokens: usize,

    /// Retries on a failed vision call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per vision call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Instruction override. If None, uses [`crate::prompts::DOC_NUMBER_PROMPT`].
    pub system_prompt: Option<String>,

    /// Vertical tolerance (PDF points) for grouping text runs into a line. Default: 5.0.
    pub line_tolerance: f32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Injected page source. If None, a [`crate::PdfiumPageSource`] is used.
    pub page_source: Option<Arc<dyn PageSource>>,

    /// Progress events receiver.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            strategy: ExtractionStrategy::default(),
            render_scale: MIN_RENDER_SCALE,
            provider_name: "gemini".to_string(),
            model: None,
            provider: None,
            credential_env: None,
            temperature: 0.1,
            max_tokens: 32,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            system_prompt: None,
            line_tolerance: DEFAULT_LINE_TOLERANCE,
            password: None,
            download_timeout_secs: 120,
            page_source: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SlicerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlicerConfig")
            .field("strategy", &self.strategy)
            .field("render_scale", &self.render_scale)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("credential_env", &self.credential_env)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("line_tolerance", &self.line_tolerance)
            .field("page_source", &self.page_source.as_ref().map(|_| "<dyn PageSource>"))
            .finish()
    }
}

impl SlicerConfig {
    /// Create a new builder for `SlicerConfig`.
    pub fn builder() -> SlicerConfigBuilder {
        SlicerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model to request, explicit or the provider default.
    pub fn effective_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| default_model(&self.provider_name).to_string())
    }

    /// Credential variable to check, explicit or derived from the provider.
    /// None for local providers that need no key.
    pub fn effective_credential_env(&self) -> Option<String> {
        self.credential_env
            .clone()
            .or_else(|| default_credential_env(&self.provider_name).map(str::to_string))
    }
}

/// Default vision model per provider.
pub fn default_model(provider_name: &str) -> &'static str {
    match provider_name {
        "openai" | "azure" => "gpt-4.1-mini",
        "anthropic" => "claude-sonnet-4-20250514",
        "mistral" => "pixtral-12b-2409",
        "ollama" | "lmstudio" => "llava",
        _ => "gemini-2.5-flash",
    }
}

/// API key variable read by each provider.
pub fn default_credential_env(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "gemini" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        "azure" => Some("AZURE_OPENAI_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        _ => None,
    }
}

/// Builder for [`SlicerConfig`].
#[derive(Debug)]
pub struct SlicerConfigBuilder {
    config: SlicerConfig,
}

impl SlicerConfigBuilder {
    pub fn strategy(mut self, strategy: ExtractionStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(MIN_RENDER_SCALE, MAX_RENDER_SCALE);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn credential_env(mut self, var: impl Into<String>) -> Self {
        self.config.credential_env = Some(var.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, MAX_TEMPERATURE);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn line_tolerance(mut self, tolerance: f32) -> Self {
        self.config.line_tolerance = tolerance;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn page_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.config.page_source = Some(source);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SlicerConfig, SlicerError> {
        let c = &self.config;
        if !(c.line_tolerance.is_finite() && c.line_tolerance > 0.0) {
            return Err(SlicerError::InvalidConfig(format!(
                "Line tolerance must be a positive number, got {}",
                c.line_tolerance
            )));
        }
        if c.max_tokens == 0 {
            return Err(SlicerError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(SlicerError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.provider_name.trim().is_empty() {
            return Err(SlicerError::InvalidConfig(
                "Provider name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_vision_contract() {
        let c = SlicerConfig::default();
        assert_eq!(c.strategy, ExtractionStrategy::Vision);
        assert_eq!(c.render_scale, 2.0);
        assert!(c.temperature <= MAX_TEMPERATURE);
        assert_eq!(c.line_tolerance, 5.0);
        assert_eq!(c.effective_credential_env().as_deref(), Some("GEMINI_API_KEY"));
    }

    #[test]
    fn builder_clamps_scale_and_temperature() {
        let c = SlicerConfig::builder()
            .render_scale(4.0)
            .temperature(0.9)
            .build()
            .unwrap();
        assert_eq!(c.render_scale, MAX_RENDER_SCALE);
        assert_eq!(c.temperature, MAX_TEMPERATURE);

        let c = SlicerConfig::builder().render_scale(1.0).build().unwrap();
        assert_eq!(c.render_scale, MIN_RENDER_SCALE);
    }

    #[test]
    fn builder_rejects_bad_tolerance() {
        let err = SlicerConfig::builder().line_tolerance(0.0).build().unwrap_err();
        assert!(matches!(err, SlicerError::InvalidConfig(_)));
        assert!(SlicerConfig::builder()
            .line_tolerance(f32::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn credential_env_follows_provider_unless_overridden() {
        let c = SlicerConfig::builder().provider_name("openai").build().unwrap();
        assert_eq!(c.effective_credential_env().as_deref(), Some("OPENAI_API_KEY"));
        assert_eq!(c.effective_model(), "gpt-4.1-mini");

        let c = SlicerConfig::builder().provider_name("ollama").build().unwrap();
        assert_eq!(c.effective_credential_env(), None);

        let c = SlicerConfig::builder()
            .credential_env("API_KEY")
            .build()
            .unwrap();
        assert_eq!(c.effective_credential_env().as_deref(), Some("API_KEY"));
    }

    #[test]
    fn strategy_display_and_serde() {
        assert_eq!(ExtractionStrategy::Text.to_string(), "text");
        assert_eq!(
            serde_json::to_string(&ExtractionStrategy::Vision).unwrap(),
            "\"vision\""
        );
    }
}
