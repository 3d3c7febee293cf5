//! Configuration for a compliance analysis.
//!
//! Every knob lives in [`AnalyzerConfig`], built via
//! [`AnalyzerConfig::builder()`]. The API key and model are read into the
//! config once (from arguments or [`AnalyzerConfig::from_env`]) and passed
//! explicitly to the LLM client; nothing reads the environment later.

use crate::error::AnalyzerError;
use crate::progress::ProgressCallback;
use crate::render::RenderMode;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model identifier on the endpoint.
pub const DEFAULT_MODEL: &str = "anthropic/claude-3-sonnet";

/// Default `HTTP-Referer` header sent with each request.
pub const DEFAULT_REFERER: &str = "http://localhost:8501/";

/// Environment variable holding the endpoint API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Environment variable overriding the model.
pub const MODEL_ENV: &str = "ESTATE_COMPLIANCE_MODEL";

/// Configuration for an analysis run.
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Bearer token for the chat-completions endpoint.
    pub api_key: Option<String>,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Chat-completions URL. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Value of the `HTTP-Referer` header.
    pub referer: String,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    /// When set, requests go through that provider instead of `endpoint`.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for provider requests. The raw endpoint request
    /// carries no sampling options.
    pub temperature: f32,

    /// Maximum completion tokens for provider requests.
    pub max_tokens: usize,

    /// Timeout for one LLM request in seconds. Default: 180.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Which report to ask for. Default: [`PromptVariant::Standard`].
    pub prompt_variant: PromptVariant,

    /// What goes after `Analyse:` in the prompt.
    pub prompt_context: PromptContext,

    /// Replaces the built-in prompt of the selected variant.
    pub base_prompt: Option<String>,

    /// Page-flow strategy for the PDF report. Default: [`RenderMode::Rich`].
    pub render_mode: RenderMode,

    /// Turn non-success LLM replies into [`AnalyzerError::LlmApiError`]
    /// instead of rendering the error text. Default: false.
    pub strict_llm_errors: bool,

    /// Optional stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            api_timeout_secs: 180,
            download_timeout_secs: 120,
            prompt_variant: PromptVariant::default(),
            prompt_context: PromptContext::default(),
            base_prompt: None,
            render_mode: RenderMode::default(),
            strict_llm_errors: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("referer", &self.referer)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("prompt_variant", &self.prompt_variant)
            .field("prompt_context", &self.prompt_context)
            .field("base_prompt", &self.base_prompt.as_ref().map(String::len))
            .field("render_mode", &self.render_mode)
            .field("strict_llm_errors", &self.strict_llm_errors)
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Builder pre-filled with `OPENROUTER_API_KEY` and
    /// `ESTATE_COMPLIANCE_MODEL` when they are set and non-empty.
    pub fn from_env() -> AnalyzerConfigBuilder {
        let mut builder = Self::builder();
        if let Some(key) = non_empty_env(API_KEY_ENV) {
            builder = builder.api_key(key);
        }
        if let Some(model) = non_empty_env(MODEL_ENV) {
            builder = builder.model(model);
        }
        builder
    }

    /// True when requests go through an edgequake-llm provider.
    pub fn uses_provider(&self) -> bool {
        self.provider.is_some() || self.provider_name.is_some()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.config.referer = referer.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn prompt_variant(mut self, variant: PromptVariant) -> Self {
        self.config.prompt_variant = variant;
        self
    }

    pub fn prompt_context(mut self, context: PromptContext) -> Self {
        self.config.prompt_context = context;
        self
    }

    pub fn base_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.base_prompt = Some(prompt.into());
        self
    }

    pub fn render_mode(mut self, mode: RenderMode) -> Self {
        self.config.render_mode = mode;
        self
    }

    pub fn strict_llm_errors(mut self, v: bool) -> Self {
        self.config.strict_llm_errors = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A missing API key is not an error here: render-only and pre-check
    /// runs never need one. It is checked when the LLM client is created.
    pub fn build(self) -> Result<AnalyzerConfig, AnalyzerError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig("Model must not be empty".into()));
        }
        if !c.uses_provider()
            && !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://"))
        {
            return Err(AnalyzerError::InvalidConfig(format!(
                "Endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(AnalyzerError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which report the model is asked to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptVariant {
    /// Free-form compliance report rendered to PDF. (default)
    #[default]
    Standard,
    /// Fixed DV1–DV16 template; the reply is also parsed into a
    /// [`crate::report::StructuredReport`].
    Specialized,
}

/// What the prompt puts after `Analyse:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptContext {
    /// The per-clause pre-check summary. (default)
    #[default]
    PrecheckSummary,
    /// The raw extracted form text, discarding the pre-check summary. The
    /// findings are still computed and returned.
    RawPdfText,
}

impl std::str::FromStr for PromptVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(PromptVariant::Standard),
            "specialized" | "specialised" => Ok(PromptVariant::Specialized),
            other => Err(format!("unknown report variant '{other}'")),
        }
    }
}

impl std::str::FromStr for PromptContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "precheck" | "precheck-summary" => Ok(PromptContext::PrecheckSummary),
            "raw" | "raw-pdf-text" => Ok(PromptContext::RawPdfText),
            other => Err(format!("unknown prompt context '{other}'")),
        }
    }
}
