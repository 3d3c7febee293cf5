//! LLM interaction: send one prompt, get one answer.
//!
//! Two clients implement [`CompletionClient`]:
//!
//! * [`ChatEndpointClient`] posts to an OpenAI-style chat-completions URL
//!   (OpenRouter by default) with a bearer key and returns the first choice.
//! * [`ProviderClient`] routes the prompt through an `edgequake-llm`
//!   provider (OpenAI, Anthropic, Gemini, Ollama, …).
//!
//! A non-success HTTP status is not an `Err`: it comes back as
//! [`LlmResponse::ApiError`] so the caller can decide whether to render the
//! error text or fail. Anything that prevents a response from arriving
//! (connection, TLS, timeout) is an `Err`.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmResponse {
    Completion {
        content: String,
        input_tokens: usize,
        output_tokens: usize,
    },
    /// The endpoint answered with a non-success status.
    ApiError { status: u16, body: String },
}

impl LlmResponse {
    /// Report text: the completion, or `Error: {status}, {body}`.
    pub fn into_text(self) -> String {
        match self {
            LlmResponse::Completion { content, .. } => content,
            LlmResponse::ApiError { status, body } => format!("Error: {}, {}", status, body),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LlmResponse::ApiError { .. })
    }

    /// Turn an API error into [`AnalyzerError::LlmApiError`].
    pub fn into_strict(self) -> Result<Self, AnalyzerError> {
        match self {
            LlmResponse::ApiError { status, body } => Err(AnalyzerError::LlmApiError { status, body }),
            ok => Ok(ok),
        }
    }
}

/// Something that can answer a prompt.
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` as a single user message.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<LlmResponse, AnalyzerError>> + Send;

    /// Model name for logs and stats.
    fn model(&self) -> &str;
}

// ── Chat-completions endpoint ────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [RequestMessage<'a>; 1],
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

/// Extract the first choice's content from a 200 response body.
pub fn parse_completion(body: &str) -> Result<LlmResponse, AnalyzerError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| AnalyzerError::MalformedLlmResponse {
            detail: format!("invalid JSON: {e}"),
        })?;

    let usage = parsed.usage.unwrap_or_default();
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AnalyzerError::MalformedLlmResponse {
            detail: "response has no choices[0].message.content".into(),
        })?;

    Ok(LlmResponse::Completion {
        content,
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    })
}

/// Client for an OpenAI-style chat-completions URL.
#[derive(Debug, Clone)]
pub struct ChatEndpointClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    referer: String,
    timeout_secs: u64,
}

impl ChatEndpointClient {
    /// Build a client from the config. Fails without an API key.
    pub fn new(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AnalyzerError::MissingApiKey)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| AnalyzerError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            referer: config.referer.clone(),
            timeout_secs: config.api_timeout_secs,
        })
    }
}

impl CompletionClient for ChatEndpointClient {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse, AnalyzerError> {
        let start = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: [RequestMessage {
                role: "user",
                content: prompt,
            }],
        };
        debug!("POST {} ({} prompt chars)", self.endpoint, prompt.len());

        let transport = |e: reqwest::Error| AnalyzerError::LlmTransport {
            detail: if e.is_timeout() {
                format!("timed out after {}s", self.timeout_secs)
            } else {
                e.to_string()
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        let elapsed = start.elapsed().as_millis();

        if status != StatusCode::OK {
            warn!("LLM endpoint returned {} after {}ms", status.as_u16(), elapsed);
            return Ok(LlmResponse::ApiError {
                status: status.as_u16(),
                body: text,
            });
        }

        let reply = parse_completion(&text)?;
        if let LlmResponse::Completion {
            content,
            input_tokens,
            output_tokens,
        } = &reply
        {
            info!(
                "LLM answered in {}ms: {} chars ({} in / {} out tokens)",
                elapsed,
                content.len(),
                input_tokens,
                output_tokens
            );
        }
        Ok(reply)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ── edgequake-llm provider ───────────────────────────────────────────────

/// Client that sends the prompt through an `edgequake-llm` provider.
#[derive(Clone)]
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalyzerConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }

    /// Resolve the provider from the config: a pre-built provider wins,
    /// then a named one created with the configured model.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        if let Some(ref provider) = config.provider {
            return Ok(Self::new(Arc::clone(provider), config));
        }
        let name = config
            .provider_name
            .as_deref()
            .ok_or_else(|| AnalyzerError::ProviderNotConfigured {
                provider: "none".into(),
                hint: "Set a provider name or pass a provider instance.".into(),
            })?;
        let provider = ProviderFactory::create_llm_provider(name, &config.model).map_err(|e| {
            AnalyzerError::ProviderNotConfigured {
                provider: name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, config))
    }
}

impl CompletionClient for ProviderClient {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse, AnalyzerError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];
        let options = self.options();
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| AnalyzerError::LlmTransport {
                detail: e.to_string(),
            })?;

        info!(
            "Provider answered in {}ms: {} chars ({} in / {} out tokens)",
            start.elapsed().as_millis(),
            response.content.len(),
            response.prompt_tokens,
            response.completion_tokens
        );
        Ok(LlmResponse::Completion {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ── Selection ────────────────────────────────────────────────────────────

/// The client chosen by the config.
#[derive(Debug, Clone)]
pub enum LlmClient {
    Endpoint(ChatEndpointClient),
    Provider(ProviderClient),
}

impl LlmClient {
    /// Provider when one is configured, otherwise the chat endpoint.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        if config.uses_provider() {
            ProviderClient::from_config(config).map(LlmClient::Provider)
        } else {
            ChatEndpointClient::new(config).map(LlmClient::Endpoint)
        }
    }
}

impl CompletionClient for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse, AnalyzerError> {
        match self {
            LlmClient::Endpoint(c) => c.complete(prompt).await,
            LlmClient::Provider(c) => c.complete(prompt).await,
        }
    }

    fn model(&self) -> &str {
        match self {
            LlmClient::Endpoint(c) => c.model(),
            LlmClient::Provider(c) => c.model(),
        }
    }
}
