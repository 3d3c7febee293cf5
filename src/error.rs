//! Error types for the estate-compliance library.
//!
//! Every failure that stops an analysis is an [`AnalyzerError`]. Callers get
//! it as `Err(..)`, distinct from a successful [`crate::AnalysisOutput`], and
//! no report is rendered.
//!
//! A non-success reply from the LLM endpoint is *not* an error by default:
//! its status and body become the report text and the output is flagged
//! `llm_degraded`. Enable `strict_llm_errors` in the config to get
//! [`AnalyzerError::LlmApiError`] instead. Transport failures (DNS, TLS,
//! timeouts) always propagate.
//!
//! Rendering itself never fails on malformed markdown; only PDF serialisation
//! can fail, reported as [`crate::render::RenderError`] and wrapped here as
//! [`AnalyzerError::Render`].

use crate::render::RenderError;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the estate-compliance library.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes do not start with the signature of the expected format.
    #[error("'{source_name}' is not a valid {expected} file\nFirst bytes: {magic:?}")]
    UnexpectedFormat {
        source_name: String,
        expected: &'static str,
        magic: Vec<u8>,
    },

    // ── Data errors ───────────────────────────────────────────────────────
    /// The disclosure form could not be parsed or its text extracted.
    #[error("Could not extract text from PDF: {detail}")]
    PdfExtraction { detail: String },

    /// The checklist workbook could not be read.
    #[error("Could not read checklist: {detail}")]
    Checklist { detail: String },

    /// A required checklist column is absent from the header row.
    #[error("Checklist is missing the '{column}' column (found: {found})")]
    MissingColumn { column: String, found: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No API key was configured for the chat-completions endpoint.
    #[error("No API key configured.\nSet OPENROUTER_API_KEY or pass --api-key.")]
    MissingApiKey,

    /// The configured edgequake-llm provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The request never produced an HTTP response.
    #[error("LLM request failed: {detail}")]
    LlmTransport { detail: String },

    /// The endpoint answered with a non-success status (strict mode only).
    #[error("LLM API error: {status}, {body}")]
    LlmApiError { status: u16, body: String },

    /// A success response whose body has no usable completion.
    #[error("Malformed LLM response: {detail}")]
    MalformedLlmResponse { detail: String },

    // ── Render errors ─────────────────────────────────────────────────────
    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzerError {
    /// True for data errors in the supplied documents, as opposed to
    /// configuration, network or I/O trouble.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            AnalyzerError::UnexpectedFormat { .. }
                | AnalyzerError::PdfExtraction { .. }
                | AnalyzerError::Checklist { .. }
                | AnalyzerError::MissingColumn { .. }
        )
    }
}
