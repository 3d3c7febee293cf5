//! # estate-compliance
//!
//! Check a filled real-estate disclosure form against a compliance checklist
//! with a chat LLM, and render the model's answer as a paginated PDF report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! form.pdf ─┐
//!           ├─ 1. Input      resolve local files or download URLs
//! list.xlsx ┘
//!  ├─ 2. Extract    lower-cased, whitespace-collapsed form text (lopdf)
//!  ├─ 3. Checklist  typed rows from the first worksheet (calamine)
//!  ├─ 4. Precheck   substring check of each clause's validation points
//!  ├─ 5. LLM        one chat-completion request (OpenRouter or edgequake-llm)
//!  ├─ 6. Polish     strip fences, CRLF, invisible characters
//!  └─ 7. Render     markdown-ish text → A4 PDF with tables (spawn_blocking)
//! ```
//!
//! The renderer in [`render`] is usable on its own: it needs no key and no
//! network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use estate_compliance::{analyze, AnalyzerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads OPENROUTER_API_KEY and ESTATE_COMPLIANCE_MODEL
//!     let config = AnalyzerConfig::from_env().build()?;
//!     let output = analyze("form-dv.pdf", "checklist.xlsx", &config).await?;
//!     std::fs::write("report.pdf", output.pdf.as_bytes())?;
//!     for finding in &output.findings {
//!         eprintln!("{} {}", finding.clause_id, finding.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `estate-compliance` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! estate-compliance = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyze, analyze_both, analyze_both_inputs, analyze_both_with_client, analyze_bytes, analyze_inputs, analyze_sync,
    analyze_to_file, analyze_with_client, render_report, run_precheck, save_pdf, AnalysisInputs,
};
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, PromptContext, PromptVariant};
pub use error::AnalyzerError;
pub use output::{AnalysisOutput, AnalysisStats, BothReports, PrecheckOutput};
pub use pipeline::checklist::ChecklistRow;
pub use pipeline::llm::{CompletionClient, LlmClient, LlmResponse};
pub use pipeline::precheck::{ClauseFinding, ComplianceStatus};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use render::{render_markdown, RenderMode, RenderedPdf};
pub use report::{RecommendedAction, StructuredReport, Warning};
