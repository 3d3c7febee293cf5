//! Analysis entry points.
//!
//! [`analyze`] runs the whole pipeline for one report: load both inputs,
//! extract the form text, load the checklist, pre-check every clause, ask the
//! model, clean its reply and render it to PDF. [`analyze_both`] asks for the
//! standard and the specialized report concurrently from the same inputs.
//!
//! The `*_with_client` variants take any [`CompletionClient`], which is how
//! tests run the pipeline without a network.

use crate::config::{AnalyzerConfig, PromptVariant};
use crate::error::AnalyzerError;
use crate::output::{AnalysisOutput, AnalysisStats, BothReports, PrecheckOutput};
use crate::pipeline::checklist::{checklist_table, load_checklist, ChecklistRow};
use crate::pipeline::extract::{extract_text, ExtractedText};
use crate::pipeline::input::{resolve_input, InputKind};
use crate::pipeline::llm::{CompletionClient, LlmClient, LlmResponse};
use crate::pipeline::postprocess::clean_reply;
use crate::pipeline::precheck::{precheck, summarize, ClauseFinding};
use crate::progress::Stage;
use crate::prompts;
use crate::render::{render_markdown, RenderMode, RenderedPdf};
use crate::report::parse_structured_report;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

// ── Inputs ───────────────────────────────────────────────────────────────

/// Form text, checklist rows and the pre-check over them.
///
/// Built once and shared by every report asked for the same pair of inputs.
#[derive(Debug, Clone)]
pub struct AnalysisInputs {
    pub form: ExtractedText,
    pub checklist: Vec<ChecklistRow>,
    pub findings: Vec<ClauseFinding>,
    extract_duration_ms: u64,
}

impl AnalysisInputs {
    /// Pre-check already-loaded inputs.
    pub fn new(form: ExtractedText, checklist: Vec<ChecklistRow>) -> Self {
        let findings = precheck(&checklist, &form.text);
        Self {
            form,
            checklist,
            findings,
            extract_duration_ms: 0,
        }
    }

    /// Resolve both inputs (paths or URLs) and prepare them.
    pub async fn load(
        form_input: &str,
        checklist_input: &str,
        config: &AnalyzerConfig,
    ) -> Result<Self, AnalyzerError> {
        let timeout = config.download_timeout_secs;
        let (form, checklist) = tokio::try_join!(
            resolve_input(form_input, InputKind::Pdf, timeout),
            resolve_input(checklist_input, InputKind::Workbook, timeout),
        )?;
        Self::from_bytes(form.bytes, checklist.bytes, config).await
    }

    /// Prepare in-memory PDF and workbook bytes.
    pub async fn from_bytes(
        form_bytes: Vec<u8>,
        checklist_bytes: Vec<u8>,
        config: &AnalyzerConfig,
    ) -> Result<Self, AnalyzerError> {
        InputKind::Pdf.check("form", &form_bytes)?;
        InputKind::Workbook.check("checklist", &checklist_bytes)?;

        let start = Instant::now();
        let form = stage(config, Stage::Extract, async move {
            blocking(move || extract_text(&form_bytes)).await
        })
        .await?;
        let extract_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Form: {} page(s), {} chars of text",
            form.page_count,
            form.text.len()
        );

        let checklist = stage(config, Stage::Checklist, async move {
            blocking(move || load_checklist(&checklist_bytes)).await
        })
        .await?;

        let mut inputs = stage(config, Stage::Precheck, async move {
            Ok(Self::new(form, checklist))
        })
        .await?;
        inputs.extract_duration_ms = extract_duration_ms;
        Ok(inputs)
    }

    /// The pre-check summary that goes into the prompt.
    pub fn summary(&self) -> String {
        summarize(&self.findings)
    }

    /// Full prompt for `variant`. The base-prompt override only applies to
    /// the configured variant.
    pub fn prompt(&self, variant: PromptVariant, config: &AnalyzerConfig) -> String {
        let custom = if variant == config.prompt_variant {
            config.base_prompt.as_deref()
        } else {
            None
        };
        let base = prompts::base_prompt(variant, custom);
        let summary = self.summary();
        let context = prompts::prompt_context(config.prompt_context, &summary, &self.form.text);
        prompts::build_prompt(variant, base, context, &checklist_table(&self.checklist))
    }
}

// ── Public entry points ──────────────────────────────────────────────────

/// Analyse a disclosure form against a checklist and render the report.
///
/// Both inputs may be local paths or HTTP(S) URLs. The report flavour is
/// `config.prompt_variant`.
///
/// # Errors
/// Input and data errors (unreadable PDF, missing checklist column), a
/// missing API key, transport failures, and, with
/// `config.strict_llm_errors`, a non-success answer from the endpoint.
pub async fn analyze(
    form_input: impl AsRef<str>,
    checklist_input: impl AsRef<str>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    let client = LlmClient::from_config(config)?;
    analyze_with_client(&client, form_input, checklist_input, config).await
}

/// [`analyze`] with a caller-supplied completion client.
pub async fn analyze_with_client<C: CompletionClient>(
    client: &C,
    form_input: impl AsRef<str>,
    checklist_input: impl AsRef<str>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    let total = Instant::now();
    info!(
        "Starting analysis: form={} checklist={}",
        form_input.as_ref(),
        checklist_input.as_ref()
    );
    let inputs = AnalysisInputs::load(form_input.as_ref(), checklist_input.as_ref(), config).await?;
    let output = analyze_inputs(client, &inputs, config.prompt_variant, config).await?;
    finish(config, total);
    Ok(output)
}

/// Analyse in-memory PDF and workbook bytes.
pub async fn analyze_bytes(
    form_bytes: Vec<u8>,
    checklist_bytes: Vec<u8>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    let total = Instant::now();
    let client = LlmClient::from_config(config)?;
    let inputs = AnalysisInputs::from_bytes(form_bytes, checklist_bytes, config).await?;
    let output = analyze_inputs(&client, &inputs, config.prompt_variant, config).await?;
    finish(config, total);
    Ok(output)
}

/// Ask for the standard and the specialized report concurrently.
pub async fn analyze_both(
    form_input: impl AsRef<str>,
    checklist_input: impl AsRef<str>,
    config: &AnalyzerConfig,
) -> Result<BothReports, AnalyzerError> {
    let client = LlmClient::from_config(config)?;
    analyze_both_with_client(&client, form_input, checklist_input, config).await
}

/// [`analyze_both`] with a caller-supplied completion client.
pub async fn analyze_both_with_client<C: CompletionClient>(
    client: &C,
    form_input: impl AsRef<str>,
    checklist_input: impl AsRef<str>,
    config: &AnalyzerConfig,
) -> Result<BothReports, AnalyzerError> {
    let total = Instant::now();
    let inputs = AnalysisInputs::load(form_input.as_ref(), checklist_input.as_ref(), config).await?;
    let both = analyze_both_inputs(client, &inputs, config).await?;
    finish(config, total);
    Ok(both)
}

/// Both report flavours over inputs that are already loaded. The two LLM
/// requests run concurrently; either failure fails the call.
pub async fn analyze_both_inputs<C: CompletionClient>(
    client: &C,
    inputs: &AnalysisInputs,
    config: &AnalyzerConfig,
) -> Result<BothReports, AnalyzerError> {
    let (standard, specialized) = tokio::join!(
        analyze_inputs(client, inputs, PromptVariant::Standard, config),
        analyze_inputs(client, inputs, PromptVariant::Specialized, config),
    );
    Ok(BothReports {
        standard: standard?,
        specialized: specialized?,
    })
}

/// Run [`analyze`] and write the PDF to `output_path`.
///
/// The file is written to a temporary file in the destination directory
/// and then renamed over `output_path`, so readers never see a partial PDF.
pub async fn analyze_to_file(
    form_input: impl AsRef<str>,
    checklist_input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    let output = analyze(form_input, checklist_input, config).await?;
    save_pdf(&output.pdf, output_path).await?;
    Ok(output)
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    form_input: impl AsRef<str>,
    checklist_input: impl AsRef<str>,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalyzerError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(form_input, checklist_input, config))
}

/// Run the local pre-check only. Needs no API key.
pub async fn run_precheck(
    form_input: impl AsRef<str>,
    checklist_input: impl AsRef<str>,
    config: &AnalyzerConfig,
) -> Result<PrecheckOutput, AnalyzerError> {
    let total = Instant::now();
    let inputs = AnalysisInputs::load(form_input.as_ref(), checklist_input.as_ref(), config).await?;
    finish(config, total);
    Ok(PrecheckOutput {
        form_pages: inputs.form.page_count,
        checklist_rows: inputs.checklist.len(),
        findings: inputs.findings,
    })
}

/// Render report text to PDF off the async executor.
pub async fn render_report(text: impl Into<String>, mode: RenderMode) -> Result<RenderedPdf, AnalyzerError> {
    let text = text.into();
    let pdf = blocking(move || render_markdown(&text, mode).map_err(AnalyzerError::from)).await?;
    Ok(pdf)
}

/// Write `pdf` to `path` atomically, creating parent directories.
pub async fn save_pdf(pdf: &RenderedPdf, path: impl AsRef<Path>) -> Result<(), AnalyzerError> {
    let path = path.as_ref().to_path_buf();
    let bytes = pdf.as_bytes().to_vec();
    blocking(move || write_atomic(&path, &bytes)).await
}

// ── Core ─────────────────────────────────────────────────────────────────

/// Prompt, ask, clean and render one report from prepared inputs.
pub async fn analyze_inputs<C: CompletionClient>(
    client: &C,
    inputs: &AnalysisInputs,
    variant: PromptVariant,
    config: &AnalyzerConfig,
) -> Result<AnalysisOutput, AnalyzerError> {
    let total = Instant::now();
    let prompt = inputs.prompt(variant, config);
    debug!(
        "{:?} prompt: {} chars ({:?} context)",
        variant,
        prompt.len(),
        config.prompt_context
    );

    let llm_start = Instant::now();
    let response = stage(config, Stage::Llm, client.complete(&prompt)).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let response = if config.strict_llm_errors {
        response.into_strict()?
    } else {
        response
    };

    let llm_degraded = response.is_error();
    let (input_tokens, output_tokens) = match &response {
        LlmResponse::Completion {
            input_tokens,
            output_tokens,
            ..
        } => (*input_tokens, *output_tokens),
        LlmResponse::ApiError { status, .. } => {
            warn!("LLM answered {}; rendering the error text as the report", status);
            (0, 0)
        }
    };
    let report = clean_reply(&response.into_text());

    let render_start = Instant::now();
    let pdf = stage(config, Stage::Render, render_report(report.clone(), config.render_mode)).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let structured = match variant {
        PromptVariant::Specialized if !llm_degraded => Some(parse_structured_report(&report)),
        _ => None,
    };

    let stats = AnalysisStats {
        model: client.model().to_string(),
        form_pages: inputs.form.page_count,
        skipped_form_pages: inputs.form.failed_pages.len(),
        text_chars: inputs.form.text.len(),
        checklist_rows: inputs.checklist.len(),
        prompt_chars: prompt.len(),
        input_tokens,
        output_tokens,
        report_pages: pdf.page_count(),
        extract_duration_ms: inputs.extract_duration_ms,
        llm_duration_ms,
        render_duration_ms,
        total_duration_ms: total.elapsed().as_millis() as u64,
    };

    info!(
        "{:?} report: {} chars, {} page(s), llm {}ms, render {}ms{}",
        variant,
        report.len(),
        stats.report_pages,
        llm_duration_ms,
        render_duration_ms,
        if llm_degraded { " (degraded)" } else { "" }
    );

    Ok(AnalysisOutput {
        variant,
        report,
        pdf,
        findings: inputs.findings.clone(),
        structured,
        llm_degraded,
        stats,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run `fut` between the stage start/complete callbacks.
async fn stage<T, F>(config: &AnalyzerConfig, stage: Stage, fut: F) -> Result<T, AnalyzerError>
where
    F: std::future::Future<Output = Result<T, AnalyzerError>>,
{
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
    let start = Instant::now();
    let value = fut.await?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, start.elapsed().as_millis() as u64);
    }
    Ok(value)
}

fn finish(config: &AnalyzerConfig, total: Instant) {
    let total_ms = total.elapsed().as_millis() as u64;
    info!("Analysis complete in {}ms", total_ms);
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(total_ms);
    }
}

/// Run CPU-bound work on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, AnalyzerError>
where
    F: FnOnce() -> Result<T, AnalyzerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AnalyzerError::Internal(format!("blocking task failed: {e}")))?
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AnalyzerError> {
    let write_err = |source: std::io::Error| AnalyzerError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
