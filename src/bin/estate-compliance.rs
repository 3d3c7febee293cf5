//! CLI binary for estate-compliance.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalyzerConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use estate_compliance::{
    analyze, analyze_both, render_report, run_precheck, save_pdf, AnalysisOutput,
    AnalysisProgressCallback, AnalyzerConfig, ComplianceStatus, ProgressCallback, PromptContext,
    PromptVariant, RenderMode, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner showing the running stage, with one
/// log line per finished stage. When both reports are requested the LLM and
/// render stages finish twice, once per report.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Analysing");
        bar.set_message("Opening inputs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<24}  {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_analysis_complete(&self, total_ms: u64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} done in {}",
            green("✔"),
            bold(&format!("{:.1}s", total_ms as f64 / 1000.0))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Standard report for a form and its checklist
  estate-compliance analyze form-dv.pdf checklist.xlsx -o report.pdf

  # DV1-DV16 report, also printed as structured JSON
  estate-compliance analyze --report specialized --json form-dv.pdf checklist.xlsx

  # Both reports at once (report-standard.pdf, report-specialized.pdf)
  estate-compliance analyze --report both form-dv.pdf checklist.xlsx -o report.pdf

  # Inputs from URLs
  estate-compliance analyze https://host/form.pdf https://host/checklist.xlsx

  # Local pre-check only (no API key needed)
  estate-compliance precheck form-dv.pdf checklist.xlsx

  # Render an existing markdown answer to PDF (no API key needed)
  estate-compliance render answer.md -o answer.pdf --mode minimal

CHECKLIST FORMAT:
  First worksheet, first row is the header. Required columns:
    Code form.               clause id (DV1, DV2, …)
    Nom de la clause         clause name
    Éléments de validation   dash-separated phrases expected in the form

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY       Key for the chat-completions endpoint
  ESTATE_COMPLIANCE_MODEL  Override model ID (default anthropic/claude-3-sonnet)
  RUST_LOG                 Override log filter (e.g. estate_compliance=debug)
"#;

/// Check real-estate disclosure forms against a compliance checklist.
#[derive(Parser, Debug)]
#[command(
    name = "estate-compliance",
    version,
    about = "Check real-estate disclosure forms against a compliance checklist with an LLM",
    long_about = "Extract the text of a filled disclosure form, pre-check it against a checklist \
spreadsheet, ask a chat LLM for a compliance report and render the answer as a PDF. The LLM is \
reached through an OpenAI-style chat-completions endpoint (OpenRouter by default) or any \
edgequake-llm provider.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "ESTATE_COMPLIANCE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "ESTATE_COMPLIANCE_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "ESTATE_COMPLIANCE_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a form against a checklist and render the report to PDF.
    Analyze(AnalyzeArgs),
    /// Run the local substring pre-check only.
    Precheck(PrecheckArgs),
    /// Render a markdown file to PDF.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Disclosure form: local PDF path or HTTP/HTTPS URL.
    form: String,

    /// Checklist workbook (xlsx/xls/ods): local path or HTTP/HTTPS URL.
    checklist: String,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "ESTATE_COMPLIANCE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[command(flatten)]
    inputs: InputArgs,

    /// Write the PDF report here. With `--report both` the report name gets
    /// a `-standard` / `-specialized` suffix.
    #[arg(short, long, env = "ESTATE_COMPLIANCE_OUTPUT")]
    output: Option<PathBuf>,

    /// Which report to ask for.
    #[arg(long, value_enum, default_value = "standard")]
    report: ReportArg,

    /// PDF layout: rich (headings, tables) or minimal (wrapped lines).
    #[arg(long, value_enum, default_value = "rich", env = "ESTATE_COMPLIANCE_MODE")]
    mode: ModeArg,

    /// API key for the chat-completions endpoint.
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// LLM model ID.
    #[arg(long, env = "ESTATE_COMPLIANCE_MODEL")]
    model: Option<String>,

    /// Chat-completions URL.
    #[arg(long, env = "ESTATE_COMPLIANCE_ENDPOINT")]
    endpoint: Option<String>,

    /// Use an edgequake-llm provider (openai, anthropic, gemini, ollama, …)
    /// instead of the endpoint. The provider reads its own key variable.
    #[arg(long, env = "ESTATE_COMPLIANCE_PROVIDER")]
    provider: Option<String>,

    /// Text file whose content replaces the built-in base prompt.
    #[arg(long, env = "ESTATE_COMPLIANCE_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Send the raw form text after `Analyse:` instead of the pre-check
    /// summary.
    #[arg(long)]
    raw_context: bool,

    /// Fail on a non-success LLM answer instead of rendering the error text.
    #[arg(long, env = "ESTATE_COMPLIANCE_STRICT")]
    strict: bool,

    /// Max LLM output tokens (provider mode).
    #[arg(long, default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (provider mode).
    #[arg(long, default_value_t = 0.1)]
    temperature: f32,

    /// LLM call timeout in seconds.
    #[arg(long, env = "ESTATE_COMPLIANCE_API_TIMEOUT", default_value_t = 180)]
    api_timeout: u64,

    /// Print the output as JSON (findings, report text, structured report,
    /// stats) on stdout.
    #[arg(long)]
    json: bool,

    /// Print the report text on stdout.
    #[arg(long, conflicts_with = "json")]
    print: bool,
}

#[derive(Args, Debug)]
struct PrecheckArgs {
    #[command(flatten)]
    inputs: InputArgs,

    /// Print findings as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Markdown file to render, or `-` for stdin.
    input: String,

    /// Output PDF path. Defaults to the input name with a `.pdf` extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// PDF layout: rich (headings, tables) or minimal (wrapped lines).
    #[arg(long, value_enum, default_value = "rich")]
    mode: ModeArg,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ReportArg {
    Standard,
    Specialized,
    Both,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Rich,
    Minimal,
}

impl From<ModeArg> for RenderMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Rich => RenderMode::Rich,
            ModeArg::Minimal => RenderMode::Minimal,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are hidden while the spinner is active; it already
    // shows each stage.
    let json = match &cli.command {
        Command::Analyze(a) => a.json,
        Command::Precheck(p) => p.json,
        Command::Render(_) => false,
    };
    let show_progress = !cli.quiet && !cli.no_progress && !json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };

    match &cli.command {
        Command::Analyze(args) => run_analyze(&cli, args, progress_cb).await,
        Command::Precheck(args) => run_precheck_cmd(&cli, args, progress_cb).await,
        Command::Render(args) => run_render(&cli, args).await,
    }
}

// ── analyze ──────────────────────────────────────────────────────────────────

async fn run_analyze(cli: &Cli, args: &AnalyzeArgs, progress: Option<ProgressCallback>) -> Result<()> {
    let variant = match args.report {
        ReportArg::Specialized => PromptVariant::Specialized,
        ReportArg::Standard | ReportArg::Both => PromptVariant::Standard,
    };
    let config = build_config(args, variant, progress).await?;
    let inputs = &args.inputs;

    if args.report == ReportArg::Both {
        let both = analyze_both(&inputs.form, &inputs.checklist, &config)
            .await
            .context("Analysis failed")?;

        let base = args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from("report.pdf"));
        let standard_path = with_suffix(&base, "standard");
        let specialized_path = with_suffix(&base, "specialized");
        save_pdf(&both.standard.pdf, &standard_path)
            .await
            .context("Failed to write standard report")?;
        save_pdf(&both.specialized.pdf, &specialized_path)
            .await
            .context("Failed to write specialized report")?;

        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&both).context("Failed to serialise output")?
            );
        } else if args.print {
            print_text(&both.standard.report)?;
            print_text(&both.specialized.report)?;
        }
        if !cli.quiet {
            print_summary(&both.standard, &standard_path);
            print_summary(&both.specialized, &specialized_path);
        }
        return Ok(());
    }

    let output = analyze(&inputs.form, &inputs.checklist, &config)
        .await
        .context("Analysis failed")?;

    let path = args.output.clone().unwrap_or_else(|| match variant {
        PromptVariant::Standard => PathBuf::from("standard_report.pdf"),
        PromptVariant::Specialized => PathBuf::from("specialized_report.pdf"),
    });
    save_pdf(&output.pdf, &path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if args.print {
        print_text(&output.report)?;
    }
    if !cli.quiet {
        print_summary(&output, &path);
    }
    Ok(())
}

/// Map CLI args to `AnalyzerConfig`.
async fn build_config(
    args: &AnalyzeArgs,
    variant: PromptVariant,
    progress: Option<ProgressCallback>,
) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .prompt_variant(variant)
        .render_mode(args.mode.into())
        .strict_llm_errors(args.strict)
        .max_tokens(args.max_tokens)
        .temperature(args.temperature)
        .api_timeout_secs(args.api_timeout)
        .download_timeout_secs(args.inputs.download_timeout);

    if args.raw_context {
        builder = builder.prompt_context(PromptContext::RawPdfText);
    }
    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref endpoint) = args.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref path) = args.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.base_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `report.pdf` + `standard` → `report-standard.pdf`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pdf".to_string());
    path.with_file_name(format!("{stem}-{suffix}.{ext}"))
}

fn print_summary(output: &AnalysisOutput, path: &Path) {
    let findings = &output.findings;
    let count = |status: ComplianceStatus| findings.iter().filter(|f| f.status == status).count();
    eprintln!(
        "{}  {:?} report  {} page(s)  →  {}",
        if output.llm_degraded { yellow("⚠") } else { green("✔") },
        output.variant,
        output.stats.report_pages,
        bold(&path.display().to_string()),
    );
    if output.llm_degraded {
        eprintln!(
            "   {}",
            yellow("the model endpoint returned an error; the report contains the error text")
        );
    }
    eprintln!(
        "   pre-check: {} conforme, {} partiel, {} non conforme",
        green(&count(ComplianceStatus::Conforme).to_string()),
        yellow(&count(ComplianceStatus::PartiellementConforme).to_string()),
        red(&count(ComplianceStatus::NonConforme).to_string()),
    );
    if let Some(ref s) = output.structured {
        eprintln!(
            "   {} recommended action(s), {} warning(s){}",
            s.recommended_actions.len(),
            s.warnings.len(),
            s.overall_score
                .as_ref()
                .map(|score| format!(", overall score {score}%"))
                .unwrap_or_default()
        );
    }
    eprintln!(
        "   {} tokens in  /  {} tokens out  ({})",
        dim(&output.stats.input_tokens.to_string()),
        dim(&output.stats.output_tokens.to_string()),
        dim(&output.stats.model),
    );
}

fn print_text(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

// ── precheck ─────────────────────────────────────────────────────────────────

async fn run_precheck_cmd(
    cli: &Cli,
    args: &PrecheckArgs,
    progress: Option<ProgressCallback>,
) -> Result<()> {
    let mut builder =
        AnalyzerConfig::builder().download_timeout_secs(args.inputs.download_timeout);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let output = run_precheck(&args.inputs.form, &args.inputs.checklist, &config)
        .await
        .context("Pre-check failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
        return Ok(());
    }

    for f in &output.findings {
        let label = format!("{} - {}", f.clause_id, f.clause_name);
        let status = match f.status {
            ComplianceStatus::Conforme => green(&f.status.to_string()),
            ComplianceStatus::PartiellementConforme => yellow(&f.status.to_string()),
            ComplianceStatus::NonConforme => red(&f.status.to_string()),
        };
        println!("{}  {}", bold(&label), status);
        if !f.missing.is_empty() {
            println!("    {} {}", dim("missing:"), f.missing.join(", "));
        }
    }

    if !cli.quiet {
        eprintln!(
            "{} {} clause(s) from {} form page(s): {} conforme, {} partiel, {} non conforme",
            cyan("◆"),
            output.checklist_rows,
            output.form_pages,
            output.count(ComplianceStatus::Conforme),
            output.count(ComplianceStatus::PartiellementConforme),
            output.count(ComplianceStatus::NonConforme),
        );
    }
    Ok(())
}

// ── render ───────────────────────────────────────────────────────────────────

async fn run_render(cli: &Cli, args: &RenderArgs) -> Result<()> {
    let text = if args.input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(&args.input)
            .await
            .with_context(|| format!("Failed to read {}", args.input))?
    };

    let path = match (&args.output, args.input.as_str()) {
        (Some(p), _) => p.clone(),
        (None, "-") => PathBuf::from("report.pdf"),
        (None, input) => Path::new(input).with_extension("pdf"),
    };

    let pdf = render_report(text, args.mode.into())
        .await
        .context("Rendering failed")?;
    save_pdf(&pdf, &path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if !cli.quiet {
        eprintln!(
            "{}  {} page(s), {} bytes  →  {}",
            green("✔"),
            pdf.page_count(),
            pdf.len(),
            bold(&path.display().to_string()),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_keeps_directory_and_extension() {
        assert_eq!(
            with_suffix(Path::new("out/report.pdf"), "standard"),
            PathBuf::from("out/report-standard.pdf")
        );
        assert_eq!(
            with_suffix(Path::new("report"), "specialized"),
            PathBuf::from("report-specialized.pdf")
        );
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "estate-compliance",
            "analyze",
            "--report",
            "both",
            "--mode",
            "minimal",
            "form.pdf",
            "list.xlsx",
        ])
        .unwrap();
        match cli.command {
            Command::Analyze(a) => {
                assert_eq!(a.report, ReportArg::Both);
                assert_eq!(a.inputs.form, "form.pdf");
                assert!(matches!(RenderMode::from(a.mode), RenderMode::Minimal));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
