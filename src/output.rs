//! Result types returned by the analysis entry points.

use crate::config::PromptVariant;
use crate::pipeline::precheck::{summarize, ClauseFinding, ComplianceStatus};
use crate::render::RenderedPdf;
use crate::report::StructuredReport;
use serde::Serialize;

/// One analysed report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub variant: PromptVariant,
    /// Cleaned model reply, or the `Error: {status}, {body}` text when the
    /// request was degraded.
    pub report: String,
    /// The rendered report. Not serialised.
    #[serde(skip)]
    pub pdf: RenderedPdf,
    /// Local pre-check, in checklist order.
    pub findings: Vec<ClauseFinding>,
    /// Parsed form of a specialized reply. `None` for standard reports and
    /// degraded replies.
    pub structured: Option<StructuredReport>,
    /// The endpoint answered with a non-success status and `report` holds
    /// the error text.
    pub llm_degraded: bool,
    pub stats: AnalysisStats,
}

/// Standard and specialized reports produced from the same inputs.
#[derive(Debug, Clone, Serialize)]
pub struct BothReports {
    pub standard: AnalysisOutput,
    pub specialized: AnalysisOutput,
}

/// Counters and timings for one analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    /// Model that answered.
    pub model: String,
    /// Pages in the disclosure form.
    pub form_pages: usize,
    /// Form pages whose text could not be decoded.
    pub skipped_form_pages: usize,
    /// Length of the normalised form text.
    pub text_chars: usize,
    pub checklist_rows: usize,
    pub prompt_chars: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Pages in the rendered report.
    pub report_pages: usize,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of the local pre-check alone.
#[derive(Debug, Clone, Serialize)]
pub struct PrecheckOutput {
    pub findings: Vec<ClauseFinding>,
    pub form_pages: usize,
    pub checklist_rows: usize,
}

impl PrecheckOutput {
    /// Number of clauses with `status`.
    pub fn count(&self, status: ComplianceStatus) -> usize {
        self.findings.iter().filter(|f| f.status == status).count()
    }

    /// The summary text that goes into the prompt.
    pub fn summary(&self) -> String {
        summarize(&self.findings)
    }
}
