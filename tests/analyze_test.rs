//! Pipeline tests with a canned completion client (no network).

use estate_compliance::pipeline::checklist::rows_from_table;
use estate_compliance::pipeline::extract::extract_text;
use estate_compliance::{
    analyze_both_inputs, analyze_inputs, analyze_with_client, render_markdown, AnalysisInputs, AnalysisProgressCallback,
    AnalyzerConfig, AnalyzerError, ComplianceStatus, CompletionClient, LlmResponse, PromptContext,
    PromptVariant, RenderMode, Stage,
};
use std::io::Write;
use std::sync::{Arc, Mutex};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Answers every prompt with the same response and records the prompts.
struct CannedClient {
    reply: LlmResponse,
    prompts: Mutex<Vec<String>>,
}

impl CannedClient {
    fn new(reply: LlmResponse) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn answering(content: &str) -> Self {
        Self::new(LlmResponse::Completion {
            content: content.to_string(),
            input_tokens: 120,
            output_tokens: 40,
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionClient for CannedClient {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse, AnalyzerError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "canned/model"
    }
}

const FORM: &str = "DV1 Le vendeur declare une inspection de la toiture.\n\
                    DV9 Aucune information sur la cour.";

fn form_pdf() -> Vec<u8> {
    render_markdown(FORM, RenderMode::Minimal).unwrap().into_bytes()
}

fn inputs() -> AnalysisInputs {
    let form = extract_text(&form_pdf()).unwrap();
    let headers: Vec<String> = ["Code form.", "Nom de la clause", "Éléments de validation"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let row = |cells: [&str; 3]| cells.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let rows = rows_from_table(
        &headers,
        vec![
            row(["DV1", "Vendeur", "Vendeur - Inspection"]),
            row(["DV5", "Inspection", "inspection - rapport d'inspection"]),
            row(["DV9", "Piscine", "piscine"]),
        ],
    )
    .unwrap();
    AnalysisInputs::new(form, rows)
}

const SPECIALIZED_REPLY: &str = "```markdown\n# ANALYSIS REPORT: DV\n\n\
## Document Overview\n- **Vendor(s)**: J. Roy\n- **Overall Score**: 66%\n\n\
## 🎯 RECOMMENDED ACTIONS\nSection: DV5\nAction Required: Attach the report\nPriority: High\nTimeline: Immediate\n\n\
## ⚠️ WARNINGS\nRisk Level: High\nIssue: No inspection report\nPotential Consequences: Claim\nMitigation: Order one\n\n\
## Summary Evaluation\nIncomplete.\n```";

// ── Pre-check ────────────────────────────────────────────────────────────────

#[test]
fn precheck_over_extracted_text() {
    let inputs = inputs();
    assert!(inputs.form.text.contains("le vendeur declare une inspection"));

    let statuses: Vec<_> = inputs.findings.iter().map(|f| f.status).collect();
    assert_eq!(
        statuses,
        vec![
            ComplianceStatus::Conforme,
            ComplianceStatus::NonConforme,
            ComplianceStatus::PartiellementConforme,
        ]
    );
    assert_eq!(inputs.findings[1].missing, vec!["rapport d'inspection"]);
    assert!(inputs.summary().contains("### DV9 - Piscine\nStatus: 🟡 Partiellement conforme\nMissing: piscine\n"));
}

// ── Standard report ──────────────────────────────────────────────────────────

#[tokio::test]
async fn standard_report_is_cleaned_and_rendered() {
    let client = CannedClient::answering("```markdown\r\n# Compliance\r\n\r\n| Clause | Status |\r\n| DV1 | OK |\r\n```");
    let config = AnalyzerConfig::default();
    let out = analyze_inputs(&client, &inputs(), PromptVariant::Standard, &config)
        .await
        .unwrap();

    assert_eq!(out.report, "# Compliance\n\n| Clause | Status |\n| DV1 | OK |\n");
    assert!(!out.llm_degraded);
    assert!(out.structured.is_none());
    assert_eq!(out.findings.len(), 3);
    assert_eq!(out.stats.model, "canned/model");
    assert_eq!(out.stats.input_tokens, 120);
    assert_eq!(out.stats.output_tokens, 40);
    assert_eq!(out.stats.checklist_rows, 3);
    assert_eq!(out.stats.report_pages, out.pdf.page_count());

    let text = extract_text(out.pdf.as_bytes()).unwrap().text;
    assert!(text.contains("compliance"), "got: {text}");
    assert!(text.contains("dv1"));

    let json = serde_json::to_value(&out).unwrap();
    assert!(json.get("pdf").is_none());
    assert_eq!(json["variant"], "standard");
    assert_eq!(json["findings"][1]["status"], "NonConforme");
}

#[tokio::test]
async fn prompt_carries_summary_and_checklist() {
    let client = CannedClient::answering("ok");
    let config = AnalyzerConfig::default();
    analyze_inputs(&client, &inputs(), PromptVariant::Standard, &config)
        .await
        .unwrap();

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    let p = &prompts[0];
    assert!(p.starts_with(
        "Please analyze this real estate document for compliance with the provided checklist.\n\n Analyse:### DV1 - Vendeur"
    ));
    assert!(p.contains(" \n\n Using:| Code form. | Nom de la clause | Éléments de validation |"));
    assert!(p.contains("| DV5 | Inspection | inspection - rapport d'inspection |"));
}

#[tokio::test]
async fn raw_context_sends_form_text() {
    let client = CannedClient::answering("ok");
    let config = AnalyzerConfig::builder()
        .prompt_context(PromptContext::RawPdfText)
        .build()
        .unwrap();
    let inputs = inputs();
    let out = analyze_inputs(&client, &inputs, PromptVariant::Standard, &config)
        .await
        .unwrap();

    let p = &client.prompts()[0];
    assert!(p.contains(&format!("Analyse:{} \n\n Using:", inputs.form.text)));
    assert!(!p.contains("### DV1"));
    // Findings are still returned.
    assert_eq!(out.findings.len(), 3);
}

// ── Degraded and strict LLM errors ───────────────────────────────────────────

#[tokio::test]
async fn api_error_is_rendered_as_report() {
    let client = CannedClient::new(LlmResponse::ApiError {
        status: 402,
        body: "insufficient credits".into(),
    });
    let config = AnalyzerConfig::default();
    let out = analyze_inputs(&client, &inputs(), PromptVariant::Specialized, &config)
        .await
        .unwrap();

    assert!(out.llm_degraded);
    assert_eq!(out.report, "Error: 402, insufficient credits\n");
    assert!(out.structured.is_none());
    assert_eq!(out.stats.input_tokens, 0);
    let text = extract_text(out.pdf.as_bytes()).unwrap().text;
    assert!(text.contains("error: 402, insufficient credits"), "got: {text}");
}

#[tokio::test]
async fn strict_mode_fails_on_api_error() {
    let client = CannedClient::new(LlmResponse::ApiError {
        status: 500,
        body: "upstream".into(),
    });
    let config = AnalyzerConfig::builder().strict_llm_errors(true).build().unwrap();
    let err = analyze_inputs(&client, &inputs(), PromptVariant::Standard, &config)
        .await
        .unwrap_err();
    match err {
        AnalyzerError::LlmApiError { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

// ── Specialized report ───────────────────────────────────────────────────────

#[tokio::test]
async fn specialized_reply_is_structured() {
    let client = CannedClient::answering(SPECIALIZED_REPLY);
    let config = AnalyzerConfig::builder()
        .prompt_variant(PromptVariant::Specialized)
        .render_mode(RenderMode::Minimal)
        .build()
        .unwrap();
    let out = analyze_inputs(&client, &inputs(), config.prompt_variant, &config)
        .await
        .unwrap();

    assert!(client.prompts()[0].starts_with("<Instruction>"));
    assert!(client.prompts()[0].contains(" \n\n Using: | Code form."));

    let s = out.structured.expect("structured report");
    assert_eq!(s.vendor.as_deref(), Some("J. Roy"));
    assert_eq!(s.overall_score.as_deref(), Some("66"));
    assert_eq!(s.summary, "Incomplete.");
    assert_eq!(s.recommended_actions.len(), 1);
    assert_eq!(s.recommended_actions[0].section, "DV5");
    assert_eq!(s.warnings.len(), 1);
    assert_eq!(s.warnings[0].issue, "No inspection report");
}

// ── Both reports ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn both_reports_send_one_prompt_each() {
    let client = CannedClient::answering(SPECIALIZED_REPLY);
    let config = AnalyzerConfig::default();
    let both = analyze_both_inputs(&client, &inputs(), &config).await.unwrap();

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts.iter().any(|p| p.starts_with("Please analyze this real estate document")));
    assert!(prompts.iter().any(|p| p.starts_with("<Instruction>")));

    assert_eq!(both.standard.variant, PromptVariant::Standard);
    assert_eq!(both.specialized.variant, PromptVariant::Specialized);
    assert!(both.standard.structured.is_none());
    let s = both.specialized.structured.as_ref().expect("structured report");
    assert_eq!(s.recommended_actions.len(), 1);
    assert!(!both.standard.llm_degraded && !both.specialized.llm_degraded);
    assert_eq!(both.standard.findings, both.specialized.findings);
}

#[tokio::test]
async fn both_reports_degrade_on_api_error() {
    let client = CannedClient::new(LlmResponse::ApiError {
        status: 429,
        body: "rate limited".into(),
    });
    let both = analyze_both_inputs(&client, &inputs(), &AnalyzerConfig::default())
        .await
        .unwrap();

    for out in [&both.standard, &both.specialized] {
        assert!(out.llm_degraded);
        assert_eq!(out.report, "Error: 429, rate limited\n");
        assert!(out.structured.is_none());
    }
}

#[tokio::test]
async fn both_reports_fail_in_strict_mode() {
    let client = CannedClient::new(LlmResponse::ApiError {
        status: 429,
        body: "rate limited".into(),
    });
    let config = AnalyzerConfig::builder().strict_llm_errors(true).build().unwrap();
    let err = analyze_both_inputs(&client, &inputs(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalyzerError::LlmApiError { status: 429, .. }), "got {err:?}");
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl AnalysisProgressCallback for Recorder {
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("start {stage:?}"));
    }

    fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
        self.events.lock().unwrap().push(format!("done {stage:?}"));
    }
}

#[tokio::test]
async fn stages_are_reported_in_order() {
    let recorder = Arc::new(Recorder::default());
    let config = AnalyzerConfig::builder()
        .progress_callback(recorder.clone() as Arc<dyn AnalysisProgressCallback>)
        .build()
        .unwrap();
    let client = CannedClient::answering("fine");
    analyze_inputs(&client, &inputs(), PromptVariant::Standard, &config)
        .await
        .unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start Llm", "done Llm", "start Render", "done Render"]
    );
}

// ── Input errors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn unreadable_checklist_skips_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let form_path = dir.path().join("form.pdf");
    std::fs::write(&form_path, form_pdf()).unwrap();

    let checklist_path = dir.path().join("checklist.xlsx");
    let mut f = std::fs::File::create(&checklist_path).unwrap();
    f.write_all(b"PK\x03\x04 not really a workbook").unwrap();

    let client = CannedClient::answering("never");
    let config = AnalyzerConfig::default();
    let err = analyze_with_client(
        &client,
        form_path.to_str().unwrap(),
        checklist_path.to_str().unwrap(),
        &config,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AnalyzerError::Checklist { .. }), "got {err:?}");
    assert!(err.is_data_error());
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn missing_form_is_reported() {
    let client = CannedClient::answering("never");
    let err = analyze_with_client(
        &client,
        "/no/such/form.pdf",
        "/no/such/checklist.xlsx",
        &AnalyzerConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AnalyzerError::FileNotFound { .. }));
}
