//! Structured extraction of a specialized report.
//!
//! The specialized prompt asks for a fixed layout (see
//! [`crate::prompts::SPECIALIZED_PROMPT`]). This module reads that layout
//! back into a [`StructuredReport`] so callers can consume the actions and
//! warnings as data. Parsing is lenient: a missing section yields an empty
//! list or `None`, never an error.
//!
//! Headings are matched case-insensitively and may carry a leading emoji
//! (`## 🎯 RECOMMENDED ACTIONS`). A section runs from its heading to the next
//! `##` or the end of the text.

use serde::{Deserialize, Serialize};

/// One record of the `RECOMMENDED ACTIONS` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub section: String,
    pub action_required: String,
    pub priority: String,
    pub timeline: String,
}

/// One record of the `WARNINGS` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub risk_level: String,
    pub issue: String,
    pub potential_consequences: String,
    pub mitigation: String,
}

/// Machine-readable view of a specialized report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReport {
    /// Text under `## Summary Evaluation`, empty when absent.
    pub summary: String,
    pub recommended_actions: Vec<RecommendedAction>,
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    /// The number in front of `%`, as written by the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<String>,
}

impl StructuredReport {
    /// True when nothing was recognised.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.recommended_actions.is_empty()
            && self.warnings.is_empty()
            && self.vendor.is_none()
            && self.date.is_none()
            && self.property_type.is_none()
            && self.overall_score.is_none()
    }
}

const ACTION_LABELS: [&str; 4] = ["Section:", "Action Required:", "Priority:", "Timeline:"];
const WARNING_LABELS: [&str; 4] = ["Risk Level:", "Issue:", "Potential Consequences:", "Mitigation:"];

/// Parse a specialized report.
pub fn parse_structured_report(text: &str) -> StructuredReport {
    let summary = section(text, "Summary Evaluation")
        .map(clean_value)
        .unwrap_or_default();

    let recommended_actions = section(text, "RECOMMENDED ACTIONS")
        .map(|body| {
            records(body, &ACTION_LABELS)
                .into_iter()
                .map(|[section, action_required, priority, timeline]| RecommendedAction {
                    section,
                    action_required,
                    priority,
                    timeline,
                })
                .collect()
        })
        .unwrap_or_default();

    let warnings = section(text, "WARNINGS")
        .map(|body| {
            records(body, &WARNING_LABELS)
                .into_iter()
                .map(|[risk_level, issue, potential_consequences, mitigation]| Warning {
                    risk_level,
                    issue,
                    potential_consequences,
                    mitigation,
                })
                .collect()
        })
        .unwrap_or_default();

    let overview = section(text, "Document Overview").unwrap_or("");

    StructuredReport {
        summary,
        recommended_actions,
        warnings,
        vendor: overview_field(overview, "**Vendor(s)**:"),
        date: overview_field(overview, "**Date**:"),
        property_type: overview_field(overview, "**Property Type**:"),
        overall_score: overall_score(overview),
    }
}

// ── Sections ─────────────────────────────────────────────────────────────

/// Body of the first `##` heading whose title starts with `title`.
fn section<'a>(text: &'a str, title: &str) -> Option<&'a str> {
    let mut from = 0;
    while let Some(pos) = text[from..].find("##") {
        let start = from + pos;
        let heading = text[start..]
            .trim_start_matches('#')
            .trim_start_matches(|c: char| !c.is_alphanumeric());
        let matches = heading
            .get(..title.len())
            .is_some_and(|h| h.eq_ignore_ascii_case(title));
        if matches {
            let body = &heading[title.len()..];
            let end = body.find("##").unwrap_or(body.len());
            return Some(&body[..end]);
        }
        from = start + 2;
    }
    None
}

/// Split `body` into records opening with `labels[0]` and read the labelled
/// fields in order. Records missing a label are dropped.
fn records<const N: usize>(body: &str, labels: &[&str; N]) -> Vec<[String; N]> {
    let starts: Vec<usize> = body.match_indices(labels[0]).map(|(i, _)| i).collect();
    starts
        .iter()
        .enumerate()
        .filter_map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(body.len());
            fields(&body[start..end], labels)
        })
        .collect()
}

fn fields<const N: usize>(chunk: &str, labels: &[&str; N]) -> Option<[String; N]> {
    let mut spans = [(0usize, 0usize); N];
    let mut from = 0;
    for (span, label) in spans.iter_mut().zip(labels) {
        let at = from + chunk[from..].find(label)?;
        *span = (at, at + label.len());
        from = span.1;
    }
    Some(std::array::from_fn(|i| {
        let end = spans.get(i + 1).map_or(chunk.len(), |next| next.0);
        clean_value(&chunk[spans[i].1..end])
    }))
}

/// Drop `<br>` tags, collapse whitespace, strip bullet and bold markers.
fn clean_value(raw: &str) -> String {
    let text = raw
        .replace("</br>", " ")
        .replace("<br/>", " ")
        .replace("<br>", " ");
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '*' || c == '-' || c.is_whitespace())
        .to_string()
}

// ── Overview ─────────────────────────────────────────────────────────────

/// Value after `label`, up to the end of its line or the next ` - **` item.
fn overview_field(overview: &str, label: &str) -> Option<String> {
    let rest = &overview[overview.find(label)? + label.len()..];
    let line = rest.split('\n').next().unwrap_or("");
    let value = line.split(" - **").next().unwrap_or("");
    Some(clean_value(value)).filter(|v| !v.is_empty())
}

fn overall_score(overview: &str) -> Option<String> {
    let label = "**Overall Score**:";
    let rest = &overview[overview.find(label)? + label.len()..];
    let line = rest.split('\n').next().unwrap_or("");
    let score = line[..line.find('%')?].trim();
    Some(score.to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
# ANALYSIS REPORT: DV-2024-17

## Document Overview
- **Vendor(s)**: Marie Tremblay, Jean Roy
- **Date**: 2024-05-01
- **Property Type**: Condominium
- **Overall Score**: 72%

## 🎯 RECOMMENDED ACTIONS
Section: DV5
Action Required: Attach the inspection report
Priority: High
Timeline: Immediate</br>

Section: DV12
Action Required: Complete the signature block
Priority: Medium
Timeline: Within 3 days

## ⚠️ WARNINGS
Risk Level: Critical
Issue: Water infiltration declared without report
Potential Consequences: Latent defect claim
Mitigation: Obtain a moisture assessment

## Summary Evaluation
The form is mostly complete
but two sections need attention.
";

    #[test]
    fn parses_every_part() {
        let r = parse_structured_report(REPORT);
        assert_eq!(r.summary, "The form is mostly complete but two sections need attention.");
        assert_eq!(r.vendor.as_deref(), Some("Marie Tremblay, Jean Roy"));
        assert_eq!(r.date.as_deref(), Some("2024-05-01"));
        assert_eq!(r.property_type.as_deref(), Some("Condominium"));
        assert_eq!(r.overall_score.as_deref(), Some("72"));

        assert_eq!(r.recommended_actions.len(), 2);
        assert_eq!(
            r.recommended_actions[0],
            RecommendedAction {
                section: "DV5".into(),
                action_required: "Attach the inspection report".into(),
                priority: "High".into(),
                timeline: "Immediate".into(),
            }
        );
        assert_eq!(r.recommended_actions[1].timeline, "Within 3 days");

        assert_eq!(r.warnings.len(), 1);
        assert_eq!(r.warnings[0].risk_level, "Critical");
        assert_eq!(r.warnings[0].mitigation, "Obtain a moisture assessment");
    }

    #[test]
    fn single_line_layout() {
        let text = "## Document Overview - **Vendor(s)**: A. Roy - **Date**: 1 May - \
                    **Overall Score**: 90% ## RECOMMENDED ACTIONS Section: DV1 Action Required: \
                    Sign Priority: Low Timeline: Immediate ## Summary Evaluation Fine.";
        let r = parse_structured_report(text);
        assert_eq!(r.vendor.as_deref(), Some("A. Roy"));
        assert_eq!(r.date.as_deref(), Some("1 May"));
        assert_eq!(r.overall_score.as_deref(), Some("90"));
        assert_eq!(r.recommended_actions.len(), 1);
        assert_eq!(r.recommended_actions[0].action_required, "Sign");
        assert_eq!(r.summary, "Fine.");
    }

    #[test]
    fn incomplete_records_are_dropped() {
        let text = "## WARNINGS\nRisk Level: High\nIssue: x\n\nRisk Level: Low\nIssue: y\n\
                    Potential Consequences: z\nMitigation: w\n";
        let r = parse_structured_report(text);
        assert_eq!(r.warnings.len(), 1);
        assert_eq!(r.warnings[0].issue, "y");
    }

    #[test]
    fn free_text_yields_empty_report() {
        let r = parse_structured_report("Error: 500, upstream unavailable");
        assert!(r.is_empty());
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("vendor").is_none());
        assert_eq!(json["recommended_actions"], serde_json::json!([]));
    }
}
