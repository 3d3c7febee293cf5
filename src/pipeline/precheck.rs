//! Local compliance pre-check.
//!
//! For each checklist clause, every validation point is looked up in the
//! normalised form text with a plain substring search. The result is only
//! informational: it is folded into the prompt and returned to the caller,
//! it never affects rendering.

use crate::pipeline::checklist::ChecklistRow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-level clause status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    /// Every point was found.
    Conforme,
    /// At least one point is missing.
    PartiellementConforme,
    /// A missing point mentions a report ("rapport").
    NonConforme,
}

impl ComplianceStatus {
    pub fn label(self) -> &'static str {
        match self {
            ComplianceStatus::Conforme => "Conforme",
            ComplianceStatus::PartiellementConforme => "Partiellement conforme",
            ComplianceStatus::NonConforme => "Non conforme",
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            ComplianceStatus::Conforme => "✅",
            ComplianceStatus::PartiellementConforme => "🟡",
            ComplianceStatus::NonConforme => "🔴",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.marker(), self.label())
    }
}

/// Pre-check result for one clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseFinding {
    pub clause_id: String,
    pub clause_name: String,
    pub status: ComplianceStatus,
    /// Points not found in the text, in checklist order.
    pub missing: Vec<String>,
}

impl ClauseFinding {
    /// Summary block used in the prompt:
    /// `### {id} - {name}\nStatus: {status}\nMissing: {points | None}\n`.
    pub fn summary(&self) -> String {
        let missing = if self.missing.is_empty() {
            "None".to_string()
        } else {
            self.missing.join(", ")
        };
        format!(
            "### {} - {}\nStatus: {}\nMissing: {}\n",
            self.clause_id, self.clause_name, self.status, missing
        )
    }
}

/// Check one clause against normalised form text.
pub fn check_clause(row: &ChecklistRow, text: &str) -> ClauseFinding {
    let missing: Vec<String> = row
        .points()
        .into_iter()
        .filter(|p| !text.contains(p.as_str()))
        .collect();

    let status = if missing.iter().any(|m| m.contains("rapport")) {
        ComplianceStatus::NonConforme
    } else if !missing.is_empty() {
        ComplianceStatus::PartiellementConforme
    } else {
        ComplianceStatus::Conforme
    };

    ClauseFinding {
        clause_id: row.clause_id.clone(),
        clause_name: row.clause_name.clone(),
        status,
        missing,
    }
}

/// Check every clause, in checklist order.
pub fn precheck(rows: &[ChecklistRow], text: &str) -> Vec<ClauseFinding> {
    let findings: Vec<ClauseFinding> = rows.iter().map(|r| check_clause(r, text)).collect();
    tracing::info!(
        "Pre-check: {} clauses, {} conforme, {} partiel, {} non conforme",
        findings.len(),
        count(&findings, ComplianceStatus::Conforme),
        count(&findings, ComplianceStatus::PartiellementConforme),
        count(&findings, ComplianceStatus::NonConforme),
    );
    findings
}

fn count(findings: &[ClauseFinding], status: ComplianceStatus) -> usize {
    findings.iter().filter(|f| f.status == status).count()
}

/// Concatenated clause summaries.
pub fn summarize(findings: &[ClauseFinding]) -> String {
    findings.iter().map(ClauseFinding::summary).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(points: &str) -> ChecklistRow {
        ChecklistRow {
            clause_id: "DV5".into(),
            clause_name: "Inspection".into(),
            validation_points: points.into(),
        }
    }

    const TEXT: &str = "le vendeur déclare que l'immeuble a fait l'objet d'une inspection";

    #[test]
    fn all_points_found() {
        let f = check_clause(&row("Vendeur - Inspection"), TEXT);
        assert_eq!(f.status, ComplianceStatus::Conforme);
        assert!(f.missing.is_empty());
    }

    #[test]
    fn missing_point_is_partial() {
        let f = check_clause(&row("vendeur - piscine"), TEXT);
        assert_eq!(f.status, ComplianceStatus::PartiellementConforme);
        assert_eq!(f.missing, vec!["piscine"]);
    }

    #[test]
    fn missing_rapport_is_non_conforme() {
        let f = check_clause(&row("inspection - rapport d'inspection - piscine"), TEXT);
        assert_eq!(f.status, ComplianceStatus::NonConforme);
        assert_eq!(f.missing, vec!["rapport d'inspection", "piscine"]);
    }

    #[test]
    fn empty_points_are_conforme() {
        let f = check_clause(&row(""), TEXT);
        assert_eq!(f.status, ComplianceStatus::Conforme);
    }

    #[test]
    fn summary_format() {
        let f = check_clause(&row("vendeur - piscine"), TEXT);
        assert_eq!(
            f.summary(),
            "### DV5 - Inspection\nStatus: 🟡 Partiellement conforme\nMissing: piscine\n"
        );
        let ok = check_clause(&row("vendeur"), TEXT);
        assert!(ok.summary().ends_with("Missing: None\n"));
        assert!(ok.summary().contains("✅ Conforme"));
    }

    #[test]
    fn summarize_keeps_order() {
        let rows = vec![row("vendeur"), row("piscine")];
        let s = summarize(&precheck(&rows, TEXT));
        assert_eq!(s.matches("### DV5").count(), 2);
        assert!(s.find("Conforme").unwrap() < s.find("Partiellement").unwrap());
    }
}
