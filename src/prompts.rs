//! Prompt texts and prompt assembly.
//!
//! Every request is one user message made of three parts:
//!
//! ```text
//! {base prompt}\n\n Analyse:{context} \n\n Using:{checklist table}
//! ```
//!
//! `base prompt` is [`STANDARD_PROMPT`], [`SPECIALIZED_PROMPT`] or the
//! caller's override ([`crate::config::AnalyzerConfig::base_prompt`]);
//! `context` is the pre-check summary or the raw form text depending on
//! [`PromptContext`].

use crate::config::{PromptContext, PromptVariant};

/// Default prompt for the free-form compliance report.
pub const STANDARD_PROMPT: &str =
    "Please analyze this real estate document for compliance with the provided checklist.";

/// Instruction template for the DV1–DV16 report.
///
/// The headings and record labels below are what
/// [`crate::report::parse_structured_report`] looks for.
pub const SPECIALIZED_PROMPT: &str = r#"<Instruction>
You are an expert real estate assistant specializing in form validation and compliance analysis. Your task is to analyze a "Déclarations du vendeur" (DV) form based on a detailed validation table that outlines expected responses, required documents, and critical checks for each section (DV1 to DV16).
The first document is the form to analyze. The second is the validation table/checklist that provides the criteria for analysis.
You must:
- Evaluate conformity of each section (DV1 to DV16) by comparing the form content with the validation table.
- Find the names of the people selling and buying the property in the signature part.
- Identify issues and provide specialized guidance in two key areas:
  1. Recommended Actions - specific steps to take to resolve issues
  2. Warnings - critical issues that need immediate attention
</Instruction>

Format your output in the following specialized format:

# ANALYSIS REPORT: [form number]

## Document Overview
- **Vendor(s)**: [Names]
- **Date**: [Date]
- **Property Type**: [Type]
- **Overall Score**: [score]%

## 🎯 RECOMMENDED ACTIONS
Section: [Section]
Action Required: [Specific action]
Priority: [High/Medium/Low]
Timeline: [Immediate/Within X days]

## ⚠️ WARNINGS
Risk Level: [Critical/High/Medium]
Issue: [Issue description]
Potential Consequences: [Consequences]
Mitigation: [Mitigation approach]

## Summary Evaluation
[Brief summary paragraph with overall assessment]"#;

/// Built-in base prompt for a variant.
pub fn default_prompt(variant: PromptVariant) -> &'static str {
    match variant {
        PromptVariant::Standard => STANDARD_PROMPT,
        PromptVariant::Specialized => SPECIALIZED_PROMPT,
    }
}

/// The override when one is given and non-blank, else the built-in prompt.
pub fn base_prompt(variant: PromptVariant, custom: Option<&str>) -> &str {
    match custom {
        Some(p) if !p.trim().is_empty() => p,
        _ => default_prompt(variant),
    }
}

/// Pick the text that follows `Analyse:`.
pub fn prompt_context<'a>(context: PromptContext, precheck_summary: &'a str, raw_text: &'a str) -> &'a str {
    match context {
        PromptContext::PrecheckSummary => precheck_summary,
        PromptContext::RawPdfText => raw_text,
    }
}

/// Assemble the full prompt.
///
/// The specialized template is followed by `Using: ` with a space, the
/// standard one by `Using:` without.
pub fn build_prompt(variant: PromptVariant, base: &str, context: &str, checklist_table: &str) -> String {
    let using = match variant {
        PromptVariant::Standard => "Using:",
        PromptVariant::Specialized => "Using: ",
    };
    format!("{base}\n\n Analyse:{context} \n\n {using}{checklist_table}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_prompt_layout() {
        let p = build_prompt(PromptVariant::Standard, STANDARD_PROMPT, "CTX", "| a |");
        assert_eq!(
            p,
            "Please analyze this real estate document for compliance with the provided checklist.\
             \n\n Analyse:CTX \n\n Using:| a |"
        );
    }

    #[test]
    fn specialized_prompt_layout() {
        let p = build_prompt(PromptVariant::Specialized, "BASE", "x", "T");
        assert_eq!(p, "BASE\n\n Analyse:x \n\n Using: T");
    }

    #[test]
    fn override_wins_unless_blank() {
        assert_eq!(base_prompt(PromptVariant::Standard, Some("Mine")), "Mine");
        assert_eq!(base_prompt(PromptVariant::Standard, Some("  ")), STANDARD_PROMPT);
        assert_eq!(base_prompt(PromptVariant::Specialized, None), SPECIALIZED_PROMPT);
    }

    #[test]
    fn context_selection() {
        assert_eq!(prompt_context(PromptContext::PrecheckSummary, "sum", "raw"), "sum");
        assert_eq!(prompt_context(PromptContext::RawPdfText, "sum", "raw"), "raw");
    }

    #[test]
    fn specialized_template_names_every_section() {
        for needle in [
            "## Document Overview",
            "**Vendor(s)**:",
            "**Overall Score**: [score]%",
            "RECOMMENDED ACTIONS",
            "Action Required:",
            "WARNINGS",
            "Potential Consequences:",
            "## Summary Evaluation",
            "DV1 to DV16",
        ] {
            assert!(SPECIALIZED_PROMPT.contains(needle), "missing {needle}");
        }
    }
}
