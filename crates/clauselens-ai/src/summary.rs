//! Executive and risk summaries over the Medium/High findings.
//!
//! Both prompts restrict the model to the findings listed in them. When
//! there is nothing to report the backend is not called at all.

use clauselens_core::{Clause, MissingClauseFinding};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::llm::{GenerateError, Generator};

pub const NO_FINDINGS_EXECUTIVE: &str =
    "- No material risks were identified in the reviewed clauses.";
pub const NO_FINDINGS_RISK: &str =
    "No material risks were identified in the analyzed clauses or in mandatory clause coverage.";

const NO_EXPLANATION: &str = "No explanation provided.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub executive_summary: String,
    pub risk_summary: String,
}

fn needs_attention(clause: &&Clause) -> bool {
    clause.risk_level().is_some_and(|l| l.needs_attention())
}

/// Model explanation, else static reason, else a placeholder. Fallback
/// diagnostics ("LLM did not return valid JSON") never count as an explanation.
fn explanation(clause: &Clause) -> &str {
    let Some(risk) = &clause.risk else {
        return NO_EXPLANATION;
    };
    risk.model_explanation()
        .or_else(|| Some(risk.static_reason.trim()).filter(|s| !s.is_empty()))
        .unwrap_or(NO_EXPLANATION)
}

/// True when at least one clause or missing finding would appear in a prompt.
pub fn has_findings(clauses: &[Clause], missing: &[MissingClauseFinding]) -> bool {
    !missing.is_empty() || clauses.iter().any(|c| needs_attention(&c))
}

pub fn build_executive_summary_prompt(
    clauses: &[Clause],
    missing: &[MissingClauseFinding],
) -> String {
    let mut points: Vec<String> = clauses
        .iter()
        .filter(needs_attention)
        .map(|c| format!("- {} clause may require attention.", c.category()))
        .collect();
    points.extend(
        missing
            .iter()
            .map(|m| format!("- {} clause is missing.", m.clause_type)),
    );

    format!(
        "You are a business-focused legal assistant.\n\
         \n\
         Based on the following findings, generate a concise executive summary\n\
         (4-5 bullet points, non-technical language).\n\
         \n\
         Findings:\n\
         {points}\n\
         \n\
         Do not use legal jargon.\n\
         Do not add information not present in the findings.\n",
        points = points.join("\n"),
    )
}

pub fn build_risk_summary_prompt(clauses: &[Clause], missing: &[MissingClauseFinding]) -> String {
    let details: Vec<String> = clauses
        .iter()
        .filter(needs_attention)
        .filter_map(|c| {
            let level = c.risk_level()?;
            Some(format!(
                "Clause Type: {}\nRisk Level: {}\nExplanation: {}\n",
                c.category(),
                level,
                explanation(c)
            ))
        })
        .collect();

    let missing_block = if missing.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = missing
            .iter()
            .map(|m| format!("- {} (Severity: {}): {}", m.clause_type, m.severity, m.reason))
            .collect();
        format!("\nMissing Clauses:\n{}\n", lines.join("\n"))
    };

    format!(
        "You are a legal risk analyst.\n\
         \n\
         Generate a precise contract-level risk summary highlighting\n\
         material risks based only on the information below.\n\
         \n\
         Limit the answer to 200 words.\n\
         \n\
         Risk Details:\n\
         {details}\
         {missing_block}\n\
         Rules:\n\
         - Do not introduce new risks\n\
         - Do not speculate beyond the provided information\n\
         - Use clear, lawyer-friendly language\n",
        details = details.join("\n"),
    )
}

/// Generate both summaries. The two calls run concurrently; a failure of
/// either is returned to the caller.
pub async fn summarize(
    generator: &dyn Generator,
    clauses: &[Clause],
    missing: &[MissingClauseFinding],
) -> Result<ContractSummary, GenerateError> {
    if !has_findings(clauses, missing) {
        info!("no findings to summarize, skipping generation");
        return Ok(ContractSummary {
            executive_summary: NO_FINDINGS_EXECUTIVE.to_string(),
            risk_summary: NO_FINDINGS_RISK.to_string(),
        });
    }

    let exec_prompt = build_executive_summary_prompt(clauses, missing);
    let risk_prompt = build_risk_summary_prompt(clauses, missing);
    let (executive, risk) = futures::join!(
        generator.generate(&exec_prompt),
        generator.generate(&risk_prompt)
    );

    let summary = ContractSummary {
        executive_summary: executive?.trim().to_string(),
        risk_summary: risk?.trim().to_string(),
    };
    info!(
        backend = generator.name(),
        executive_len = summary.executive_summary.len(),
        risk_len = summary.risk_summary.len(),
        "generated summaries"
    );
    Ok(summary)
}
