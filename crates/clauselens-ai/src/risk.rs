//! Hybrid risk scoring.
//!
//! Every clause gets two independent verdicts:
//!
//! - **static**: the clause category's risk phrases, matched as
//!   case-insensitive substrings. Any hit is High, otherwise Low.
//! - **model**: the generation backend is asked for a small JSON object with
//!   `risk_level` and `risk_reason`. Anything unusable falls back to Low with a
//!   diagnostic reason; a bad response never aborts the batch.
//!
//! The clause's level is the more severe of the two.

use std::sync::{Arc, LazyLock};

use clauselens_core::{Clause, RiskAssessment, RiskLevel, Taxonomy};
use futures::StreamExt;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::llm::{GenerateError, Generator};

/// First `{` through last `}` of a response.
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid JSON object regex"));

pub const NO_OBVIOUS_RISK: &str = "No obvious risk";

// ── Static assessment ──

/// Lexical verdict for one clause.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticAssessment {
    pub level: RiskLevel,
    pub reason: String,
}

/// Match the category's risk phrases against the clause text.
///
/// A deviation from the nearest template is noted in the reason but never
/// raises the level.
pub fn static_assessment(clause: &Clause, taxonomy: &Taxonomy) -> StaticAssessment {
    let text = clause.text.to_lowercase();
    let mut reasons: Vec<String> = taxonomy
        .phrases_for(clause.category())
        .iter()
        .filter(|phrase| text.contains(&phrase.to_lowercase()))
        .map(|phrase| format!("Contains risky phrase: '{phrase}'"))
        .collect();

    let level = if reasons.is_empty() {
        reasons.push(NO_OBVIOUS_RISK.to_string());
        RiskLevel::Low
    } else {
        RiskLevel::High
    };

    if let Some(m) = clause.template.as_ref().filter(|m| m.deviation) {
        reasons.push(format!(
            "Deviates from {} template (similarity {:.2})",
            m.label, m.similarity
        ));
    }

    StaticAssessment {
        level,
        reason: reasons.join("; "),
    }
}

// ── Model assessment ──

/// Parsed model verdict, or the documented fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelAssessment {
    Parsed { level: RiskLevel, reason: String },
    Fallback { reason: String },
}

impl ModelAssessment {
    fn fallback(reason: impl Into<String>) -> Self {
        Self::Fallback {
            reason: reason.into(),
        }
    }

    /// Fallbacks always count as Low.
    pub fn level(&self) -> RiskLevel {
        match self {
            Self::Parsed { level, .. } => *level,
            Self::Fallback { .. } => RiskLevel::Low,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Parsed { reason, .. } | Self::Fallback { reason } => reason,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

#[derive(Deserialize)]
struct RawVerdict {
    risk_level: String,
    #[serde(default)]
    risk_reason: String,
}

/// Decode the first brace-delimited object in a raw model response.
pub fn parse_model_response(raw: &str) -> ModelAssessment {
    let Some(m) = JSON_OBJECT.find(raw) else {
        return ModelAssessment::fallback("LLM did not return valid JSON");
    };
    let verdict: RawVerdict = match serde_json::from_str(m.as_str()) {
        Ok(v) => v,
        Err(_) => return ModelAssessment::fallback("LLM returned invalid JSON"),
    };
    match RiskLevel::parse(&verdict.risk_level) {
        Some(level) => ModelAssessment::Parsed {
            level,
            reason: verdict.risk_reason.trim().to_string(),
        },
        None => ModelAssessment::fallback(format!(
            "LLM returned unknown risk level '{}'",
            verdict.risk_level
        )),
    }
}

/// Prompt asking the model to grade one clause.
pub fn build_risk_prompt(clause: &Clause) -> String {
    let template_line = match &clause.template {
        Some(m) => format!(
            "Nearest Standard Template: {} (similarity {:.2})\n",
            m.label, m.similarity
        ),
        None => String::new(),
    };
    format!(
        "You are a legal risk analyst. Evaluate the following contract clause for potential \
         business/legal risk.\n\
         \n\
         Clause Category: {category}\n\
         {template_line}\
         Clause Text: {text}\n\
         \n\
         1. Assign a risk level: Low, Medium, or High\n\
         2. Explain why this clause might be risky (brief explanation)\n\
         3. Return only a JSON object with keys: 'risk_level', 'risk_reason'\n",
        category = clause.category(),
        text = clause.text,
    )
}

// ── Scorer ──

/// Combines static and model verdicts per clause.
pub struct RiskScorer {
    taxonomy: Arc<Taxonomy>,
    generator: Arc<dyn Generator>,
    max_concurrency: usize,
}

impl RiskScorer {
    pub fn new(taxonomy: Arc<Taxonomy>, generator: Arc<dyn Generator>) -> Self {
        Self {
            taxonomy,
            generator,
            max_concurrency: 1,
        }
    }

    /// Allow up to `n` model calls in flight. Results keep clause order.
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    /// Ask the backend for a verdict, recovering every failure to a fallback.
    pub async fn model_assessment(&self, clause: &Clause) -> ModelAssessment {
        let prompt = build_risk_prompt(clause);
        match self.generator.generate(&prompt).await {
            Ok(raw) => {
                let assessment = parse_model_response(&raw);
                if assessment.is_fallback() {
                    warn!(
                        clause_id = %clause.clause_id,
                        reason = assessment.reason(),
                        "unusable model response, defaulting to Low"
                    );
                }
                assessment
            }
            Err(GenerateError::Disabled) => ModelAssessment::fallback("LLM disabled"),
            Err(e) => {
                warn!(clause_id = %clause.clause_id, error = %e, "model call failed, defaulting to Low");
                ModelAssessment::fallback(format!("LLM call failed: {e}"))
            }
        }
    }

    /// Score one clause.
    pub async fn assess(&self, clause: &Clause) -> RiskAssessment {
        let stat = static_assessment(clause, &self.taxonomy);
        let model = self.model_assessment(clause).await;
        let assessment = RiskAssessment::combine(
            stat.level,
            stat.reason,
            model.level(),
            model.reason().to_string(),
        )
        .with_model_fallback(model.is_fallback());
        debug!(
            clause_id = %clause.clause_id,
            static_level = %assessment.static_level,
            model_level = %assessment.model_level,
            level = %assessment.level,
            "scored clause"
        );
        assessment
    }

    /// Score every clause. Order is preserved regardless of concurrency.
    pub async fn detect_risks(&self, clauses: Vec<Clause>) -> Vec<Clause> {
        let scored: Vec<Clause> = futures::stream::iter(clauses)
            .map(|clause| async move {
                let risk = self.assess(&clause).await;
                clause.with_risk(risk)
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let high = scored
            .iter()
            .filter(|c| c.risk_level() == Some(RiskLevel::High))
            .count();
        info!(count = scored.len(), high, "scored clause risks");
        scored
    }
}
