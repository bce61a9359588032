//! Clause records and the findings attached to them as they move through the
//! analysis pipeline.
//!
//! A [`Clause`] is created by the segmenter and never mutated afterwards:
//! each stage consumes the value and returns a new one with one more stage
//! result filled in (`with_classification`, `with_template_match`,
//! `with_risk`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::segment::normalize_heading;

/// Sentinel category for clauses the classifier could not place confidently.
pub const OTHER_CATEGORY: &str = "Other";

/// Risk type recorded on every [`MissingClauseFinding`].
pub const MISSING_CLAUSE_RISK_TYPE: &str = "Missing Clause";

/// Format a clause id from its 1-based output position: `CL_001`, `CL_002`, ...
pub fn clause_id(seq: usize) -> String {
    format!("CL_{seq:03}")
}

/// Ordered risk scale: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    /// Fixed numeric encoding of the level.
    pub fn score(self) -> f32 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.5,
            Self::High => 0.8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Parse a level name, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
    }

    /// Medium and High findings are reported in summaries; Low ones are not.
    pub fn needs_attention(self) -> bool {
        self >= Self::Medium
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for one clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Canonical label, or [`OTHER_CATEGORY`] when below the confidence floor.
    pub category: String,
    /// Best cosine similarity in [0, 1], reported even when overridden to "Other".
    pub confidence: f32,
}

/// Nearest canonical template for one clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMatch {
    pub label: String,
    pub similarity: f32,
    /// True iff `similarity` is strictly below the deviation threshold.
    pub deviation: bool,
}

/// Combined static + model risk verdict for one clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// The more severe of `static_level` and `model_level`.
    pub level: RiskLevel,
    pub static_level: RiskLevel,
    pub model_level: RiskLevel,
    pub static_reason: String,
    pub model_reason: String,
    /// The model gave no usable verdict; `model_reason` describes the failure.
    #[serde(default)]
    pub model_fallback: bool,
}

impl RiskAssessment {
    /// Combine the lexical and model verdicts by taking the higher level.
    pub fn combine(
        static_level: RiskLevel,
        static_reason: String,
        model_level: RiskLevel,
        model_reason: String,
    ) -> Self {
        Self {
            level: static_level.max(model_level),
            static_level,
            model_level,
            static_reason,
            model_reason,
            model_fallback: false,
        }
    }

    pub fn with_model_fallback(self, model_fallback: bool) -> Self {
        Self {
            model_fallback,
            ..self
        }
    }

    /// The model's own explanation, if it produced one.
    pub fn model_explanation(&self) -> Option<&str> {
        Some(self.model_reason.trim()).filter(|r| !self.model_fallback && !r.is_empty())
    }

    /// Always the fixed mapping of [`RiskAssessment::level`].
    pub fn score(&self) -> f32 {
        self.level.score()
    }

    /// Non-empty static and model reasons joined with `"; "`.
    pub fn reason(&self) -> String {
        [self.static_reason.as_str(), self.model_reason.as_str()]
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// One segmented section of a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub clause_id: String,
    pub heading: String,
    pub text: String,
    /// Line index of the heading in the normalized source (diagnostic only).
    pub start_line: usize,
    pub classification: Option<Classification>,
    pub template: Option<TemplateMatch>,
    pub risk: Option<RiskAssessment>,
}

impl Clause {
    /// A freshly segmented clause with no stage results yet.
    pub fn new(
        seq: usize,
        heading: impl Into<String>,
        text: impl Into<String>,
        start_line: usize,
    ) -> Self {
        Self {
            clause_id: clause_id(seq),
            heading: heading.into(),
            text: text.into(),
            start_line,
            classification: None,
            template: None,
            risk: None,
        }
    }

    /// Assigned category, or [`OTHER_CATEGORY`] before classification.
    pub fn category(&self) -> &str {
        self.classification
            .as_ref()
            .map(|c| c.category.as_str())
            .unwrap_or(OTHER_CATEGORY)
    }

    pub fn classification_confidence(&self) -> Option<f32> {
        self.classification.as_ref().map(|c| c.confidence)
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.risk.as_ref().map(|r| r.level)
    }

    pub fn risk_score(&self) -> Option<f32> {
        self.risk.as_ref().map(RiskAssessment::score)
    }

    pub fn risk_reason(&self) -> Option<String> {
        self.risk.as_ref().map(RiskAssessment::reason)
    }

    /// Keyword-derived heading key such as `payment` or `other`.
    pub fn heading_hint(&self) -> &'static str {
        normalize_heading(&self.heading)
    }

    /// Text submitted to the embedding backend: the body, or the heading
    /// when the body has no letters or digits (`---`, `[reserved]` markers).
    pub fn embedding_text(&self) -> &str {
        if !self.text.chars().any(char::is_alphanumeric) {
            &self.heading
        } else {
            &self.text
        }
    }

    pub fn with_classification(self, classification: Classification) -> Self {
        Self {
            classification: Some(classification),
            ..self
        }
    }

    pub fn with_template_match(self, template: TemplateMatch) -> Self {
        Self {
            template: Some(template),
            ..self
        }
    }

    pub fn with_risk(self, risk: RiskAssessment) -> Self {
        Self {
            risk: Some(risk),
            ..self
        }
    }
}

/// A mandatory category that never appeared with enough confidence.
///
/// Absence is high severity by policy; it is never scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingClauseFinding {
    pub clause_type: String,
    pub severity: RiskLevel,
    pub risk_type: String,
    pub reason: String,
}

impl MissingClauseFinding {
    pub fn new(clause_type: &str) -> Self {
        Self {
            clause_type: clause_type.to_string(),
            severity: RiskLevel::High,
            risk_type: MISSING_CLAUSE_RISK_TYPE.to_string(),
            reason: format!("Mandatory {clause_type} clause not found in contract"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clause_ids_are_zero_padded() {
        assert_eq!(clause_id(1), "CL_001");
        assert_eq!(clause_id(42), "CL_042");
        assert_eq!(clause_id(1234), "CL_1234");
    }

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(!RiskLevel::Low.needs_attention());
        assert!(RiskLevel::Medium.needs_attention());
        assert!(RiskLevel::High.needs_attention());
    }

    #[test]
    fn risk_score_is_fixed_mapping() {
        assert_eq!(RiskLevel::Low.score(), 0.2);
        assert_eq!(RiskLevel::Medium.score(), 0.5);
        assert_eq!(RiskLevel::High.score(), 0.8);
    }

    #[test]
    fn parse_level_ignores_case() {
        assert_eq!(RiskLevel::parse("high"), Some(RiskLevel::High));
        assert_eq!(RiskLevel::parse(" Medium "), Some(RiskLevel::Medium));
        assert_eq!(RiskLevel::parse("LOW"), Some(RiskLevel::Low));
        assert_eq!(RiskLevel::parse("Critical"), None);
    }

    #[test]
    fn combine_takes_the_higher_level() {
        for s in RiskLevel::ALL {
            for m in RiskLevel::ALL {
                let r = RiskAssessment::combine(s, String::new(), m, String::new());
                assert_eq!(r.level, s.max(m));
                assert_eq!(r.score(), r.level.score());
            }
        }
    }

    #[test]
    fn reason_skips_empty_parts() {
        let r = RiskAssessment::combine(
            RiskLevel::Low,
            "No obvious risk".into(),
            RiskLevel::Medium,
            "".into(),
        );
        assert_eq!(r.reason(), "No obvious risk");

        let r = RiskAssessment::combine(
            RiskLevel::High,
            "Contains risky phrase: 'no cap'".into(),
            RiskLevel::Medium,
            "Broad carve-outs".into(),
        );
        assert_eq!(r.reason(), "Contains risky phrase: 'no cap'; Broad carve-outs");
    }

    #[test]
    fn fallback_reason_is_not_a_model_explanation() {
        let r = RiskAssessment::combine(
            RiskLevel::High,
            "Contains risky phrase: 'no cap'".into(),
            RiskLevel::Low,
            "LLM did not return valid JSON".into(),
        );
        assert_eq!(r.model_explanation(), Some("LLM did not return valid JSON"));

        let r = r.with_model_fallback(true);
        assert!(r.model_explanation().is_none());
        assert_eq!(r.level, RiskLevel::High);
        assert_eq!(
            r.reason(),
            "Contains risky phrase: 'no cap'; LLM did not return valid JSON"
        );
    }

    #[test]
    fn fallback_flag_defaults_off_when_absent() {
        let json = r#"{"level":"Low","static_level":"Low","model_level":"Low",
            "static_reason":"No obvious risk","model_reason":""}"#;
        let r: RiskAssessment = serde_json::from_str(json).unwrap();
        assert!(!r.model_fallback);
    }

    #[test]
    fn unclassified_clause_reports_other() {
        let clause = Clause::new(1, "1. PAYMENT", "Net 30.", 0);
        assert_eq!(clause.category(), OTHER_CATEGORY);
        assert_eq!(clause.risk_level(), None);
        assert_eq!(clause.heading_hint(), "payment");
    }

    #[test]
    fn stage_results_accumulate() {
        let clause = Clause::new(3, "3. CONFIDENTIALITY", "Keep it secret.", 7)
            .with_classification(Classification {
                category: "Confidentiality".into(),
                confidence: 0.71,
            })
            .with_template_match(TemplateMatch {
                label: "Confidentiality".into(),
                similarity: 0.9,
                deviation: false,
            });
        assert_eq!(clause.clause_id, "CL_003");
        assert_eq!(clause.category(), "Confidentiality");
        assert_eq!(clause.classification_confidence(), Some(0.71));
        assert!(clause.template.is_some());
    }

    #[test]
    fn empty_body_embeds_heading() {
        let clause = Clause::new(1, "(a)", "", 0);
        assert_eq!(clause.embedding_text(), "(a)");
        let clause = Clause::new(1, "(a)", "Body.", 0);
        assert_eq!(clause.embedding_text(), "Body.");
    }

    #[test]
    fn punctuation_only_body_embeds_heading() {
        for body in ["---", "* * *", " ... "] {
            let clause = Clause::new(2, "2. RESERVED", body, 2);
            assert_eq!(clause.embedding_text(), "2. RESERVED", "body {body:?}");
        }
        let clause = Clause::new(2, "2. RESERVED", "(1)", 2);
        assert_eq!(clause.embedding_text(), "(1)");
    }

    #[test]
    fn missing_finding_is_always_high() {
        let f = MissingClauseFinding::new("Indemnity");
        assert_eq!(f.severity, RiskLevel::High);
        assert_eq!(f.risk_type, "Missing Clause");
        assert_eq!(f.reason, "Mandatory Indemnity clause not found in contract");
    }
}
