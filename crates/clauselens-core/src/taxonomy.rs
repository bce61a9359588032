//! Canonical clause categories, static risk phrases, and the mandatory list.
//!
//! A [`Taxonomy`] is immutable configuration handed to each pipeline stage at
//! construction, so stages can be tested against substitute tables.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::clause::OTHER_CATEGORY;
use crate::config::ConfigError;

/// Default canonical labels, in tie-break order.
pub const DEFAULT_LABELS: &[&str] = &[
    "Liability",
    "Termination",
    "Confidentiality",
    "Governing Law",
    "Payment",
    "Indemnity",
    "Intellectual Property",
];

/// Categories whose absence is reported as a finding, in report order.
pub const DEFAULT_MANDATORY: &[&str] = &[
    "Liability",
    "Termination",
    "Confidentiality",
    "Payment",
    "Indemnity",
    "Governing Law",
];

/// Phrases that make a clause of the given category statically high risk.
pub const DEFAULT_RISK_PHRASES: &[(&str, &[&str])] = &[
    ("Liability", &["unlimited liability", "no cap", "indemnify all"]),
    ("Termination", &["immediate termination", "no notice", "one-sided"]),
    ("Confidentiality", &["disclose freely", "no obligation", "vague"]),
    ("Payment", &["late payment unlimited", "no penalty", "deferred"]),
    ("Indemnity", &["indemnify completely", "unlimited obligation"]),
    ("Governing Law", &["jurisdiction unclear", "arbitration waived"]),
    (
        "Intellectual Property",
        &["IP ownership unclear", "work product assigned without consent"],
    ),
];

/// Typical wording per label. A label is embedded through its description so
/// that it shares vocabulary with the clauses it should attract.
pub const DEFAULT_LABEL_DESCRIPTIONS: &[(&str, &str)] = &[
    (
        "Liability",
        "Limitation of liability. Neither party shall be liable for indirect, incidental, \
         special or consequential damages. Total aggregate liability shall not exceed the \
         fees paid. Liability cap.",
    ),
    (
        "Termination",
        "Termination. Either party may terminate this Agreement for convenience or for \
         material breach by providing prior written notice. Expiry of the term.",
    ),
    (
        "Confidentiality",
        "Confidentiality. Each party shall keep confidential all confidential, proprietary \
         and non-public information received from the other party and shall not disclose \
         it. Non-disclosure obligations.",
    ),
    (
        "Governing Law",
        "Governing law and jurisdiction. This Agreement shall be governed by and construed \
         in accordance with the laws of the State. Courts, venue and conflict of laws.",
    ),
    (
        "Payment",
        "Payment terms. Fees and invoices. Payment shall be made within days from the \
         invoice date. Late payments accrue interest. Amounts paid by wire transfer.",
    ),
    (
        "Indemnity",
        "Indemnification. A party shall indemnify, defend and hold harmless the other party \
         against third-party claims, losses and damages arising from negligence or willful \
         misconduct.",
    ),
    (
        "Intellectual Property",
        "Intellectual property. Ownership of work product, copyrights, patents, trademarks \
         and other intellectual property rights. License and assignment of rights.",
    ),
];

/// Category tables shared by the classifier, risk scorer and missing-clause detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
    /// Ordered canonical labels. Earlier labels win similarity ties.
    pub labels: Vec<String>,
    /// category → risk-indicating phrases. Categories without an entry are never
    /// statically high risk.
    pub risk_phrases: BTreeMap<String, Vec<String>>,
    /// Categories a compliant contract must contain.
    pub mandatory: Vec<String>,
    /// label → prototype text embedded in place of the bare label.
    pub descriptions: BTreeMap<String, String>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            risk_phrases: DEFAULT_RISK_PHRASES
                .iter()
                .map(|(cat, phrases)| {
                    (
                        cat.to_string(),
                        phrases.iter().map(|p| p.to_string()).collect(),
                    )
                })
                .collect(),
            mandatory: DEFAULT_MANDATORY.iter().map(|s| s.to_string()).collect(),
            descriptions: DEFAULT_LABEL_DESCRIPTIONS
                .iter()
                .map(|(label, text)| (label.to_string(), text.to_string()))
                .collect(),
        }
    }
}

impl Taxonomy {
    /// Risk phrases configured for `category`; empty when it has no entry.
    pub fn phrases_for(&self, category: &str) -> &[String] {
        self.risk_phrases
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Text the classifier embeds for `label`: its description, or the label
    /// itself when none is configured.
    pub fn prototype<'a>(&'a self, label: &'a str) -> &'a str {
        self.descriptions
            .get(label)
            .map(String::as_str)
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(label)
    }

    pub fn is_label(&self, category: &str) -> bool {
        self.labels.iter().any(|l| l == category)
    }

    /// Reject tables the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.labels.is_empty() {
            return Err(ConfigError::Invalid("taxonomy has no labels".into()));
        }
        let mut seen = HashSet::new();
        for label in &self.labels {
            if label.trim().is_empty() {
                return Err(ConfigError::Invalid("taxonomy label is blank".into()));
            }
            if label == OTHER_CATEGORY {
                return Err(ConfigError::Invalid(format!(
                    "'{OTHER_CATEGORY}' is reserved and cannot be a label"
                )));
            }
            if !seen.insert(label.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate label '{label}'")));
            }
        }
        for required in &self.mandatory {
            if !self.is_label(required) {
                return Err(ConfigError::Invalid(format!(
                    "mandatory category '{required}' is not a label"
                )));
            }
        }
        Ok(())
    }
}
