//! Human-readable and JSON renderings of an analysis report.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use clauselens_ai::AnalysisReport;
use clauselens_core::{Clause, MissingClauseFinding, RiskLevel};
use clauselens_store::Template;
use serde::Serialize;

const MAX_HEADING: usize = 40;

// ── Text ──

/// Clause table, missing findings and both summaries.
pub fn render_report(report: &AnalysisReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Clauses ({}) ===", report.clauses.len());
    for c in &report.clauses {
        let _ = writeln!(
            out,
            "  {:<8} {:<40} {:<22} {:>5}  {:<6} {}",
            c.clause_id,
            truncate(&c.heading, MAX_HEADING),
            c.category(),
            c.classification_confidence()
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".into()),
            c.risk_level().map(RiskLevel::as_str).unwrap_or("-"),
            template_note(c),
        );
        if let Some(reason) = c.risk_reason().filter(|_| {
            c.risk_level().is_some_and(RiskLevel::needs_attention)
        }) {
            let _ = writeln!(out, "           {reason}");
        }
    }
    out.push('\n');

    let _ = writeln!(out, "=== Missing Clauses ({}) ===", report.missing.len());
    for m in &report.missing {
        let _ = writeln!(out, "  {:<22} {}  {}", m.clause_type, m.severity, m.reason);
    }
    out.push('\n');

    if let Some(summary) = &report.summary {
        let _ = writeln!(out, "=== Executive Summary ===");
        let _ = writeln!(out, "{}", summary.executive_summary);
        out.push('\n');
        let _ = writeln!(out, "=== Risk Summary ===");
        let _ = writeln!(out, "{}", summary.risk_summary);
    }
    out
}

/// Segmenter output: id, start line, heading, heading hint, body length.
pub fn render_segments(clauses: &[Clause]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} clauses", clauses.len());
    for c in clauses {
        let _ = writeln!(
            out,
            "  {:<8} line {:<5} {:<40} {:<16} {} chars",
            c.clause_id,
            c.start_line,
            truncate(&c.heading, MAX_HEADING),
            c.heading_hint(),
            c.text.chars().count(),
        );
    }
    out
}

pub fn render_templates(templates: &[Template]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} templates", templates.len());
    for t in templates {
        let _ = writeln!(out, "  {:<26} {} chars", t.label, t.text.chars().count());
    }
    out
}

fn template_note(c: &Clause) -> String {
    match &c.template {
        Some(m) if m.deviation => format!("deviates from {} ({:.2})", m.label, m.similarity),
        Some(m) => format!("~{} ({:.2})", m.label, m.similarity),
        None => String::new(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{head}...")
    }
}

// ── JSON ──

/// Flat per-clause record for machine consumers.
#[derive(Serialize)]
pub struct ClauseView<'a> {
    pub clause_id: &'a str,
    pub heading: &'a str,
    pub heading_hint: &'a str,
    pub start_line: usize,
    pub text: &'a str,
    pub category: &'a str,
    pub classification_confidence: Option<f32>,
    pub template_match: Option<&'a str>,
    pub template_similarity: Option<f32>,
    pub template_deviation: Option<bool>,
    pub risk_level: Option<RiskLevel>,
    pub risk_score: Option<f32>,
    pub risk_reason: Option<String>,
}

impl<'a> From<&'a Clause> for ClauseView<'a> {
    fn from(c: &'a Clause) -> Self {
        Self {
            clause_id: &c.clause_id,
            heading: &c.heading,
            heading_hint: c.heading_hint(),
            start_line: c.start_line,
            text: &c.text,
            category: c.category(),
            classification_confidence: c.classification_confidence(),
            template_match: c.template.as_ref().map(|m| m.label.as_str()),
            template_similarity: c.template.as_ref().map(|m| m.similarity),
            template_deviation: c.template.as_ref().map(|m| m.deviation),
            risk_level: c.risk_level(),
            risk_score: c.risk_score(),
            risk_reason: c.risk_reason(),
        }
    }
}

#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub embedder: &'a str,
    pub generator: &'a str,
    pub clauses: Vec<ClauseView<'a>>,
    pub missing_clauses: &'a [MissingClauseFinding],
    pub executive_summary: Option<&'a str>,
    pub risk_summary: Option<&'a str>,
}

impl<'a> JsonReport<'a> {
    pub fn new(report: &'a AnalysisReport, embedder: &'a str, generator: &'a str) -> Self {
        Self {
            generated_at: Utc::now(),
            embedder,
            generator,
            clauses: report.clauses.iter().map(ClauseView::from).collect(),
            missing_clauses: &report.missing,
            executive_summary: report
                .summary
                .as_ref()
                .map(|s| s.executive_summary.as_str()),
            risk_summary: report.summary.as_ref().map(|s| s.risk_summary.as_str()),
        }
    }
}
