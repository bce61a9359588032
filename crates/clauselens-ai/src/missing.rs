//! Mandatory clause coverage.

use std::collections::HashSet;

use clauselens_core::{Clause, MissingClauseFinding, OTHER_CATEGORY, Taxonomy};
use tracing::info;

/// Categories observed with at least `presence_threshold` confidence.
pub fn present_categories(clauses: &[Clause], presence_threshold: f32) -> HashSet<&str> {
    clauses
        .iter()
        .filter_map(|c| c.classification.as_ref())
        .filter(|c| c.category != OTHER_CATEGORY && c.confidence >= presence_threshold)
        .map(|c| c.category.as_str())
        .collect()
}

/// One High finding per mandatory category that was never confidently observed,
/// in the taxonomy's declared order.
pub fn detect_missing_clauses(
    clauses: &[Clause],
    taxonomy: &Taxonomy,
    presence_threshold: f32,
) -> Vec<MissingClauseFinding> {
    let present = present_categories(clauses, presence_threshold);
    let missing: Vec<MissingClauseFinding> = taxonomy
        .mandatory
        .iter()
        .filter(|required| !present.contains(required.as_str()))
        .map(|required| MissingClauseFinding::new(required))
        .collect();

    info!(
        present = present.len(),
        missing = missing.len(),
        "checked mandatory clauses"
    );
    missing
}
