//! Line/heading heuristic that splits raw contract text into clauses.
//!
//! A heading line is one that starts with:
//!
//! - a decimal-dotted numeral: `4`, `3.2`, `10.1.4`
//! - a single lowercase letter in parentheses: `(a)`
//! - an all-caps run of at least six characters: `GOVERNING LAW`
//!
//! Body lines are space-joined onto the most recent heading. Text before the
//! first heading is discarded, so a document without headings has no clauses.

use std::sync::LazyLock;

use regex::Regex;

use crate::clause::Clause;

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(\.\d+)*|\([a-z]\)|[A-Z][A-Z\s]{5,})").expect("valid heading regex")
});

/// Keyword groups for [`normalize_heading`], matched in this order.
const HEADING_KEYWORDS: &[(&str, &[&str])] = &[
    ("liability", &["liability", "limitation", "damages"]),
    ("termination", &["termination", "terminate", "expiry"]),
    ("confidentiality", &["confidential", "nda"]),
    ("governing_law", &["law", "jurisdiction", "governing"]),
    ("payment", &["payment", "fees", "compensation"]),
];

/// Collapse tabs to spaces and trim the document.
pub fn preprocess_text(text: &str) -> String {
    text.replace('\t', " ").trim().to_string()
}

/// Whether a trimmed line opens a new clause.
pub fn is_heading(line: &str) -> bool {
    HEADING.is_match(line)
}

/// Split contract text into ordered clauses.
///
/// Ids are assigned by output position (`CL_001`, `CL_002`, ...), never from
/// the document's own numbering, so they are contiguous and unique.
pub fn extract_clauses(text: &str) -> Vec<Clause> {
    let normalized = preprocess_text(text);
    let mut clauses: Vec<Clause> = Vec::new();
    let mut current: Option<Clause> = None;

    for (idx, raw) in normalized.split('\n').enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if is_heading(line) {
            if let Some(done) = current.take() {
                clauses.push(done);
            }
            current = Some(Clause::new(clauses.len() + 1, line, "", idx));
        } else if let Some(open) = current.as_mut() {
            if !open.text.is_empty() {
                open.text.push(' ');
            }
            open.text.push_str(line);
        }
    }

    if let Some(done) = current {
        clauses.push(done);
    }

    tracing::debug!(count = clauses.len(), "segmented contract");
    clauses
}

/// Map a heading to a canonical key by keyword, or `"other"`.
///
/// Diagnostic only: classification never reads this.
pub fn normalize_heading(heading: &str) -> &'static str {
    let lower = heading.to_lowercase();
    HEADING_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(canonical, _)| *canonical)
        .unwrap_or("other")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSA: &str = "
MASTER SERVICES AGREEMENT

1. PAYMENT TERMS
Payment shall be made within thirty (30) days from the invoice date.
Late payments shall accrue interest at the rate of 1.5% per month.

2. SCOPE OF SERVICES
The Service Provider shall deliver data analytics services.

(a) Reports are delivered monthly.

4. TERMINATION
Either party may terminate with 60 days notice.
";

    #[test]
    fn heading_patterns() {
        assert!(is_heading("4. TERMINATION"));
        assert!(is_heading("3.2 Late fees"));
        assert!(is_heading("(a) Reports"));
        assert!(is_heading("GOVERNING LAW"));
        assert!(is_heading("MASTER SERVICES AGREEMENT"));
        assert!(!is_heading("Either party may terminate."));
        assert!(!is_heading("(ab) not a heading"));
        assert!(!is_heading("NOTE"));
        assert!(!is_heading("(A) uppercase letter"));
    }

    #[test]
    fn splits_on_headings() {
        let clauses = extract_clauses(MSA);
        let headings: Vec<&str> = clauses.iter().map(|c| c.heading.as_str()).collect();
        assert_eq!(
            headings,
            vec![
                "MASTER SERVICES AGREEMENT",
                "1. PAYMENT TERMS",
                "2. SCOPE OF SERVICES",
                "(a) Reports are delivered monthly.",
                "4. TERMINATION",
            ]
        );
        assert_eq!(clauses[0].text, "");
        assert_eq!(
            clauses[1].text,
            "Payment shall be made within thirty (30) days from the invoice date. \
             Late payments shall accrue interest at the rate of 1.5% per month."
        );
    }

    #[test]
    fn ids_are_contiguous_and_increasing() {
        let clauses = extract_clauses(MSA);
        for (i, c) in clauses.iter().enumerate() {
            assert_eq!(c.clause_id, format!("CL_{:03}", i + 1));
        }
        let mut ids: Vec<&str> = clauses.iter().map(|c| c.clause_id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids.len(), clauses.len());
    }

    #[test]
    fn start_line_points_at_heading() {
        let clauses = extract_clauses(MSA);
        let preprocessed = preprocess_text(MSA);
        let lines: Vec<&str> = preprocessed.split('\n').collect();
        for c in &clauses {
            assert_eq!(lines[c.start_line].trim(), c.heading);
        }
    }

    #[test]
    fn preamble_before_first_heading_is_dropped() {
        let text = "This agreement is made today.\nBetween the parties.\n4. TERMINATION\nEither party may terminate with 60 days notice.";
        let clauses = extract_clauses(text);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].heading, "4. TERMINATION");
        assert_eq!(clauses[0].text, "Either party may terminate with 60 days notice.");
    }

    #[test]
    fn no_headings_no_clauses() {
        assert!(extract_clauses("just some prose\nwith no structure at all").is_empty());
        assert!(extract_clauses("").is_empty());
        assert!(extract_clauses("   \n\t\n").is_empty());
    }

    #[test]
    fn tabs_and_crlf_are_normalized() {
        let text = "1.\tPAYMENT\r\n\tNet thirty days.\r\n";
        let clauses = extract_clauses(text);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].heading, "1. PAYMENT");
        assert_eq!(clauses[0].text, "Net thirty days.");
    }

    #[test]
    fn resegmenting_one_clause_is_stable() {
        for clause in extract_clauses(MSA) {
            let doc = format!("{}\n{}", clause.heading, clause.text);
            let again = extract_clauses(&doc);
            assert_eq!(again.len(), 1, "clause {} split on re-segmentation", clause.clause_id);
            assert_eq!(again[0].heading, clause.heading);
            assert_eq!(again[0].text, clause.text);
        }
    }

    #[test]
    fn heading_hints() {
        assert_eq!(normalize_heading("5. LIMITATION OF LIABILITY"), "liability");
        assert_eq!(normalize_heading("4. TERMINATION"), "termination");
        assert_eq!(normalize_heading("3. Confidentiality"), "confidentiality");
        assert_eq!(normalize_heading("7. GOVERNING LAW"), "governing_law");
        assert_eq!(normalize_heading("1. FEES"), "payment");
        assert_eq!(normalize_heading("8. FORCE MAJEURE"), "other");
    }
}
