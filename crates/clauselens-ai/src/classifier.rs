//! Nearest-label classification of clauses.
//!
//! Each canonical label is embedded once at construction, through its
//! taxonomy prototype text (see [`Taxonomy::prototype`]). A clause is assigned
//! the label with the highest cosine similarity to its own embedding; when that
//! best similarity is below the low-confidence threshold the clause becomes
//! "Other", but the recorded confidence is still the true best similarity.

use anyhow::Context;
use clauselens_core::{Classification, Clause, OTHER_CATEGORY, Taxonomy};
use tracing::{debug, info};

use crate::embedding::{TextEmbedder, cosine_sim};

/// Label embeddings plus the low-confidence floor.
pub struct ClauseClassifier {
    labels: Vec<String>,
    label_embeddings: Vec<Vec<f32>>,
    low_confidence_threshold: f32,
}

impl ClauseClassifier {
    /// Embed every taxonomy label's prototype with `embedder`.
    pub fn build(
        embedder: &mut dyn TextEmbedder,
        taxonomy: &Taxonomy,
        low_confidence_threshold: f32,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!taxonomy.labels.is_empty(), "classifier needs at least one label");

        let texts: Vec<&str> = taxonomy
            .labels
            .iter()
            .map(|label| taxonomy.prototype(label))
            .collect();
        let label_embeddings = embedder
            .embed_batch(&texts)
            .context("embedding category labels")?;
        anyhow::ensure!(
            label_embeddings.len() == texts.len(),
            "embedding backend returned {} vectors for {} labels",
            label_embeddings.len(),
            texts.len()
        );

        info!(labels = texts.len(), "built clause classifier");
        Ok(Self {
            labels: taxonomy.labels.clone(),
            label_embeddings,
            low_confidence_threshold,
        })
    }

    /// Classify one piece of clause text.
    pub fn classify(
        &self,
        embedder: &mut dyn TextEmbedder,
        text: &str,
    ) -> anyhow::Result<Classification> {
        let embedding = embedder.embed(text).context("embedding clause text")?;
        Ok(self.classify_embedding(&embedding))
    }

    /// Classify a pre-computed clause embedding.
    pub fn classify_embedding(&self, embedding: &[f32]) -> Classification {
        let (best_idx, best_sim) = best_match(&self.label_embeddings, embedding);

        let category = match best_idx {
            Some(idx) if best_sim >= self.low_confidence_threshold => self.labels[idx].clone(),
            _ => OTHER_CATEGORY.to_string(),
        };

        Classification {
            category,
            confidence: best_sim.clamp(0.0, 1.0),
        }
    }

    /// Classify every clause, preserving order.
    pub fn classify_clauses(
        &self,
        embedder: &mut dyn TextEmbedder,
        clauses: Vec<Clause>,
    ) -> anyhow::Result<Vec<Clause>> {
        let texts: Vec<&str> = clauses.iter().map(Clause::embedding_text).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .context("embedding clauses for classification")?;
        anyhow::ensure!(
            embeddings.len() == clauses.len(),
            "embedding backend returned {} vectors for {} clauses",
            embeddings.len(),
            clauses.len()
        );

        let classified: Vec<Clause> = clauses
            .into_iter()
            .zip(embeddings)
            .map(|(clause, emb)| {
                let classification = self.classify_embedding(&emb);
                debug!(
                    clause_id = %clause.clause_id,
                    category = %classification.category,
                    confidence = classification.confidence,
                    "classified clause"
                );
                clause.with_classification(classification)
            })
            .collect();

        info!(count = classified.len(), "classified clauses");
        Ok(classified)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Argmax cosine similarity. Ties go to the earliest label.
fn best_match(candidates: &[Vec<f32>], embedding: &[f32]) -> (Option<usize>, f32) {
    let mut best_idx = None;
    let mut best_sim = f32::NEG_INFINITY;

    for (i, candidate) in candidates.iter().enumerate() {
        let sim = cosine_sim(embedding, candidate);
        if sim > best_sim {
            best_sim = sim;
            best_idx = Some(i);
        }
    }

    if best_idx.is_none() {
        best_sim = 0.0;
    }
    (best_idx, best_sim)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Embeds known strings to fixed 4-dim vectors; anything else maps to zero.
    pub(crate) struct TableEmbedder {
        pub table: HashMap<String, Vec<f32>>,
    }

    impl TableEmbedder {
        pub fn new(rows: &[(&str, [f32; 4])]) -> Self {
            Self {
                table: rows
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_vec()))
                    .collect(),
            }
        }
    }

    impl TextEmbedder for TableEmbedder {
        fn dim(&self) -> usize {
            4
        }

        fn embed_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| self.table.get(*t).cloned().unwrap_or_else(|| vec![0.0; 4]))
                .collect())
        }
    }

    fn taxonomy(labels: &[&str]) -> Taxonomy {
        Taxonomy {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            mandatory: vec![],
            descriptions: Default::default(),
            ..Taxonomy::default()
        }
    }

    fn label_embedder() -> TableEmbedder {
        TableEmbedder::new(&[
            ("Payment", [1.0, 0.0, 0.0, 0.0]),
            ("Termination", [0.0, 1.0, 0.0, 0.0]),
            ("Confidentiality", [0.0, 0.0, 1.0, 0.0]),
        ])
    }

    fn classifier(embedder: &mut TableEmbedder) -> ClauseClassifier {
        ClauseClassifier::build(
            embedder,
            &taxonomy(&["Payment", "Termination", "Confidentiality"]),
            0.40,
        )
        .unwrap()
    }

    #[test]
    fn picks_nearest_label() {
        let mut e = label_embedder();
        let clf = classifier(&mut e);
        let c = clf.classify_embedding(&[0.1, 0.95, 0.0, 0.0]);
        assert_eq!(c.category, "Termination");
        assert!(c.confidence > 0.9);
    }

    #[test]
    fn low_confidence_becomes_other_but_keeps_similarity() {
        let mut e = label_embedder();
        let clf = classifier(&mut e);
        // Mostly along the unused 4th axis: best similarity ≈ 0.3.
        let c = clf.classify_embedding(&[0.3, 0.0, 0.0, 0.954]);
        assert_eq!(c.category, OTHER_CATEGORY);
        assert!(c.confidence > 0.25 && c.confidence < 0.40, "got {}", c.confidence);
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut e = label_embedder();
        let clf = ClauseClassifier::build(&mut e, &taxonomy(&["Payment"]), 1.0).unwrap();
        let c = clf.classify_embedding(&[2.0, 0.0, 0.0, 0.0]);
        assert_eq!(c.category, "Payment");
    }

    #[test]
    fn ties_go_to_first_label() {
        let mut e = label_embedder();
        let clf = classifier(&mut e);
        let diag = 1.0 / 2.0f32.sqrt();
        let c = clf.classify_embedding(&[diag, diag, 0.0, 0.0]);
        assert_eq!(c.category, "Payment");
    }

    #[test]
    fn confidence_never_negative() {
        let mut e = label_embedder();
        let clf = classifier(&mut e);
        let c = clf.classify_embedding(&[-1.0, -1.0, -1.0, 0.0]);
        assert_eq!(c.category, OTHER_CATEGORY);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn zero_embedding_is_other_with_zero_confidence() {
        let mut e = label_embedder();
        let clf = classifier(&mut e);
        let c = clf.classify_embedding(&[0.0; 4]);
        assert_eq!(c.category, OTHER_CATEGORY);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn classify_clauses_sets_category_in_order() {
        let mut e = label_embedder();
        e.table.insert(
            "Either party may terminate with 60 days notice.".into(),
            vec![0.05, 0.9, 0.1, 0.0],
        );
        e.table
            .insert("Invoices are due in 30 days.".into(), vec![0.9, 0.0, 0.1, 0.0]);
        let clf = classifier(&mut e);

        let clauses = vec![
            Clause::new(1, "4. TERMINATION", "Either party may terminate with 60 days notice.", 0),
            Clause::new(2, "5. PAYMENT", "Invoices are due in 30 days.", 2),
            Clause::new(3, "6. MISCELLANEOUS", "Nothing relevant here.", 4),
        ];
        let out = clf.classify_clauses(&mut e, clauses).unwrap();

        assert_eq!(out[0].heading, "4. TERMINATION");
        assert_eq!(out[0].category(), "Termination");
        assert_eq!(out[1].category(), "Payment");
        assert_eq!(out[2].category(), OTHER_CATEGORY);
        for c in &out {
            let conf = c.classification_confidence().unwrap();
            assert!((0.0..=1.0).contains(&conf));
        }
    }

    #[test]
    fn other_iff_below_threshold() {
        let mut e = label_embedder();
        let clf = classifier(&mut e);
        let points = [
            [1.0, 0.0, 0.0, 0.0],
            [0.5, 0.5, 0.5, 0.5],
            [0.2, 0.1, 0.0, 0.97],
            [0.39, 0.0, 0.0, 0.92],
            [0.0, 0.0, 0.0, 1.0],
        ];
        for p in points {
            let c = clf.classify_embedding(&p);
            let raw = [
                cosine_sim(&p, &[1.0, 0.0, 0.0, 0.0]),
                cosine_sim(&p, &[0.0, 1.0, 0.0, 0.0]),
                cosine_sim(&p, &[0.0, 0.0, 1.0, 0.0]),
            ]
            .into_iter()
            .fold(f32::NEG_INFINITY, f32::max);
            assert_eq!(c.category == OTHER_CATEGORY, raw < 0.40, "point {p:?}");
        }
    }

    #[test]
    fn labels_are_embedded_through_their_descriptions() {
        let mut tax = taxonomy(&["Payment", "Termination"]);
        tax.descriptions
            .insert("Termination".into(), "notice to end the agreement".into());
        let mut e = label_embedder();
        e.table
            .insert("notice to end the agreement".into(), vec![0.0, 0.0, 0.0, 1.0]);
        let clf = ClauseClassifier::build(&mut e, &tax, 0.40).unwrap();

        assert_eq!(clf.classify_embedding(&[0.0, 0.0, 0.0, 1.0]).category, "Termination");
        assert_eq!(clf.labels(), ["Payment", "Termination"]);
    }

    #[test]
    fn lexical_backend_classifies_with_default_taxonomy() {
        let mut e = crate::LexicalEmbedder::default();
        let clf = ClauseClassifier::build(&mut e, &Taxonomy::default(), 0.40).unwrap();

        let c = clf
            .classify(&mut e, "Either party may terminate with 60 days notice.")
            .unwrap();
        assert_eq!(c.category, "Termination", "confidence {}", c.confidence);

        let c = clf
            .classify(
                &mut e,
                "Invoices are payable within thirty days; late payments accrue interest.",
            )
            .unwrap();
        assert_eq!(c.category, "Payment", "confidence {}", c.confidence);
    }

    #[test]
    fn build_rejects_empty_taxonomy() {
        let mut e = label_embedder();
        assert!(ClauseClassifier::build(&mut e, &taxonomy(&[]), 0.4).is_err());
    }
}
