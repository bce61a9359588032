//! Template deviation detection.
//!
//! The template corpus is embedded and indexed once per run. Each clause is
//! matched against its single nearest template; similarity strictly below
//! the deviation threshold marks the clause as deviating.

use anyhow::Context;
use clauselens_core::{Clause, TemplateMatch};
use clauselens_store::{StoreError, TemplateSource, VectorIndex, normalize};
use tracing::{debug, info};

use crate::embedding::TextEmbedder;

/// Read-only nearest-template index for one analysis run.
pub struct TemplateComparator {
    index: VectorIndex,
    deviation_threshold: f32,
}

impl TemplateComparator {
    /// Load, embed and index every template from `source`.
    ///
    /// An empty corpus is a configuration error: there is nothing meaningful
    /// to compare against.
    pub fn build(
        embedder: &mut dyn TextEmbedder,
        source: &dyn TemplateSource,
        deviation_threshold: f32,
    ) -> anyhow::Result<Self> {
        let templates = source.list_templates().context("loading template corpus")?;
        if templates.is_empty() {
            return Err(StoreError::EmptyCorpus("no templates to compare against".into()).into());
        }

        let texts: Vec<&str> = templates.iter().map(|t| t.text.as_str()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .context("embedding templates")?;
        anyhow::ensure!(
            embeddings.len() == templates.len(),
            "embedding backend returned {} vectors for {} templates",
            embeddings.len(),
            templates.len()
        );

        let mut index = VectorIndex::new(embedder.dim());
        for (template, embedding) in templates.iter().zip(embeddings) {
            index
                .add(template.label.as_str(), embedding)
                .with_context(|| format!("indexing template '{}'", template.label))?;
        }

        info!(templates = index.len(), dim = index.dim(), "built template index");
        Ok(Self {
            index,
            deviation_threshold,
        })
    }

    /// Nearest template for one clause embedding.
    pub fn match_embedding(
        &self,
        clause_id: &str,
        embedding: Vec<f32>,
    ) -> Result<TemplateMatch, StoreError> {
        let query = normalize(embedding, clause_id)?;
        let hit = self.index.nearest(&query)?;
        Ok(TemplateMatch {
            deviation: hit.similarity < self.deviation_threshold,
            label: hit.label,
            similarity: hit.similarity,
        })
    }

    /// Attach the nearest-template match to every clause, preserving order.
    pub fn compare_with_templates(
        &self,
        embedder: &mut dyn TextEmbedder,
        clauses: Vec<Clause>,
    ) -> anyhow::Result<Vec<Clause>> {
        let texts: Vec<&str> = clauses.iter().map(Clause::embedding_text).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .context("embedding clauses for template comparison")?;
        anyhow::ensure!(
            embeddings.len() == clauses.len(),
            "embedding backend returned {} vectors for {} clauses",
            embeddings.len(),
            clauses.len()
        );

        let mut compared = Vec::with_capacity(clauses.len());
        let mut deviations = 0usize;
        for (clause, embedding) in clauses.into_iter().zip(embeddings) {
            let m = self
                .match_embedding(&clause.clause_id, embedding)
                .with_context(|| format!("comparing {} with templates", clause.clause_id))?;
            debug!(
                clause_id = %clause.clause_id,
                template = %m.label,
                similarity = m.similarity,
                deviation = m.deviation,
                "matched template"
            );
            if m.deviation {
                deviations += 1;
            }
            compared.push(clause.with_template_match(m));
        }

        info!(count = compared.len(), deviations, "compared clauses with templates");
        Ok(compared)
    }

    pub fn template_labels(&self) -> &[String] {
        self.index.labels()
    }
}
