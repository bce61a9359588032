//! End-to-end contract analysis.
//!
//! segment → classify → compare with templates → score risk → missing
//! clauses → summaries. Label embeddings and the template index are built
//! once in [`Analyzer::new`] and reused for every contract.

use std::sync::Arc;

use anyhow::Context;
use clauselens_core::{AnalysisConfig, Clause, MissingClauseFinding, Taxonomy, extract_clauses};
use clauselens_store::TemplateSource;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::ClauseClassifier;
use crate::compare::TemplateComparator;
use crate::embedding::TextEmbedder;
use crate::llm::Generator;
use crate::missing::detect_missing_clauses;
use crate::risk::RiskScorer;
use crate::summary::{ContractSummary, summarize};

/// Everything one analysis run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub clauses: Vec<Clause>,
    pub missing: Vec<MissingClauseFinding>,
    /// `None` when summaries were switched off.
    pub summary: Option<ContractSummary>,
}

pub struct Analyzer {
    config: AnalysisConfig,
    embedder: Box<dyn TextEmbedder>,
    classifier: ClauseClassifier,
    comparator: TemplateComparator,
    scorer: RiskScorer,
    generator: Arc<dyn Generator>,
    summaries: bool,
}

impl Analyzer {
    /// Validate `config`, embed the taxonomy labels and index the templates.
    pub fn new(
        config: AnalysisConfig,
        mut embedder: Box<dyn TextEmbedder>,
        templates: &dyn TemplateSource,
        generator: Arc<dyn Generator>,
    ) -> anyhow::Result<Self> {
        config.validate().context("invalid analysis configuration")?;

        let classifier = ClauseClassifier::build(
            embedder.as_mut(),
            &config.taxonomy,
            config.low_confidence_threshold,
        )?;
        let comparator =
            TemplateComparator::build(embedder.as_mut(), templates, config.deviation_threshold)?;
        let taxonomy: Arc<Taxonomy> = Arc::new(config.taxonomy.clone());
        let scorer = RiskScorer::new(taxonomy, Arc::clone(&generator))
            .with_max_concurrency(config.max_concurrency);

        Ok(Self {
            config,
            embedder,
            classifier,
            comparator,
            scorer,
            generator,
            summaries: true,
        })
    }

    /// Skip the summary stage; [`AnalysisReport::summary`] will be `None`.
    pub fn without_summaries(mut self) -> Self {
        self.summaries = false;
        self
    }

    pub fn template_labels(&self) -> &[String] {
        self.comparator.template_labels()
    }

    /// Run every stage on one contract.
    pub async fn analyze(&mut self, contract: &str) -> anyhow::Result<AnalysisReport> {
        let mut clauses = extract_clauses(contract);
        info!(clauses = clauses.len(), "segmented contract");

        if !clauses.is_empty() {
            clauses = self
                .classifier
                .classify_clauses(self.embedder.as_mut(), clauses)?;
            clauses = self
                .comparator
                .compare_with_templates(self.embedder.as_mut(), clauses)?;
            clauses = self.scorer.detect_risks(clauses).await;
        }

        let missing = detect_missing_clauses(
            &clauses,
            &self.config.taxonomy,
            self.config.presence_threshold,
        );

        let summary = if self.summaries {
            Some(
                summarize(self.generator.as_ref(), &clauses, &missing)
                    .await
                    .context("generating contract summaries")?,
            )
        } else {
            None
        };

        Ok(AnalysisReport {
            clauses,
            missing,
            summary,
        })
    }
}
