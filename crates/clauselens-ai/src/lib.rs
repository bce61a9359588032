pub mod classifier;
pub mod compare;
#[cfg(feature = "onnx")]
pub mod embedder;
pub mod embedding;
pub mod llm;
pub mod missing;
pub mod pipeline;
pub mod risk;
pub mod summary;

pub use classifier::ClauseClassifier;
pub use compare::TemplateComparator;
#[cfg(feature = "onnx")]
pub use embedder::Embedder;
pub use embedding::{LexicalEmbedder, TextEmbedder, cosine_sim};
pub use llm::{DisabledGenerator, GenerateError, Generator, OllamaClient};
pub use missing::detect_missing_clauses;
pub use pipeline::{AnalysisReport, Analyzer};
pub use risk::{ModelAssessment, RiskScorer, parse_model_response};
pub use summary::{ContractSummary, summarize};
