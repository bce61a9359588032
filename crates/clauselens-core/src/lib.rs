pub mod clause;
pub mod config;
pub mod segment;
pub mod taxonomy;

pub use clause::{
    Classification, Clause, MissingClauseFinding, OTHER_CATEGORY, RiskAssessment, RiskLevel,
    TemplateMatch,
};
pub use config::{AnalysisConfig, ConfigError};
pub use segment::{extract_clauses, normalize_heading};
pub use taxonomy::Taxonomy;
