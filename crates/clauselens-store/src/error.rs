use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("template directory not found: {0}")]
    TemplateDirNotFound(std::path::PathBuf),

    #[error("template corpus is empty: {0}")]
    EmptyCorpus(String),

    #[error("io error reading {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("cannot normalize zero-length embedding for {0}")]
    ZeroVector(String),

    #[error("embedding dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index is empty")]
    EmptyIndex,
}
