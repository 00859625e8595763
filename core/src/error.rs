use std::path::PathBuf;
use thiserror::Error;

/// Startup failure while reading or indexing the recipe corpus.
#[derive(Debug, Error)]
pub enum CorpusLoadError {
    #[error("corpus is empty")]
    Empty,
    #[error("no recipe has usable ingredient text ({dropped} records dropped)")]
    NoUsableRecipes { dropped: usize },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported corpus file: {0} (expected .csv, .json or .jsonl)")]
    UnsupportedFormat(PathBuf),
}

/// Rejected recommendation input. Caller's fault, nothing was touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidQueryError {
    #[error("ingredient list is empty")]
    EmptyIngredients,
    #[error("user id is empty")]
    EmptyUserId,
}

#[derive(Debug, Error)]
pub enum FeedbackStoreError {
    #[error("feedback store unavailable: {0}")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
