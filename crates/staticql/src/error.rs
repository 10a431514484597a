use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy shared across the index layer, planner, and relation resolver.
#[derive(Debug, Error)]
pub enum QueryEngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("[{source}] schema error at {path}: {message}")]
    Schema {
        source: String,
        path: String,
        message: String,
    },

    #[error("slug mismatch: path {path} implies slug {expected:?}, record declares {actual:?}")]
    SlugMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("[{source}] missing index for field {field}")]
    MissingIndex { source: String, field: String },

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("inconsistent index at {path}: {message}")]
    InconsistentIndex { path: PathBuf, message: String },

    #[error("[{source}] needs index: {filters}")]
    NeedsIndex { source: String, filters: String },

    #[error("orderby need index: {field}")]
    OrderByNeedsIndex { field: String },

    #[error("unknown relation {relation} on source {source}")]
    UnknownRelation { source: String, relation: String },
}

impl From<serde_json::Error> for QueryEngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("json: {err}"))
    }
}

impl From<serde_yaml::Error> for QueryEngineError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(format!("yaml: {err}"))
    }
}

impl QueryEngineError {
    /// Annotates an I/O-shaped error with the path that failed, without
    /// growing the enum with one variant per call site.
    pub fn context<T: fmt::Display>(self, ctx: T) -> Self {
        match self {
            QueryEngineError::Io(err) => {
                QueryEngineError::Config(format!("{ctx}: {err}"))
            }
            QueryEngineError::Config(msg) => QueryEngineError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryEngineError>;

/// A non-fatal failure encountered while resolving a relation: the target
/// slug could not be loaded, so it was dropped from the joined result
/// rather than failing the whole query ("partial materialization").
#[derive(Debug, Clone)]
pub struct LoadWarning {
    pub source: String,
    pub slug: String,
    pub message: String,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] dropped {} while resolving join: {}",
            self.source, self.slug, self.message
        )
    }
}
