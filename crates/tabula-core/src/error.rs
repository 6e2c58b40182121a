use thiserror::Error;

use crate::value::Kind;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("value '{value}' is not a level of factor column '{column}'")]
    UnknownLevel { column: String, value: String },

    #[error("shape mismatch ({context}): expected {expected} rows, found {found}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("tables share no column names to merge on")]
    NoCommonKeys,

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("invalid reducer: {0}")]
    InvalidReducer(String),

    #[error("column '{column}' holds {expected} values, got a {found} value")]
    KindMismatch {
        column: String,
        expected: Kind,
        found: Kind,
    },

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("duplicate factor level '{0}'")]
    DuplicateLevel(String),

    #[error("relabel needs {expected} labels, got {found}")]
    LevelCountMismatch { expected: usize, found: usize },

    #[error("row {row} out of bounds for {len} rows")]
    RowOutOfBounds { row: usize, len: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}
