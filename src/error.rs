use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = EtlError> = std::result::Result<T, E>;

/// Failures that end a stage. Per-sheet and per-row conditions are reported
/// through the stage reports instead.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("source workbook {path:?} is unreadable: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("required input {path:?} is missing")]
    DependencyMissing { path: PathBuf },

    #[error("{table} has no column {column}")]
    MissingColumn { table: String, column: String },

    #[error("cannot open warehouse {path:?}: {reason}")]
    ConnectionFailure { path: PathBuf, reason: String },

    #[error("load into {table} rolled back: {source}")]
    ConstraintViolation {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("load failed for tables: {}", tables.join(", "))]
    LoadFailed { tables: Vec<String> },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("load order violation: {0}")]
    LoadOrder(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl EtlError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        EtlError::Io {
            context: context.into(),
            source,
        }
    }
}
