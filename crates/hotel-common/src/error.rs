//! Error types for hotel imports

use thiserror::Error;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Main error type for the import pipeline
///
/// Row-level problems (missing fields, bad numbers, unknown references) are
/// never represented here: they are recorded in the skip ledger and the run
/// continues. Everything in this enum aborts the current run.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv_async::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Input file not found: {0}")]
    SourceNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Batch {batch} failed ({rows} rows): {message}")]
    Batch {
        batch: u64,
        rows: usize,
        message: String,
    },

    #[error("Reference mapping incomplete: {0}")]
    Mapping(String),

    #[error("Batch writer stopped unexpectedly: {0}")]
    Writer(String),
}

impl ImportError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a mapping error
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping(message.into())
    }
}
