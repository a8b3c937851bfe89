//! Loader error types.

use thiserror::Error;

/// Errors raised while reading or writing quote files.
///
/// [`LoaderError::InvalidRecord`] is row-scoped: the loader turns it into a
/// rejected row instead of failing the load.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is absent from the header.
    #[error("Missing column '{0}'")]
    MissingColumn(String),

    /// A row cannot be turned into a quote.
    #[error("Invalid record at line {line}: {message}")]
    InvalidRecord {
        /// One-based line number in the source file.
        line: u64,
        /// What is wrong with the row.
        message: String,
    },
}

impl LoaderError {
    /// Create a row-scoped error.
    pub fn invalid_record(line: u64, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            line,
            message: message.into(),
        }
    }
}
