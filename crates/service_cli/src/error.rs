//! CLI error types.

use adapter_loader::LoaderError;
use pricer_core::types::CalibrationError;
use pricer_pricing::PipelineError;
use thiserror::Error;

/// CLI result alias.
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors surfaced to the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// Input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Argument outside its valid range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be read or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Quote loading or output failure.
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    /// Calibration could not run.
    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for CliError {
    fn from(e: ::config::ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Config(e.to_string())
    }
}
