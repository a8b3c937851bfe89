//! Pipeline errors.

use thiserror::Error;

/// Configuration problems in pipeline stages. Per-quote problems are never
/// errors here; they are counted in the stage reports.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A threshold or factor outside its admissible range.
    #[error("Invalid pipeline config: {0}")]
    InvalidConfig(String),
}
