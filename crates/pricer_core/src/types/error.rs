//! Error types for structured error handling.
//!
//! This module provides:
//! - `PricingError`: Per-quote failures raised by pricers
//! - `SolverError`: Errors from the least-squares solver
//! - `CalibrationError`: Errors from model calibration

use std::fmt;
use thiserror::Error;

/// Categorised pricing errors.
///
/// Every variant is recoverable at the call site: a batch pass records the
/// failure against the quote and moves on.
///
/// # Variants
/// - `InvalidInput`: Non-positive spot/strike/expiry/volatility, unknown option kind
/// - `IntegrationFailure`: Quadrature did not reach tolerance within its budget
/// - `NumericDegeneracy`: NaN or infinity produced by model arithmetic
///
/// # Examples
/// ```
/// use pricer_core::types::PricingError;
///
/// let err = PricingError::InvalidInput("strike must be positive".to_string());
/// assert_eq!(format!("{}", err), "Invalid input: strike must be positive");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PricingError {
    /// Invalid input data or parameters
    InvalidInput(String),

    /// Numerical integration exhausted its subdivision budget
    IntegrationFailure {
        /// Number of subintervals in use when the budget ran out
        subintervals: usize,
        /// Error estimate at that point
        estimated_error: f64,
    },

    /// Non-finite value produced during evaluation
    NumericDegeneracy(String),
}

impl PricingError {
    /// Short, stable label for the failure category (used in reports).
    pub fn category(&self) -> &'static str {
        match self {
            PricingError::InvalidInput(_) => "InvalidInput",
            PricingError::IntegrationFailure { .. } => "IntegrationFailure",
            PricingError::NumericDegeneracy(_) => "NumericDegeneracy",
        }
    }

    /// Returns true for `InvalidInput`.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, PricingError::InvalidInput(_))
    }
}

impl fmt::Display for PricingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            PricingError::IntegrationFailure {
                subintervals,
                estimated_error,
            } => write!(
                f,
                "Integration failure: no convergence after {} subintervals (error estimate {:e})",
                subintervals, estimated_error
            ),
            PricingError::NumericDegeneracy(msg) => write!(f, "Numeric degeneracy: {}", msg),
        }
    }
}

impl std::error::Error for PricingError {}

/// Solver errors.
///
/// # Examples
/// ```
/// use pricer_core::types::SolverError;
///
/// let err = SolverError::BudgetExhausted { iterations: 12 };
/// assert_eq!(format!("{}", err), "Time budget exhausted after 12 iterations");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// Wall-clock budget ran out before the iteration finished.
    #[error("Time budget exhausted after {iterations} iterations")]
    BudgetExhausted {
        /// Iterations completed when the budget ran out
        iterations: usize,
    },

    /// Parameter bound with lower > upper.
    #[error("Invalid bounds for parameter {index}: [{min}, {max}]")]
    InvalidBounds {
        /// Parameter index
        index: usize,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// Number of bounds does not match the number of parameters.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Numerical instability during iteration.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

/// Categories of calibration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationErrorKind {
    /// Bound with lower > upper, or a non-finite bound.
    InvalidBounds {
        /// Parameter name
        name: String,
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },
    /// Configuration value outside its admissible range.
    InvalidConfig(String),
    /// Optimiser did not converge.
    NotConverged,
    /// Too few usable quotes.
    InsufficientData {
        /// Usable quotes
        got: usize,
        /// Required quotes
        need: usize,
    },
}

/// Calibration error with optional diagnostic context.
///
/// Only the configuration kinds (`InvalidBounds`, `InvalidConfig`) are fatal
/// to a calibration run. `NotConverged` and `InsufficientData` are carried as
/// the reason when a calibrator falls back to default parameters.
///
/// # Examples
/// ```
/// use pricer_core::types::{CalibrationError, CalibrationErrorKind};
///
/// let err = CalibrationError::invalid_bounds("kappa", 5.0, 1.0);
/// assert!(err.is_config_error());
///
/// let err = CalibrationError::not_converged(100, 0.01);
/// assert!(!err.is_config_error());
/// assert_eq!(err.iterations, Some(100));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationError {
    /// Error category
    pub kind: CalibrationErrorKind,
    /// Objective value when the error was raised
    pub objective: Option<f64>,
    /// Iterations performed
    pub iterations: Option<usize>,
    /// Free-form detail
    pub message: String,
}

impl CalibrationError {
    /// Create an error of the given kind.
    pub fn new(kind: CalibrationErrorKind) -> Self {
        Self {
            kind,
            objective: None,
            iterations: None,
            message: String::new(),
        }
    }

    /// Bound with lower > upper.
    pub fn invalid_bounds(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self::new(CalibrationErrorKind::InvalidBounds {
            name: name.into(),
            lower,
            upper,
        })
    }

    /// Invalid configuration value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(CalibrationErrorKind::InvalidConfig(message.into()))
    }

    /// Optimiser stopped without meeting its convergence criteria.
    pub fn not_converged(iterations: usize, objective: f64) -> Self {
        Self {
            objective: Some(objective),
            iterations: Some(iterations),
            ..Self::new(CalibrationErrorKind::NotConverged)
        }
    }

    /// Too few usable quotes.
    pub fn insufficient_data(got: usize, need: usize) -> Self {
        Self::new(CalibrationErrorKind::InsufficientData { got, need })
    }

    /// Attach a detail message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// True for errors that abort a calibration run.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self.kind,
            CalibrationErrorKind::InvalidBounds { .. } | CalibrationErrorKind::InvalidConfig(_)
        )
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CalibrationErrorKind::InvalidBounds { name, lower, upper } => write!(
                f,
                "Invalid bounds for {}: lower {} exceeds upper {}",
                name, lower, upper
            )?,
            CalibrationErrorKind::InvalidConfig(msg) => {
                return write!(f, "Invalid calibration config: {}", msg)
            }
            CalibrationErrorKind::NotConverged => {
                write!(f, "Calibration did not converge")?;
                if let Some(iterations) = self.iterations {
                    write!(f, " after {} iterations", iterations)?;
                }
                if let Some(objective) = self.objective {
                    write!(f, " (objective {:e})", objective)?;
                }
            }
            CalibrationErrorKind::InsufficientData { got, need } => write!(
                f,
                "Insufficient data: {} usable quotes, need at least {}",
                got, need
            )?,
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for CalibrationError {}

impl From<SolverError> for CalibrationError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::BudgetExhausted { iterations } => {
                CalibrationError::not_converged(iterations, f64::NAN)
                    .with_message("time budget exhausted")
            }
            SolverError::InvalidBounds { index, min, max } => {
                CalibrationError::invalid_bounds(format!("parameter {}", index), min, max)
            }
            SolverError::DimensionMismatch { expected, actual } => CalibrationError::invalid_config(
                format!("expected {} parameters, got {}", expected, actual),
            ),
            SolverError::NumericalInstability(msg) => {
                CalibrationError::new(CalibrationErrorKind::NotConverged).with_message(msg)
            }
        }
    }
}
