//! Core value and error types.
//!
//! This module provides:
//! - `option_kind`: European exercise side (`Call` / `Put`)
//! - `error`: Structured error types for pricing, solver and calibration operations
//!
//! # Re-exports
//!
//! - [`OptionKind`] from `option_kind`
//! - [`PricingError`], [`SolverError`], [`CalibrationError`], [`CalibrationErrorKind`] from `error`

pub mod error;
pub mod option_kind;

pub use error::{CalibrationError, CalibrationErrorKind, PricingError, SolverError};
pub use option_kind::OptionKind;
