//! Heston model calibration.
//!
//! - [`HestonCalibrator`]: bounded Levenberg-Marquardt fit of (κ, θ, ρ, v0)
//! - [`HestonCalibratorConfig`]: bounds, initial guess, fallback and solver settings
//! - [`HestonCalibrationResult`]: parameters plus the [`CalibrationPath`] taken
//!
//! # Flow
//!
//! ```text
//! QuoteSet ──► screen at initial guess ──► LM over relative residuals
//!                   │                              │
//!                   ▼                              ▼
//!             ExcludedQuote              Optimized | Fallback { reason }
//! ```

pub mod heston;
mod result;

pub use heston::{
    FallbackParameters, HestonBounds, HestonCalibrationData, HestonCalibrator,
    HestonCalibratorConfig, HestonParamIndex, VolOfVolSource,
};
pub use result::{CalibrationPath, ExcludedQuote, HestonCalibrationResult};
