//! Adaptive numerical integration.
//!
//! [`GaussKronrod`] implements a globally adaptive 7-point Gauss / 15-point
//! Kronrod scheme: the interval with the largest error estimate is bisected
//! until the summed estimate satisfies
//!
//! ```text
//! error <= max(abs_tolerance, rel_tolerance * |integral|)
//! ```
//!
//! or the subinterval budget runs out. Budget exhaustion and non-finite
//! integrand values are reported as errors rather than returned as a value,
//! so callers can tell an unconverged integral from a converged one.

mod gauss_kronrod;

pub use gauss_kronrod::{GaussKronrod, QuadratureConfig, QuadratureError, QuadratureResult};
