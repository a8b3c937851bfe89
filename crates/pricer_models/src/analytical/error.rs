//! Error types for analytical pricing operations.

use pricer_core::types::PricingError;
use thiserror::Error;

/// Analytical pricing errors.
///
/// Every variant is an input problem and converts into
/// `PricingError::InvalidInput`.
///
/// # Examples
/// ```
/// use pricer_models::analytical::AnalyticalError;
///
/// let err = AnalyticalError::InvalidVolatility { volatility: -0.2 };
/// assert!(format!("{}", err).contains("volatility"));
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalyticalError {
    /// Non-positive or non-finite spot.
    #[error("Invalid spot price: S = {spot}")]
    InvalidSpot {
        /// The invalid spot price value
        spot: f64,
    },

    /// Non-positive or non-finite strike.
    #[error("Invalid strike: K = {strike}")]
    InvalidStrike {
        /// The invalid strike value
        strike: f64,
    },

    /// Non-positive or non-finite time to expiry.
    #[error("Invalid time to expiry: T = {expiry}")]
    InvalidExpiry {
        /// The invalid expiry value
        expiry: f64,
    },

    /// Non-positive or non-finite volatility.
    #[error("Invalid volatility: σ = {volatility}")]
    InvalidVolatility {
        /// The invalid volatility value
        volatility: f64,
    },

    /// Non-finite rate.
    #[error("Invalid rate: r = {rate}")]
    InvalidRate {
        /// The invalid rate value
        rate: f64,
    },

    /// σ√T evaluated to zero.
    #[error("Degenerate total volatility: σ√T = 0 (σ = {volatility}, T = {expiry})")]
    DegenerateVariance {
        /// Volatility
        volatility: f64,
        /// Time to expiry
        expiry: f64,
    },
}

impl From<AnalyticalError> for PricingError {
    fn from(err: AnalyticalError) -> Self {
        PricingError::InvalidInput(err.to_string())
    }
}
