//! Heston calibration result types.

use pricer_core::types::PricingError;

use super::heston::VolOfVolSource;
use crate::instruments::OptionQuote;
use crate::models::HestonParameters;

/// How the parameters in a [`HestonCalibrationResult`] were obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationPath {
    /// Levenberg-Marquardt converged inside the bounds.
    Optimized,
    /// The optimiser could not be trusted; fixed defaults were returned.
    Fallback {
        /// Why the optimised point was discarded.
        reason: String,
    },
}

impl CalibrationPath {
    /// Short label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            CalibrationPath::Optimized => "optimized",
            CalibrationPath::Fallback { .. } => "fallback",
        }
    }
}

/// A quote left out of the objective because it could not be priced at the
/// initial guess.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedQuote {
    /// Instrument identifier.
    pub instrument_id: String,
    /// Pricing failure observed during screening.
    pub error: PricingError,
}

/// Outcome of a Heston calibration run.
///
/// `objective` is the sum of squared relative residuals at `params`,
/// accumulated in quote order.
#[derive(Debug, Clone, PartialEq)]
pub struct HestonCalibrationResult {
    /// Calibrated (or fallback) parameters. Under
    /// [`VolOfVolSource::QuoteImpliedVol`] the σ stored here is nominal; use
    /// [`HestonCalibrationResult::params_for`] to price a specific quote.
    pub params: HestonParameters,
    /// Optimised or fallback.
    pub path: CalibrationPath,
    /// Objective at `params`.
    pub objective: f64,
    /// Solver iterations.
    pub iterations: usize,
    /// Quotes contributing to the objective.
    pub quotes_used: usize,
    /// Quotes skipped because they carry no positive market price.
    pub quotes_without_market: usize,
    /// Quotes dropped during screening.
    pub excluded: Vec<ExcludedQuote>,
    /// Source of the vol-of-vol used during the fit.
    pub vol_of_vol: VolOfVolSource,
}

impl HestonCalibrationResult {
    /// True when the optimiser converged.
    pub fn converged(&self) -> bool {
        self.path == CalibrationPath::Optimized
    }

    /// Fallback reason, if any.
    pub fn fallback_reason(&self) -> Option<&str> {
        match &self.path {
            CalibrationPath::Optimized => None,
            CalibrationPath::Fallback { reason } => Some(reason),
        }
    }

    /// Parameters used to price `quote` under this calibration.
    pub fn params_for(&self, quote: &OptionQuote) -> Result<HestonParameters, PricingError> {
        self.vol_of_vol.params_for(&self.params, quote)
    }
}
