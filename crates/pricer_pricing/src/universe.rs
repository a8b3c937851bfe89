//! Instrument universe filters applied before pricing.
//!
//! Short-dated options and strikes far from spot are removed before a model
//! sees them. Each model has its own window:
//!
//! | Preset          | Expiry      | Moneyness K/S     |
//! |-----------------|-------------|-------------------|
//! | Heston          | > 14 days   | 0.4 < K/S < 2.5   |
//! | Black-Scholes   | > 14 days   | K/S < 1.5         |

use pricer_models::instruments::{OptionQuote, QuoteSet};
use tracing::debug;

use crate::error::PipelineError;

/// Minimum time to expiry shared by both presets.
pub const MIN_EXPIRY_YEARS: f64 = 14.0 / 365.0;

/// Expiry and moneyness window. Every bound is exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UniverseFilter {
    /// Quotes must expire strictly later than this, in years.
    pub min_expiry_years: f64,
    /// Lower moneyness bound, if any.
    pub min_moneyness: Option<f64>,
    /// Upper moneyness bound, if any.
    pub max_moneyness: Option<f64>,
}

impl UniverseFilter {
    /// Window used for Heston calibration and pricing.
    pub fn heston() -> Self {
        Self {
            min_expiry_years: MIN_EXPIRY_YEARS,
            min_moneyness: Some(0.4),
            max_moneyness: Some(2.5),
        }
    }

    /// Window used for Black-Scholes pricing.
    pub fn black_scholes() -> Self {
        Self {
            min_expiry_years: MIN_EXPIRY_YEARS,
            min_moneyness: None,
            max_moneyness: Some(1.5),
        }
    }

    /// Check the bounds are finite and ordered.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.min_expiry_years.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "min_expiry_years must be finite, got {}",
                self.min_expiry_years
            )));
        }
        if let (Some(lo), Some(hi)) = (self.min_moneyness, self.max_moneyness) {
            if !(lo < hi) {
                return Err(PipelineError::InvalidConfig(format!(
                    "moneyness window ({}, {}) is empty",
                    lo, hi
                )));
            }
        }
        Ok(())
    }

    /// Why `quote` falls outside the window, if it does.
    ///
    /// A quote failing [`OptionQuote::validate`] has no meaningful moneyness
    /// and is kept, so the pricing pass records it as `InvalidInput`.
    pub fn rejection(&self, quote: &OptionQuote) -> Option<Rejection> {
        if !(quote.time_to_expiry > self.min_expiry_years) {
            return Some(Rejection::Expiry);
        }
        if quote.validate().is_err() {
            return None;
        }
        let m = quote.moneyness();
        let above_min = self.min_moneyness.map_or(true, |lo| m > lo);
        let below_max = self.max_moneyness.map_or(true, |hi| m < hi);
        if above_min && below_max {
            None
        } else {
            Some(Rejection::Moneyness)
        }
    }

    /// Quotes inside the window, order preserved, with rejection counts.
    pub fn apply(&self, quotes: &QuoteSet) -> (QuoteSet, FilterReport) {
        let mut report = FilterReport {
            input: quotes.len(),
            ..Default::default()
        };
        let kept = quotes.filtered(|q| self.rejection(q).is_none());
        for quote in quotes.iter() {
            match self.rejection(quote) {
                Some(Rejection::Expiry) => report.expiry_rejected += 1,
                Some(Rejection::Moneyness) => report.moneyness_rejected += 1,
                None => {}
            }
        }
        report.kept = kept.len();
        debug!(
            input = report.input,
            kept = report.kept,
            expiry = report.expiry_rejected,
            moneyness = report.moneyness_rejected,
            "universe filter applied"
        );
        (kept, report)
    }
}

/// Reason a quote was filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Expiry at or below the minimum (also NaN expiries).
    Expiry,
    /// Strike/spot outside the window.
    Moneyness,
}

/// Counts from [`UniverseFilter::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FilterReport {
    /// Quotes received.
    pub input: usize,
    /// Quotes kept.
    pub kept: usize,
    /// Removed for short expiry.
    pub expiry_rejected: usize,
    /// Removed for moneyness.
    pub moneyness_rejected: usize,
}
