//! Priced-quote and calibration output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use pricer_core::types::OptionKind;
use pricer_models::calibration::{HestonCalibrationResult, VolOfVolSource};
use pricer_models::instruments::{OptionQuote, QuoteSet};
use serde::Serialize;
use tracing::info;

use crate::error::LoaderError;

/// Output row for one priced quote. Missing prices are written as empty fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedRow<'a> {
    /// Instrument identifier.
    pub instrument_id: &'a str,
    /// Call or put.
    pub kind: OptionKind,
    /// Underlying spot.
    pub spot: f64,
    /// Strike.
    pub strike: f64,
    /// Years to expiry.
    pub time_to_expiry: f64,
    /// Implied volatility.
    pub volatility: f64,
    /// Market price in quote currency.
    pub market_price: Option<f64>,
    /// Black-Scholes price.
    pub bs_price: Option<f64>,
    /// Heston price.
    pub heston_price: Option<f64>,
}

impl<'a> From<&'a OptionQuote> for PricedRow<'a> {
    fn from(q: &'a OptionQuote) -> Self {
        Self {
            instrument_id: &q.instrument_id,
            kind: q.kind,
            spot: q.spot,
            strike: q.strike,
            time_to_expiry: q.time_to_expiry,
            volatility: q.volatility,
            market_price: q.market_price,
            bs_price: q.bs_price,
            heston_price: q.heston_price,
        }
    }
}

/// Write `quotes` as CSV, one row per quote in set order.
pub fn write_priced_csv<W: Write>(writer: W, quotes: &QuoteSet) -> Result<(), LoaderError> {
    let mut csv = csv::Writer::from_writer(writer);
    for quote in quotes.iter() {
        csv.serialize(PricedRow::from(quote))?;
    }
    csv.flush()?;
    Ok(())
}

/// A quote excluded from calibration, as written to JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedRecord {
    /// Instrument identifier.
    pub instrument_id: String,
    /// Error category.
    pub category: &'static str,
    /// Error message.
    pub message: String,
}

/// Calibration result as written to JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationRecord {
    /// `optimized` or `fallback`.
    pub path: &'static str,
    /// Fallback reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    /// Mean-reversion speed.
    pub kappa: f64,
    /// Long-run variance.
    pub theta: f64,
    /// Vol-of-vol (nominal under `quote_implied_vol`).
    pub sigma: f64,
    /// Correlation.
    pub rho: f64,
    /// Initial variance.
    pub v0: f64,
    /// Vol-of-vol source.
    pub vol_of_vol: VolOfVolSource,
    /// Objective at the returned parameters.
    pub objective: f64,
    /// Solver iterations.
    pub iterations: usize,
    /// Quotes in the objective.
    pub quotes_used: usize,
    /// Quotes without a positive market price.
    pub quotes_without_market: usize,
    /// Quotes excluded during screening.
    pub excluded: Vec<ExcludedRecord>,
}

impl From<&HestonCalibrationResult> for CalibrationRecord {
    fn from(result: &HestonCalibrationResult) -> Self {
        let p = &result.params;
        Self {
            path: result.path.label(),
            fallback_reason: result.fallback_reason().map(str::to_string),
            kappa: p.kappa(),
            theta: p.theta(),
            sigma: p.sigma(),
            rho: p.rho(),
            v0: p.v0(),
            vol_of_vol: result.vol_of_vol,
            objective: result.objective,
            iterations: result.iterations,
            quotes_used: result.quotes_used,
            quotes_without_market: result.quotes_without_market,
            excluded: result
                .excluded
                .iter()
                .map(|e| ExcludedRecord {
                    instrument_id: e.instrument_id.clone(),
                    category: e.error.category(),
                    message: e.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Write a calibration result as pretty-printed JSON.
pub fn write_calibration_json<W: Write>(
    writer: W,
    result: &HestonCalibrationResult,
) -> Result<(), LoaderError> {
    serde_json::to_writer_pretty(writer, &CalibrationRecord::from(result))?;
    Ok(())
}

/// Write any serialisable value as pretty-printed JSON to `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LoaderError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    info!(path = %path.display(), "JSON written");
    Ok(())
}
