//! Raw CSV rows and their conversion into quotes.

use chrono::{DateTime, Utc};
use pricer_core::types::OptionKind;
use pricer_models::instruments::OptionQuote;
use serde::Deserialize;

use crate::config::{LoaderConfig, PriceUnit};
use crate::error::LoaderError;

const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0;
const MILLIS_PER_YEAR: f64 = SECONDS_PER_YEAR * 1000.0;

/// One CSV row as read from disk.
///
/// Column names follow the workspace vocabulary; the exchange export names
/// (`instrument_name`, `spot_price`, `strike_price`, `option_type`,
/// `implied_volatility`, `real_market_price`) are accepted as aliases. The
/// export's `expiration_date` holds Unix seconds and has its own field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuoteRecord {
    /// Instrument identifier.
    #[serde(alias = "instrument_name")]
    pub instrument_id: String,
    /// Underlying spot.
    #[serde(alias = "spot_price")]
    pub spot: f64,
    /// Strike.
    #[serde(alias = "strike_price")]
    pub strike: f64,
    /// `call` / `put`, parsed after reading so a bad value rejects one row.
    #[serde(alias = "option_type")]
    pub kind: String,
    /// Implied volatility as a decimal.
    #[serde(default, alias = "implied_volatility")]
    pub volatility: Option<f64>,
    /// Observed premium, in the unit given by [`LoaderConfig::market_price_unit`].
    #[serde(default, alias = "real_market_price")]
    pub market_price: Option<f64>,
    /// Time to expiry in years.
    #[serde(default)]
    pub time_to_expiry: Option<f64>,
    /// Expiry as Unix milliseconds.
    #[serde(default)]
    pub expiration_timestamp: Option<i64>,
    /// Expiry as Unix seconds.
    #[serde(default)]
    pub expiration_date: Option<i64>,
    /// Risk-free rate.
    #[serde(default)]
    pub rate: Option<f64>,
}

impl QuoteRecord {
    /// Implied volatility if present and finite.
    pub fn finite_volatility(&self) -> Option<f64> {
        self.volatility.filter(|v| v.is_finite())
    }

    /// Build a quote. `fill_volatility` replaces a missing implied volatility
    /// when set; `line` is used in error messages.
    pub fn into_quote(
        self,
        line: u64,
        config: &LoaderConfig,
        valuation: DateTime<Utc>,
        fill_volatility: Option<f64>,
    ) -> Result<OptionQuote, LoaderError> {
        let kind: OptionKind = self
            .kind
            .parse()
            .map_err(|e| LoaderError::invalid_record(line, format!("{}", e)))?;

        let volatility = self
            .finite_volatility()
            .or(fill_volatility)
            .ok_or_else(|| LoaderError::invalid_record(line, "missing implied volatility"))?;

        let time_to_expiry = match (
            self.time_to_expiry,
            self.expiration_timestamp,
            self.expiration_date,
        ) {
            (Some(t), _, _) => t,
            (None, Some(ms), _) => years_until(ms, valuation).ok_or_else(|| {
                LoaderError::invalid_record(line, format!("expiration timestamp {} out of range", ms))
            })?,
            (None, None, Some(secs)) => years_until_secs(secs, valuation).ok_or_else(|| {
                LoaderError::invalid_record(line, format!("expiration date {} out of range", secs))
            })?,
            (None, None, None) => {
                return Err(LoaderError::invalid_record(
                    line,
                    "none of time_to_expiry, expiration_timestamp or expiration_date given",
                ))
            }
        };

        let market_price = self.market_price.map(|p| match config.market_price_unit {
            PriceUnit::Quote => p,
            PriceUnit::Underlying => p * self.spot,
        });

        let mut quote = OptionQuote::new(
            self.instrument_id,
            self.spot,
            self.strike,
            time_to_expiry,
            kind,
            self.rate.unwrap_or(config.default_rate),
            volatility,
        );
        quote.market_price = market_price;
        Ok(quote)
    }
}

/// Years from `valuation` to the Unix-millisecond `expiry_ms`, 365-day year.
pub(crate) fn years_until(expiry_ms: i64, valuation: DateTime<Utc>) -> Option<f64> {
    let expiry = DateTime::<Utc>::from_timestamp_millis(expiry_ms)?;
    Some((expiry - valuation).num_milliseconds() as f64 / MILLIS_PER_YEAR)
}

/// Years from `valuation` to the Unix-second `expiry_secs`, 365-day year.
pub(crate) fn years_until_secs(expiry_secs: i64, valuation: DateTime<Utc>) -> Option<f64> {
    let expiry = DateTime::<Utc>::from_timestamp(expiry_secs, 0)?;
    Some((expiry - valuation).num_milliseconds() as f64 / MILLIS_PER_YEAR)
}

/// Median of `values`; the two middle values are averaged for even counts.
pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}
