//! Loader settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit of the `market_price` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceUnit {
    /// Quote currency, comparable to model prices as-is.
    #[default]
    Quote,
    /// Units of the underlying (inverse contracts); multiplied by spot on load.
    Underlying,
}

/// What to do with rows lacking an implied volatility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingVolatility {
    /// Reject the row.
    #[default]
    Reject,
    /// Use the median implied volatility of the rows that have one.
    FillMedian,
}

/// Loader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Unit of the market price column.
    pub market_price_unit: PriceUnit,
    /// Missing implied volatility policy.
    pub missing_volatility: MissingVolatility,
    /// Rate for rows without a `rate` column value.
    pub default_rate: f64,
    /// Reference time for `expiration_timestamp` and `expiration_date`; the
    /// load time when unset.
    pub valuation_time: Option<DateTime<Utc>>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            market_price_unit: PriceUnit::Quote,
            missing_volatility: MissingVolatility::Reject,
            default_rate: 0.045,
            valuation_time: None,
        }
    }
}

impl LoaderConfig {
    /// Check the default rate is finite.
    pub fn validate(&self) -> Result<(), String> {
        if !self.default_rate.is_finite() {
            return Err(format!(
                "default_rate must be finite, got {}",
                self.default_rate
            ));
        }
        Ok(())
    }
}
