//! Model-versus-market error comparison.
//!
//! Only quotes carrying a finite market price and both model prices take
//! part, so the two summaries describe the same sample.

use pricer_models::instruments::QuoteSet;

/// Describe-style summary of a sample.
///
/// `std` uses the `n - 1` denominator and is NaN for a single observation.
/// Quartiles interpolate linearly between order statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ErrorSummary {
    /// Sample size.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation.
    pub std: f64,
    /// Minimum.
    pub min: f64,
    /// First quartile.
    pub q25: f64,
    /// Median.
    pub median: f64,
    /// Third quartile.
    pub q75: f64,
    /// Maximum.
    pub max: f64,
}

impl ErrorSummary {
    /// Summarise `values`; `None` when empty. Sums run in slice order.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
            (ss / (n - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            count: n,
            mean,
            std,
            min: sorted[0],
            q25: linear_quantile(&sorted, 0.25),
            median: linear_quantile(&sorted, 0.5),
            q75: linear_quantile(&sorted, 0.75),
            max: sorted[n - 1],
        })
    }
}

/// Quantile of sorted data with linear interpolation between ranks.
fn linear_quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Absolute errors for one quote.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ComparisonRow {
    /// Instrument identifier.
    pub instrument_id: String,
    /// Market price.
    pub market_price: f64,
    /// |Black-Scholes - market|.
    pub bs_error: f64,
    /// |Heston - market|.
    pub heston_error: f64,
}

/// Side-by-side error statistics for both models.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ModelComparison {
    /// Per-quote errors, in quote order.
    pub rows: Vec<ComparisonRow>,
    /// Quotes left out for lack of a price.
    pub incomplete: usize,
    /// Black-Scholes error summary.
    pub black_scholes: Option<ErrorSummary>,
    /// Heston error summary.
    pub heston: Option<ErrorSummary>,
}

impl ModelComparison {
    /// Compare both models against market over `quotes`.
    pub fn from_quotes(quotes: &QuoteSet) -> Self {
        let rows: Vec<ComparisonRow> = quotes
            .iter()
            .filter_map(|q| {
                let market = q.market_price.filter(|m| m.is_finite())?;
                let bs = q.bs_price.filter(|p| p.is_finite())?;
                let heston = q.heston_price.filter(|p| p.is_finite())?;
                Some(ComparisonRow {
                    instrument_id: q.instrument_id.clone(),
                    market_price: market,
                    bs_error: (bs - market).abs(),
                    heston_error: (heston - market).abs(),
                })
            })
            .collect();

        let bs: Vec<f64> = rows.iter().map(|r| r.bs_error).collect();
        let heston: Vec<f64> = rows.iter().map(|r| r.heston_error).collect();

        Self {
            incomplete: quotes.len() - rows.len(),
            black_scholes: ErrorSummary::from_values(&bs),
            heston: ErrorSummary::from_values(&heston),
            rows,
        }
    }

    /// Model with the lower mean absolute error, if both are measurable.
    pub fn better_model(&self) -> Option<&'static str> {
        let bs = self.black_scholes?;
        let heston = self.heston?;
        Some(if heston.mean < bs.mean {
            "heston"
        } else {
            "black_scholes"
        })
    }
}
