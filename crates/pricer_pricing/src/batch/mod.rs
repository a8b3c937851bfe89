//! Batch pricing passes.
//!
//! A pass prices every applicable quote of a [`QuoteSet`], attaches the
//! prices in place and returns a [`PassReport`]. Per-quote failures never
//! abort the pass.
//!
//! # Parallelism
//!
//! With the `parallel` feature, quotes are priced on the rayon pool once the
//! set is large enough ([`BatchConfig::should_parallelise`]). Results are
//! collected in quote order, so prices and report contents are identical to
//! the sequential path.

mod report;

pub use report::{PassReport, QuoteFailure};

use pricer_core::types::PricingError;
use pricer_models::analytical::{BlackScholesPricer, HestonPricer};
use pricer_models::calibration::HestonCalibrationResult;
use pricer_models::instruments::{OptionQuote, QuoteSet};
use tracing::{debug, info};

/// Batch execution settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BatchConfig {
    /// Minimum quotes per worker thread before pricing goes parallel.
    pub min_quotes_per_thread: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            min_quotes_per_thread: 8,
        }
    }
}

impl BatchConfig {
    /// Whether a set of `n_quotes` is priced on the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn should_parallelise(&self, n_quotes: usize) -> bool {
        n_quotes
            >= self
                .min_quotes_per_thread
                .max(1)
                .saturating_mul(rayon::current_num_threads())
    }

    /// Whether a set of `n_quotes` is priced on the rayon pool.
    #[cfg(not(feature = "parallel"))]
    pub fn should_parallelise(&self, _n_quotes: usize) -> bool {
        false
    }
}

/// Outcome of pricing one quote: `None` when the pass does not apply.
type Outcome = Option<Result<f64, PricingError>>;

fn evaluate<F>(quotes: &[OptionQuote], config: &BatchConfig, price: F) -> Vec<Outcome>
where
    F: Fn(&OptionQuote) -> Outcome + Send + Sync,
{
    if config.should_parallelise(quotes.len()) {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            return quotes.par_iter().map(&price).collect();
        }
    }
    quotes.iter().map(price).collect()
}

/// Attach outcomes in quote order and build the report.
fn attach<S>(quotes: &mut QuoteSet, outcomes: Vec<Outcome>, mut store: S) -> PassReport
where
    S: FnMut(&mut OptionQuote, Option<f64>),
{
    let mut report = PassReport::default();
    for (quote, outcome) in quotes.quotes_mut().iter_mut().zip(outcomes) {
        match outcome {
            None => report.skipped += 1,
            Some(result) => {
                if let Err(error) = &result {
                    debug!(instrument_id = %quote.instrument_id, %error, "quote not priced");
                }
                let price = report.record(&quote.instrument_id, result);
                store(quote, price);
            }
        }
    }
    report
}

/// Black-Scholes pass: every quote is priced with its own rate and implied
/// volatility and the result stored in `bs_price`.
pub fn price_black_scholes(
    quotes: &mut QuoteSet,
    pricer: &BlackScholesPricer,
    config: &BatchConfig,
) -> PassReport {
    let outcomes = evaluate(quotes.quotes(), config, |q| Some(pricer.price_quote(q)));
    let report = attach(quotes, outcomes, |q, price| q.bs_price = price);
    info!(
        attempted = report.attempted,
        priced = report.priced,
        failed = report.failed(),
        "Black-Scholes pass complete"
    );
    report
}

/// Heston pass under a calibration result.
///
/// Only quotes with a positive market price are priced; each uses the
/// calibration's per-quote parameters at `r_fixed`. The result is stored in
/// `heston_price`.
pub fn price_heston(
    quotes: &mut QuoteSet,
    pricer: &HestonPricer,
    calibration: &HestonCalibrationResult,
    r_fixed: f64,
    config: &BatchConfig,
) -> PassReport {
    let outcomes = evaluate(quotes.quotes(), config, |q| {
        q.positive_market_price()?;
        Some(heston_quote(pricer, calibration, q, r_fixed))
    });
    let report = attach(quotes, outcomes, |q, price| q.heston_price = price);
    info!(
        attempted = report.attempted,
        priced = report.priced,
        skipped = report.skipped,
        failed = report.failed(),
        "Heston pass complete"
    );
    report
}

fn heston_quote(
    pricer: &HestonPricer,
    calibration: &HestonCalibrationResult,
    quote: &OptionQuote,
    r_fixed: f64,
) -> Result<f64, PricingError> {
    quote.validate()?;
    let params = calibration.params_for(quote)?;
    pricer.price(
        quote.spot,
        quote.strike,
        quote.time_to_expiry,
        r_fixed,
        &params,
        quote.kind,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pricer_core::types::OptionKind;
    use pricer_models::analytical::BlackScholesConfig;
    use pricer_models::calibration::{CalibrationPath, VolOfVolSource};
    use pricer_models::models::HestonParameters;

    fn quote(id: &str, strike: f64) -> OptionQuote {
        OptionQuote::new(id, 100.0, strike, 0.5, OptionKind::Call, 0.05, 0.2)
    }

    fn calibration() -> HestonCalibrationResult {
        HestonCalibrationResult {
            params: HestonParameters::new(2.0, 0.04, 0.3, -0.7, 0.04).unwrap(),
            path: CalibrationPath::Optimized,
            objective: 0.0,
            iterations: 0,
            quotes_used: 0,
            quotes_without_market: 0,
            excluded: Vec::new(),
            vol_of_vol: VolOfVolSource::Fixed,
        }
    }

    // ==========================================================
    // Black-Scholes pass
    // ==========================================================

    #[test]
    fn test_bad_strikes_do_not_abort_pass() {
        let mut quotes = QuoteSet::new(vec![
            quote("A", 90.0),
            quote("B", 0.0),
            quote("C", 100.0),
            quote("D", -10.0),
            quote("E", 110.0),
        ]);
        let pricer = BlackScholesPricer::new(BlackScholesConfig::default());
        let report = price_black_scholes(&mut quotes, &pricer, &BatchConfig::default());

        assert_eq!(report.attempted, 5);
        assert_eq!(report.priced, 3);
        assert_eq!(report.failed(), 2);
        assert!(report.failures.iter().all(|f| f.error.is_invalid_input()));
        let failed: Vec<&str> = report
            .failures
            .iter()
            .map(|f| f.instrument_id.as_str())
            .collect();
        assert_eq!(failed, vec!["B", "D"]);

        assert!(quotes.get("B").unwrap().bs_price.is_none());
        assert_relative_eq!(
            quotes.get("C").unwrap().bs_price.unwrap(),
            6.8887,
            epsilon = 1e-3
        );
    }

    // ==========================================================
    // Heston pass
    // ==========================================================

    #[test]
    fn test_heston_pass_skips_quotes_without_market() {
        let mut quotes = QuoteSet::new(vec![
            quote("A", 100.0).with_market_price(7.0),
            quote("B", 100.0),
            quote("C", 100.0).with_market_price(0.0),
        ]);
        let report = price_heston(
            &mut quotes,
            &HestonPricer::default(),
            &calibration(),
            0.05,
            &BatchConfig::default(),
        );

        assert_eq!(report.attempted, 1);
        assert_eq!(report.priced, 1);
        assert_eq!(report.skipped, 2);
        assert!(quotes.get("A").unwrap().heston_price.unwrap() > 0.0);
        assert!(quotes.get("B").unwrap().heston_price.is_none());
    }

    #[test]
    fn test_heston_pass_records_invalid_quotes() {
        let mut bad = quote("A", 100.0).with_market_price(7.0);
        bad.time_to_expiry = 0.0;
        let mut quotes = QuoteSet::new(vec![bad]);
        let report = price_heston(
            &mut quotes,
            &HestonPricer::default(),
            &calibration(),
            0.05,
            &BatchConfig::default(),
        );
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures_by_category().get("InvalidInput"), Some(&1));
    }

    #[test]
    fn test_should_parallelise_small_sets_stay_sequential() {
        let config = BatchConfig {
            min_quotes_per_thread: 1000,
        };
        assert!(!config.should_parallelise(10));
    }
}
