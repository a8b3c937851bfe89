//! Stages shared by `price`, `calibrate` and `compare`.

use std::collections::HashMap;
use std::path::Path;

use adapter_loader::{CsvQuoteSource, QuoteSource};
use pricer_models::analytical::{BlackScholesPricer, HestonPricer};
use pricer_models::calibration::{HestonCalibrationResult, HestonCalibrator};
use pricer_models::instruments::QuoteSet;
use pricer_pricing::{price_black_scholes, price_heston, PostProcessor};
use tracing::{debug, info, warn};

use crate::{AppConfig, CliError, ModelChoice, Result};

/// Quotes with every requested model price attached.
pub struct PricedQuotes {
    /// All loaded quotes; a price is absent where the quote fell outside the
    /// model's universe or failed to price.
    pub quotes: QuoteSet,
    /// Heston calibration, when Heston was requested.
    pub calibration: Option<HestonCalibrationResult>,
}

/// Load quotes from `input`, logging rejected rows.
pub fn load(config: &AppConfig, input: &Path) -> Result<QuoteSet> {
    if !input.exists() {
        return Err(CliError::FileNotFound(input.display().to_string()));
    }
    let loaded = CsvQuoteSource::new(input, config.loader.clone()).load()?;
    for rejection in &loaded.report.rejected {
        debug!(line = rejection.line, reason = %rejection.reason, "row rejected");
    }
    info!(
        "Loaded {} of {} rows ({} rejected, {} volatilities filled)",
        loaded.report.loaded,
        loaded.report.rows,
        loaded.report.rejected.len(),
        loaded.report.volatility_filled
    );
    Ok(loaded.quotes)
}

/// Calibrate Heston on the Heston universe of `quotes`.
pub fn calibrate(config: &AppConfig, quotes: &QuoteSet, r_fixed: f64) -> Result<HestonCalibrationResult> {
    let (universe, filtered) = config.universe.heston.apply(quotes);
    info!(
        "Heston universe: {} of {} quotes",
        filtered.kept, filtered.input
    );
    let calibrator = HestonCalibrator::new(config.calibration.clone());
    let result = calibrator.calibrate(
        &universe,
        r_fixed,
        &config.calibration.bounds,
        &config.calibration.initial_guess,
    )?;
    if let Some(reason) = result.fallback_reason() {
        warn!("Calibration fell back to default parameters: {}", reason);
    }
    Ok(result)
}

/// Run the requested models over `quotes`.
pub fn price(config: &AppConfig, quotes: &QuoteSet, model: ModelChoice) -> Result<PricedQuotes> {
    let mut out = quotes.clone();
    let batch = &config.pricing.batch;

    if model.black_scholes() {
        let (mut universe, filtered) = config.universe.black_scholes.apply(quotes);
        let pricer = BlackScholesPricer::new(config.pricing.black_scholes);
        let report = price_black_scholes(&mut universe, &pricer, batch);
        info!(
            "Black-Scholes: {} in universe, {} priced, {} failed",
            filtered.kept,
            report.priced,
            report.failed()
        );
        let prices = by_id(&universe, |q| q.bs_price);
        for quote in out.quotes_mut() {
            quote.bs_price = prices.get(quote.instrument_id.as_str()).copied();
        }
    }

    let mut calibration = None;
    if model.heston() {
        let r_fixed = config.pricing.r_fixed;
        let result = calibrate(config, quotes, r_fixed)?;
        let (mut universe, _) = config.universe.heston.apply(quotes);
        let pricer = HestonPricer::new(config.calibration.pricer);
        let report = price_heston(&mut universe, &pricer, &result, r_fixed, batch);
        info!(
            "Heston: {} priced, {} skipped, {} failed",
            report.priced,
            report.skipped,
            report.failed()
        );

        let (processed, post) = PostProcessor::new(config.postprocess)?.adjust(universe);
        info!(
            "Post-processing: {} dampened, {} outliers, {} without price",
            post.dampened, post.outliers_dropped, post.missing_price_dropped
        );
        let prices = by_id(&processed, |q| q.heston_price);
        for quote in out.quotes_mut() {
            quote.heston_price = prices.get(quote.instrument_id.as_str()).copied();
        }
        calibration = Some(result);
    }

    Ok(PricedQuotes {
        quotes: out,
        calibration,
    })
}

fn by_id<F>(quotes: &QuoteSet, price: F) -> HashMap<&str, f64>
where
    F: Fn(&pricer_models::instruments::OptionQuote) -> Option<f64>,
{
    quotes
        .iter()
        .filter_map(|q| price(q).map(|p| (q.instrument_id.as_str(), p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn input(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("quotes.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "instrument_id,spot,strike,kind,volatility,market_price,time_to_expiry,rate\n\
             ATM,100,100,call,0.2,10.4,1.0,0.05\n\
             DEEP,100,200,call,0.2,0.01,1.0,0.05\n\
             SHORT,100,100,put,0.2,1.0,0.01,0.05\n"
        )
        .unwrap();
        path
    }

    #[test]
    fn test_missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&AppConfig::default(), &dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }

    #[test]
    fn test_black_scholes_prices_only_its_universe() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::default();
        let quotes = load(&config, &input(&dir)).unwrap();
        let priced = price(&config, &quotes, ModelChoice::BlackScholes).unwrap();

        assert_eq!(priced.quotes.len(), 3);
        assert!(priced.calibration.is_none());
        let atm = priced.quotes.get("ATM").unwrap().bs_price.unwrap();
        assert!((atm - 10.4506).abs() < 1e-3);
        assert!(priced.quotes.get("DEEP").unwrap().bs_price.is_none());
        assert!(priced.quotes.get("SHORT").unwrap().bs_price.is_none());
        assert!(priced.quotes.iter().all(|q| q.heston_price.is_none()));
    }
}
