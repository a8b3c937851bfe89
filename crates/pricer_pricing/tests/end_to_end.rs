//! Full pipeline scenarios: filter, calibrate, price, post-process, compare.

use approx::assert_relative_eq;
use pricer_core::types::OptionKind;
use pricer_models::analytical::{BlackScholesConfig, BlackScholesPricer, HestonPricer};
use pricer_models::calibration::{HestonBounds, HestonCalibrator, HestonCalibratorConfig};
use pricer_models::instruments::{OptionQuote, QuoteSet};
use pricer_models::models::HestonParameters;
use pricer_pricing::{
    price_black_scholes, price_heston, BatchConfig, ModelComparison, PostProcessor,
    UniverseFilter,
};

const RATE: f64 = 0.02;

/// Quotes priced by a known Heston model, plus rows the filters must remove.
fn market() -> QuoteSet {
    let truth = HestonParameters::new(3.0, 0.07, 0.35, -0.55, 0.06).unwrap();
    let pricer = HestonPricer::default();
    let mut quotes: Vec<OptionQuote> = [0.4, 1.0]
        .iter()
        .flat_map(|&t| [80.0, 95.0, 100.0, 110.0, 125.0].map(move |k| (t, k)))
        .map(|(t, strike)| {
            let kind = if strike < 100.0 {
                OptionKind::Put
            } else {
                OptionKind::Call
            };
            let q = OptionQuote::new(
                format!("X-{}-{}-{}", t, strike, kind),
                100.0,
                strike,
                t,
                kind,
                RATE,
                0.35,
            );
            let market = pricer.price(100.0, strike, t, RATE, &truth, kind).unwrap();
            q.with_market_price(market)
        })
        .collect();

    // Expires in a week
    quotes.push(
        OptionQuote::new("SHORT", 100.0, 100.0, 7.0 / 365.0, OptionKind::Call, RATE, 0.35)
            .with_market_price(2.0),
    );
    // Strike at three times spot
    quotes.push(
        OptionQuote::new("FAR", 100.0, 300.0, 0.5, OptionKind::Call, RATE, 0.35)
            .with_market_price(0.01),
    );
    QuoteSet::new(quotes)
}

// ============================================================================
// Batch Failure Accounting
// ============================================================================

#[test]
fn test_black_scholes_pass_isolates_bad_strikes() {
    let mut quotes: QuoteSet = [100.0, -5.0, 90.0, 0.0, 110.0]
        .iter()
        .enumerate()
        .map(|(i, &k)| OptionQuote::new(format!("Q{}", i), 100.0, k, 0.5, OptionKind::Put, 0.05, 0.2))
        .collect();
    let report = price_black_scholes(
        &mut quotes,
        &BlackScholesPricer::new(BlackScholesConfig::default()),
        &BatchConfig::default(),
    );

    assert_eq!(report.priced, 3);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.failures_by_category().get("InvalidInput"), Some(&2));
    assert_relative_eq!(quotes.quotes()[0].bs_price.unwrap(), 4.4197, epsilon = 1e-3);
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_pipeline_prefers_heston_on_heston_generated_market() {
    let raw = market();

    let (mut universe, filter_report) = UniverseFilter::heston().apply(&raw);
    assert_eq!(filter_report.expiry_rejected, 1);
    assert_eq!(filter_report.moneyness_rejected, 1);
    assert_eq!(universe.len(), 10);

    let calibrator = HestonCalibrator::new(HestonCalibratorConfig::default());
    let calibration = calibrator
        .calibrate(
            &universe,
            RATE,
            &HestonBounds::default(),
            &HestonParameters::CALIBRATION_GUESS,
        )
        .unwrap();
    assert!(calibration.converged(), "{:?}", calibration.path);

    let batch = BatchConfig::default();
    let heston = price_heston(&mut universe, calibrator.pricer(), &calibration, RATE, &batch);
    assert!(heston.is_clean());
    assert_eq!(heston.priced, 10);

    let bs = price_black_scholes(
        &mut universe,
        &BlackScholesPricer::new(BlackScholesConfig::default()),
        &batch,
    );
    assert_eq!(bs.priced, 10);

    let (processed, post) = PostProcessor::default().adjust(universe);
    assert_eq!(post.dampened, 0);
    assert_eq!(post.outliers_dropped, 0);
    assert_eq!(post.missing_price_dropped, 0);

    let comparison = ModelComparison::from_quotes(&processed);
    assert_eq!(comparison.rows.len(), processed.len());
    assert_eq!(comparison.better_model(), Some("heston"));
    let heston_errors = comparison.heston.unwrap();
    assert!(heston_errors.max < 0.1, "max Heston error {}", heston_errors.max);
}

#[test]
fn test_pipeline_on_empty_universe_falls_back() {
    let raw = QuoteSet::new(vec![OptionQuote::new(
        "SHORT",
        100.0,
        100.0,
        1.0 / 365.0,
        OptionKind::Call,
        RATE,
        0.5,
    )
    .with_market_price(1.0)]);

    let (mut universe, _) = UniverseFilter::heston().apply(&raw);
    assert!(universe.is_empty());

    let calibration = HestonCalibrator::default()
        .calibrate(
            &universe,
            RATE,
            &HestonBounds::default(),
            &HestonParameters::CALIBRATION_GUESS,
        )
        .unwrap();
    assert!(!calibration.converged());

    let report = price_heston(
        &mut universe,
        &HestonPricer::default(),
        &calibration,
        RATE,
        &BatchConfig::default(),
    );
    assert_eq!(report.attempted, 0);

    let comparison = ModelComparison::from_quotes(&universe);
    assert!(comparison.black_scholes.is_none());
    assert_eq!(comparison.better_model(), None);
}

#[test]
fn test_invalid_strike_surfaces_as_pricing_failure() {
    let raw = QuoteSet::new(vec![OptionQuote::new(
        "NEG",
        100.0,
        -5.0,
        0.5,
        OptionKind::Call,
        RATE,
        0.3,
    )
    .with_market_price(3.0)]);

    let (mut universe, filter_report) = UniverseFilter::heston().apply(&raw);
    assert_eq!(filter_report.kept, 1);
    assert_eq!(filter_report.moneyness_rejected, 0);

    let calibration = HestonCalibrator::default()
        .calibrate(
            &universe,
            RATE,
            &HestonBounds::default(),
            &HestonParameters::CALIBRATION_GUESS,
        )
        .unwrap();
    assert!(!calibration.converged());

    let report = price_heston(
        &mut universe,
        &HestonPricer::default(),
        &calibration,
        RATE,
        &BatchConfig::default(),
    );
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures_by_category().get("InvalidInput"), Some(&1));
}
