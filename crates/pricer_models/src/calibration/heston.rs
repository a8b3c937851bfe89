//! Heston model calibration.
//!
//! Fits (κ, θ, ρ, v0) to a [`QuoteSet`] by bounded Levenberg-Marquardt on the
//! relative pricing residuals
//!
//! ```text
//! r_i = (heston_i - market_i) / market_i
//! ```
//!
//! over quotes with a positive market price. The vol-of-vol is not fitted:
//! depending on [`VolOfVolSource`] each quote is priced with its own implied
//! volatility as σ, or with the σ of the initial guess.
//!
//! ## Failure handling
//!
//! - Quotes that cannot be priced at the initial guess are excluded up front
//!   and listed in the result.
//! - A pricing failure during the search scores `failure_penalty` as its
//!   residual so the optimiser steers away from the region.
//! - Non-convergence, an exhausted time budget or an empty usable set
//!   returns the configured fallback parameters, flagged as
//!   [`CalibrationPath::Fallback`].
//! - Only malformed configuration (bounds, penalties, fallback values) is
//!   returned as an error.

use std::time::Instant;

use pricer_core::math::solvers::{LMConfig, LevenbergMarquardtSolver};
use pricer_core::traits::calibration::{Calibrator, ParameterBounds};
use pricer_core::types::{CalibrationError, PricingError, SolverError};
use tracing::{debug, info, warn};

use super::result::{CalibrationPath, ExcludedQuote, HestonCalibrationResult};
use crate::analytical::{HestonPricer, HestonPricerConfig};
use crate::instruments::{OptionQuote, QuoteSet};
use crate::models::HestonParameters;

/// Positions of the fitted parameters in the solver vector.
#[derive(Debug, Clone, Copy)]
pub struct HestonParamIndex;

impl HestonParamIndex {
    /// Mean reversion speed.
    pub const KAPPA: usize = 0;
    /// Long-run variance.
    pub const THETA: usize = 1;
    /// Correlation.
    pub const RHO: usize = 2;
    /// Initial variance.
    pub const V0: usize = 3;
    /// Number of fitted parameters.
    pub const COUNT: usize = 4;
    /// Names in solver order.
    pub const NAMES: [&'static str; 4] = ["kappa", "theta", "rho", "v0"];
}

/// Search box for the fitted parameters.
///
/// The defaults reflect crypto-volatility regimes (strongly negative
/// spot/variance correlation) and are meant to be overridden.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HestonBounds {
    /// κ range.
    pub kappa: ParameterBounds,
    /// θ range.
    pub theta: ParameterBounds,
    /// ρ range.
    pub rho: ParameterBounds,
    /// v0 range.
    pub v0: ParameterBounds,
}

impl Default for HestonBounds {
    fn default() -> Self {
        Self {
            kappa: ParameterBounds::new(1.0, 5.0),
            theta: ParameterBounds::new(0.02, 0.2),
            rho: ParameterBounds::new(-0.9, -0.3),
            v0: ParameterBounds::new(0.02, 0.3),
        }
    }
}

impl HestonBounds {
    /// Bounds in solver order.
    pub fn to_vec(&self) -> Vec<ParameterBounds> {
        vec![self.kappa, self.theta, self.rho, self.v0]
    }

    /// Check ordering, finiteness and that every point in the box is a
    /// valid Heston parameter.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for (name, b) in HestonParamIndex::NAMES.iter().zip(self.to_vec()) {
            if !(b.min.is_finite() && b.max.is_finite()) {
                return Err(CalibrationError::invalid_bounds(*name, b.min, b.max)
                    .with_message("bounds must be finite"));
            }
            b.validate(name)?;
        }
        for (name, b) in [("kappa", self.kappa), ("theta", self.theta), ("v0", self.v0)] {
            if b.min <= 0.0 {
                return Err(CalibrationError::invalid_config(format!(
                    "{} lower bound must be positive, got {}",
                    name, b.min
                )));
            }
        }
        if self.rho.min < -1.0 || self.rho.max > 1.0 {
            return Err(CalibrationError::invalid_config(format!(
                "rho bounds [{}, {}] must lie within [-1, 1]",
                self.rho.min, self.rho.max
            )));
        }
        Ok(())
    }

    fn project(&self, params: &HestonParameters) -> [f64; 4] {
        [
            self.kappa.clamp(params.kappa()),
            self.theta.clamp(params.theta()),
            self.rho.clamp(params.rho()),
            self.v0.clamp(params.v0()),
        ]
    }
}

/// Where the Heston vol-of-vol comes from when pricing a quote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VolOfVolSource {
    /// Each quote's implied volatility is used as σ.
    ///
    /// The smile becomes an input to the dynamics rather than an output, so
    /// the fitted parameters are not a consistent Heston model.
    #[default]
    QuoteImpliedVol,
    /// σ of the calibration parameters is used for every quote.
    Fixed,
}

impl VolOfVolSource {
    /// Parameters for pricing `quote` around `base`.
    pub fn params_for(
        &self,
        base: &HestonParameters,
        quote: &OptionQuote,
    ) -> Result<HestonParameters, PricingError> {
        match self {
            VolOfVolSource::QuoteImpliedVol => base.with_sigma(quote.volatility),
            VolOfVolSource::Fixed => Ok(*base),
        }
    }
}

/// Parameters returned when the optimiser result is not usable. σ is taken
/// from the initial guess.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FallbackParameters {
    /// κ.
    pub kappa: f64,
    /// θ.
    pub theta: f64,
    /// ρ.
    pub rho: f64,
    /// v0.
    pub v0: f64,
}

impl Default for FallbackParameters {
    fn default() -> Self {
        Self {
            kappa: 2.0,
            theta: 0.04,
            rho: -0.7,
            v0: 0.04,
        }
    }
}

impl FallbackParameters {
    /// Complete parameter set with the given vol-of-vol.
    pub fn with_sigma(&self, sigma: f64) -> Result<HestonParameters, CalibrationError> {
        HestonParameters::new(self.kappa, self.theta, sigma, self.rho, self.v0).map_err(|e| {
            CalibrationError::invalid_config(format!("fallback parameters: {}", e))
        })
    }
}

/// Heston calibrator settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HestonCalibratorConfig {
    /// Search box.
    pub bounds: HestonBounds,
    /// Starting point; its σ is used under [`VolOfVolSource::Fixed`] and for
    /// the fallback.
    pub initial_guess: HestonParameters,
    /// Parameters returned on the fallback path.
    pub fallback: FallbackParameters,
    /// Vol-of-vol policy.
    pub vol_of_vol: VolOfVolSource,
    /// Residual assigned to a quote whose pricing fails mid-search.
    pub failure_penalty: f64,
    /// Solver settings; `max_duration` bounds the run's wall-clock time.
    pub lm: LMConfig,
    /// Forward-model settings.
    pub pricer: HestonPricerConfig,
}

impl Default for HestonCalibratorConfig {
    fn default() -> Self {
        Self {
            bounds: HestonBounds::default(),
            initial_guess: HestonParameters::CALIBRATION_GUESS,
            fallback: FallbackParameters::default(),
            vol_of_vol: VolOfVolSource::default(),
            failure_penalty: 10.0,
            lm: LMConfig::new(1e-8, 100),
            pricer: HestonPricerConfig::default(),
        }
    }
}

impl HestonCalibratorConfig {
    /// Check every setting; the first problem is returned.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        self.bounds.validate()?;
        self.fallback.with_sigma(self.initial_guess.sigma())?;
        if !(self.failure_penalty.is_finite() && self.failure_penalty > 0.0) {
            return Err(CalibrationError::invalid_config(format!(
                "failure penalty must be positive and finite, got {}",
                self.failure_penalty
            )));
        }
        if self.lm.max_iterations == 0 {
            return Err(CalibrationError::invalid_config(
                "solver needs at least one iteration",
            ));
        }
        if !(self.lm.tolerance > 0.0) {
            return Err(CalibrationError::invalid_config(format!(
                "solver tolerance must be positive, got {}",
                self.lm.tolerance
            )));
        }
        let p = &self.pricer;
        if !(p.truncation > 0.0 && p.truncation.is_finite()) {
            return Err(CalibrationError::invalid_config(format!(
                "integration truncation must be positive, got {}",
                p.truncation
            )));
        }
        if !(p.abs_tolerance > 0.0 && p.rel_tolerance >= 0.0) || p.max_subintervals == 0 {
            return Err(CalibrationError::invalid_config(
                "quadrature tolerances must be positive with a non-zero subinterval budget",
            ));
        }
        Ok(())
    }
}

/// A quote taking part in the objective.
#[derive(Debug, Clone, Copy)]
struct Target<'a> {
    quote: &'a OptionQuote,
    market: f64,
}

/// Market data for the [`Calibrator`] trait: quotes plus the fixed rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HestonCalibrationData {
    /// Quotes to fit.
    pub quotes: QuoteSet,
    /// Risk-free rate applied to every quote.
    pub rate: f64,
}

impl HestonCalibrationData {
    /// Bundle quotes with a rate.
    pub fn new(quotes: QuoteSet, rate: f64) -> Self {
        Self { quotes, rate }
    }
}

/// Heston calibrator.
///
/// # Examples
/// ```
/// use pricer_core::types::OptionKind;
/// use pricer_models::calibration::{HestonBounds, HestonCalibrator, HestonCalibratorConfig};
/// use pricer_models::instruments::{OptionQuote, QuoteSet};
/// use pricer_models::models::HestonParameters;
///
/// let quotes = QuoteSet::new(vec![
///     OptionQuote::new("A", 100.0, 100.0, 0.5, OptionKind::Call, 0.05, 0.3).with_market_price(8.5),
///     OptionQuote::new("B", 100.0, 110.0, 0.5, OptionKind::Call, 0.05, 0.3).with_market_price(4.2),
/// ]);
///
/// let calibrator = HestonCalibrator::new(HestonCalibratorConfig::default());
/// let result = calibrator
///     .calibrate(&quotes, 0.05, &HestonBounds::default(), &HestonParameters::CALIBRATION_GUESS)
///     .unwrap();
///
/// assert_eq!(result.quotes_used, 2);
/// assert!(result.objective.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct HestonCalibrator {
    config: HestonCalibratorConfig,
    pricer: HestonPricer,
}

impl Default for HestonCalibrator {
    fn default() -> Self {
        Self::new(HestonCalibratorConfig::default())
    }
}

impl HestonCalibrator {
    /// Create a calibrator.
    pub fn new(config: HestonCalibratorConfig) -> Self {
        let pricer = HestonPricer::new(config.pricer);
        Self { config, pricer }
    }

    /// Calibrator settings.
    pub fn config(&self) -> &HestonCalibratorConfig {
        &self.config
    }

    /// Forward model.
    pub fn pricer(&self) -> &HestonPricer {
        &self.pricer
    }

    /// Fit (κ, θ, ρ, v0) to `quotes`, pricing every quote at `r_fixed`.
    ///
    /// # Errors
    /// Only configuration problems: malformed `bounds`, a non-finite rate,
    /// or invalid calibrator settings. Everything else is reported in the
    /// result.
    pub fn calibrate(
        &self,
        quotes: &QuoteSet,
        r_fixed: f64,
        bounds: &HestonBounds,
        initial_guess: &HestonParameters,
    ) -> Result<HestonCalibrationResult, CalibrationError> {
        bounds.validate()?;
        HestonCalibratorConfig {
            bounds: *bounds,
            initial_guess: *initial_guess,
            ..self.config.clone()
        }
        .validate()?;
        if !r_fixed.is_finite() {
            return Err(CalibrationError::invalid_config(format!(
                "risk-free rate must be finite, got {}",
                r_fixed
            )));
        }

        let started = Instant::now();
        let sigma = initial_guess.sigma();
        let fallback = self.config.fallback.with_sigma(sigma)?;
        let start = bounds.project(initial_guess);

        let with_market: Vec<Target<'_>> = quotes
            .iter()
            .filter_map(|quote| {
                quote
                    .positive_market_price()
                    .map(|market| Target { quote, market })
            })
            .collect();
        let quotes_without_market = quotes.len() - with_market.len();

        // Screen at the projected starting point.
        let mut targets = Vec::with_capacity(with_market.len());
        let mut excluded = Vec::new();
        for target in with_market {
            match self.model_price(target.quote, &start, sigma, r_fixed) {
                Ok(_) => targets.push(target),
                Err(error) => {
                    debug!(
                        instrument_id = %target.quote.instrument_id,
                        %error,
                        "quote excluded from calibration"
                    );
                    excluded.push(ExcludedQuote {
                        instrument_id: target.quote.instrument_id.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            quotes = quotes.len(),
            usable = targets.len(),
            excluded = excluded.len(),
            without_market = quotes_without_market,
            "starting Heston calibration"
        );

        let finish = |params: HestonParameters,
                      path: CalibrationPath,
                      objective: f64,
                      iterations: usize| HestonCalibrationResult {
            params,
            path,
            objective,
            iterations,
            quotes_used: targets.len(),
            quotes_without_market,
            excluded: excluded.clone(),
            vol_of_vol: self.config.vol_of_vol,
        };

        if targets.is_empty() {
            let reason = CalibrationError::insufficient_data(0, 1)
                .with_message("no quote with a positive market price could be priced")
                .to_string();
            warn!(%reason, "Heston calibration falling back to defaults");
            return Ok(finish(fallback, CalibrationPath::Fallback { reason }, 0.0, 0));
        }

        let solver = LevenbergMarquardtSolver::new(self.config.lm);
        let residuals = |x: &[f64]| self.residual_vector(&targets, x, sigma, r_fixed);
        let outcome = solver.solve_bounded(residuals, start.to_vec(), &bounds.to_vec());

        let fall_back = |reason: String, iterations: usize| {
            let x = [
                fallback.kappa(),
                fallback.theta(),
                fallback.rho(),
                fallback.v0(),
            ];
            let objective = sum_of_squares(&self.residual_vector(&targets, &x, sigma, r_fixed));
            finish(
                fallback,
                CalibrationPath::Fallback { reason },
                objective,
                iterations,
            )
        };

        let result = match outcome {
            Ok(lm) if lm.converged => match self.params_from_vector(&lm.params, sigma) {
                Ok(params) => finish(
                    params,
                    CalibrationPath::Optimized,
                    lm.residual_ss,
                    lm.iterations,
                ),
                Err(e) => fall_back(
                    format!("optimiser returned invalid parameters: {}", e),
                    lm.iterations,
                ),
            },
            Ok(lm) => fall_back(
                CalibrationError::not_converged(lm.iterations, lm.residual_ss).to_string(),
                lm.iterations,
            ),
            Err(e) => {
                let iterations = match e {
                    SolverError::BudgetExhausted { iterations } => iterations,
                    _ => 0,
                };
                fall_back(CalibrationError::from(e).to_string(), iterations)
            }
        };

        match &result.path {
            CalibrationPath::Optimized => info!(
                params = %result.params,
                objective = result.objective,
                iterations = result.iterations,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Heston calibration converged"
            ),
            CalibrationPath::Fallback { reason } => warn!(
                %reason,
                params = %result.params,
                "Heston calibration falling back to defaults"
            ),
        }
        Ok(result)
    }

    /// Objective at `params` over the quotes of `quotes` with a positive
    /// market price. Quotes that fail to price score the failure penalty.
    pub fn objective(&self, quotes: &QuoteSet, r_fixed: f64, params: &HestonParameters) -> f64 {
        let targets: Vec<Target<'_>> = quotes
            .iter()
            .filter_map(|quote| {
                quote
                    .positive_market_price()
                    .map(|market| Target { quote, market })
            })
            .collect();
        let x = [params.kappa(), params.theta(), params.rho(), params.v0()];
        sum_of_squares(&self.residual_vector(&targets, &x, params.sigma(), r_fixed))
    }

    fn params_from_vector(&self, x: &[f64], sigma: f64) -> Result<HestonParameters, PricingError> {
        if x.len() != HestonParamIndex::COUNT {
            return Err(PricingError::InvalidInput(format!(
                "expected {} Heston parameters, got {}",
                HestonParamIndex::COUNT,
                x.len()
            )));
        }
        HestonParameters::new(
            x[HestonParamIndex::KAPPA],
            x[HestonParamIndex::THETA],
            sigma,
            x[HestonParamIndex::RHO],
            x[HestonParamIndex::V0],
        )
    }

    fn model_price(
        &self,
        quote: &OptionQuote,
        x: &[f64],
        sigma: f64,
        r_fixed: f64,
    ) -> Result<f64, PricingError> {
        quote.validate()?;
        let base = self.params_from_vector(x, sigma)?;
        let params = self.config.vol_of_vol.params_for(&base, quote)?;
        self.pricer.price(
            quote.spot,
            quote.strike,
            quote.time_to_expiry,
            r_fixed,
            &params,
            quote.kind,
        )
    }

    fn residual(&self, target: &Target<'_>, x: &[f64], sigma: f64, r_fixed: f64) -> f64 {
        match self.model_price(target.quote, x, sigma, r_fixed) {
            Ok(price) => (price - target.market) / target.market,
            Err(_) => self.config.failure_penalty,
        }
    }

    /// Per-quote residuals in quote order.
    #[cfg(not(feature = "parallel"))]
    fn residual_vector(
        &self,
        targets: &[Target<'_>],
        x: &[f64],
        sigma: f64,
        r_fixed: f64,
    ) -> Vec<f64> {
        targets
            .iter()
            .map(|t| self.residual(t, x, sigma, r_fixed))
            .collect()
    }

    /// Per-quote residuals in quote order, evaluated on the rayon pool.
    #[cfg(feature = "parallel")]
    fn residual_vector(
        &self,
        targets: &[Target<'_>],
        x: &[f64],
        sigma: f64,
        r_fixed: f64,
    ) -> Vec<f64> {
        use rayon::prelude::*;

        targets
            .par_iter()
            .map(|t| self.residual(t, x, sigma, r_fixed))
            .collect()
    }
}

impl Calibrator for HestonCalibrator {
    type MarketData = HestonCalibrationData;
    type ModelParams = HestonParameters;
    type Output = HestonCalibrationResult;

    fn calibrate(
        &self,
        market_data: &Self::MarketData,
        initial_params: Self::ModelParams,
    ) -> Result<Self::Output, CalibrationError> {
        HestonCalibrator::calibrate(
            self,
            &market_data.quotes,
            market_data.rate,
            &self.config.bounds,
            &initial_params,
        )
    }

    fn objective_function(&self, params: &[f64], market_data: &Self::MarketData) -> Vec<f64> {
        let targets: Vec<Target<'_>> = market_data
            .quotes
            .iter()
            .filter_map(|quote| {
                quote
                    .positive_market_price()
                    .map(|market| Target { quote, market })
            })
            .collect();
        self.residual_vector(
            &targets,
            params,
            self.config.initial_guess.sigma(),
            market_data.rate,
        )
    }

    fn bounds(&self) -> Vec<ParameterBounds> {
        self.config.bounds.to_vec()
    }
}

/// Sequential sum of squares in slice order.
fn sum_of_squares(residuals: &[f64]) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}
