//! Heston semi-analytical pricing by Fourier inversion.
//!
//! ```text
//! P_j  = 1/2 + 1/π ∫₀^Φmax Re[ e^{-iu ln K} φ_j(u) / (iu) ] du
//! call = S·P1 - K·e^{-rT}·P2
//! put  = K·e^{-rT}·(1 - P2) - S·(1 - P1)
//! ```
//!
//! The integral is evaluated with adaptive Gauss-Kronrod quadrature on the
//! truncated range `[0, Φmax]`. A quadrature that runs out of subintervals is
//! reported as `PricingError::IntegrationFailure`; non-finite characteristic
//! function values surface as `PricingError::NumericDegeneracy`.

use std::f64::consts::PI;

use num_complex::Complex64;
use pricer_core::math::quadrature::{GaussKronrod, QuadratureConfig};
use pricer_core::types::{OptionKind, PricingError};

use crate::instruments::OptionQuote;
use crate::models::{HestonCharacteristicFunction, HestonParameters, ProbabilityBranch};

/// Heston pricer settings.
///
/// The integration cost per quote dominates calibration run time, so the
/// truncation point and tolerances are tunable.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HestonPricerConfig {
    /// Upper limit Φmax of the inversion integral.
    pub truncation: f64,
    /// Absolute quadrature tolerance.
    pub abs_tolerance: f64,
    /// Relative quadrature tolerance.
    pub rel_tolerance: f64,
    /// Subinterval budget per probability.
    pub max_subintervals: usize,
}

impl Default for HestonPricerConfig {
    fn default() -> Self {
        Self {
            truncation: 85.0,
            abs_tolerance: 1e-6,
            rel_tolerance: 1e-6,
            max_subintervals: 300,
        }
    }
}

impl HestonPricerConfig {
    fn quadrature(&self) -> QuadratureConfig {
        QuadratureConfig::new(self.abs_tolerance, self.rel_tolerance, self.max_subintervals)
    }
}

/// European option pricer under Heston dynamics.
///
/// # Examples
/// ```
/// use pricer_core::types::OptionKind;
/// use pricer_models::analytical::{HestonPricer, HestonPricerConfig};
/// use pricer_models::models::HestonParameters;
///
/// let pricer = HestonPricer::new(HestonPricerConfig::default());
/// let params = HestonParameters::new(2.0, 0.04, 0.3, -0.7, 0.04).unwrap();
///
/// let call = pricer.price(100.0, 100.0, 1.0, 0.05, &params, OptionKind::Call).unwrap();
/// let put = pricer.price(100.0, 100.0, 1.0, 0.05, &params, OptionKind::Put).unwrap();
///
/// // Put-call parity holds by construction
/// let parity = 100.0 - 100.0 * (-0.05_f64).exp();
/// assert!((call - put - parity).abs() < 1e-8);
/// ```
#[derive(Debug, Clone)]
pub struct HestonPricer {
    config: HestonPricerConfig,
    quadrature: GaussKronrod,
}

impl Default for HestonPricer {
    fn default() -> Self {
        Self::new(HestonPricerConfig::default())
    }
}

impl HestonPricer {
    /// Create a pricer.
    pub fn new(config: HestonPricerConfig) -> Self {
        Self {
            config,
            quadrature: GaussKronrod::new(config.quadrature()),
        }
    }

    /// Pricer settings.
    pub fn config(&self) -> &HestonPricerConfig {
        &self.config
    }

    /// Price one European option.
    ///
    /// # Errors
    /// - `InvalidInput` for non-positive spot, strike or expiry, or a
    ///   non-finite rate
    /// - `IntegrationFailure` when either probability integral exhausts its
    ///   subinterval budget
    /// - `NumericDegeneracy` when the characteristic function or the
    ///   combined premium is not finite
    pub fn price(
        &self,
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        params: &HestonParameters,
        kind: OptionKind,
    ) -> Result<f64, PricingError> {
        validate_inputs(spot, strike, expiry, rate)?;

        let cf = HestonCharacteristicFunction::new(*params, spot, expiry, rate);
        let p1 = self.probability(&cf, strike, ProbabilityBranch::P1)?;
        let p2 = self.probability(&cf, strike, ProbabilityBranch::P2)?;

        let discounted_strike = strike * (-rate * expiry).exp();
        let premium = match kind {
            OptionKind::Call => spot * p1 - discounted_strike * p2,
            OptionKind::Put => discounted_strike * (1.0 - p2) - spot * (1.0 - p1),
        };

        if !premium.is_finite() {
            return Err(PricingError::NumericDegeneracy(format!(
                "Heston premium is {} (P1 = {}, P2 = {}) for {}",
                premium, p1, p2, params
            )));
        }
        // Integration error can push near-zero premiums slightly negative.
        Ok(premium.max(0.0))
    }

    /// In-the-money probability `P_j` for one branch.
    pub fn probability(
        &self,
        cf: &HestonCharacteristicFunction,
        strike: f64,
        branch: ProbabilityBranch,
    ) -> Result<f64, PricingError> {
        let ln_strike = strike.ln();
        let integrand = |u: f64| {
            if u == 0.0 {
                return 0.0;
            }
            let z = Complex64::new(u, 0.0);
            let kernel = Complex64::new(0.0, -u * ln_strike).exp();
            (kernel * cf.phi(z, branch) / Complex64::new(0.0, u)).re
        };

        let result = self
            .quadrature
            .integrate(integrand, 0.0, self.config.truncation)?;
        Ok(0.5 + result.value / PI)
    }

    /// Price a quote under the given parameters.
    pub fn price_quote(
        &self,
        quote: &OptionQuote,
        params: &HestonParameters,
    ) -> Result<f64, PricingError> {
        quote.validate()?;
        self.price(
            quote.spot,
            quote.strike,
            quote.time_to_expiry,
            quote.rate,
            params,
            quote.kind,
        )
    }
}

fn validate_inputs(spot: f64, strike: f64, expiry: f64, rate: f64) -> Result<(), PricingError> {
    for (name, value) in [("spot", spot), ("strike", strike), ("expiry", expiry)] {
        if !(value > 0.0 && value.is_finite()) {
            return Err(PricingError::InvalidInput(format!(
                "{} must be positive and finite, got {}",
                name, value
            )));
        }
    }
    if !rate.is_finite() {
        return Err(PricingError::InvalidInput(format!(
            "rate must be finite, got {}",
            rate
        )));
    }
    Ok(())
}
