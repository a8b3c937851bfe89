//! Black-Scholes closed-form pricing for European options.
//!
//! ## Formula
//!
//! ```text
//! d1 = (ln(S/K) + (r + σ²/2)T) / (σ√T)
//! d2 = d1 - σ√T
//!
//! call = S·Φ(d1) - K·e^(-rT)·Φ(d2)
//! put  = K·e^(-rT)·Φ(-d2) - S·Φ(-d1)
//! ```
//!
//! [`black_scholes_price`] is the bare closed form. [`BlackScholesPricer`]
//! adds the out-of-the-money put floor configured in [`BlackScholesConfig`].

use pricer_core::types::{OptionKind, PricingError};

use super::distributions::{norm_cdf, norm_pdf};
use super::error::AnalyticalError;
use crate::instruments::OptionQuote;

/// Validated Black-Scholes inputs for one option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackScholesInputs {
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    volatility: f64,
    total_vol: f64,
}

impl BlackScholesInputs {
    /// Validate and build the inputs.
    ///
    /// # Errors
    /// Non-positive or non-finite spot, strike, expiry or volatility, a
    /// non-finite rate, or σ√T underflowing to zero.
    pub fn new(
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        volatility: f64,
    ) -> Result<Self, AnalyticalError> {
        if !(spot > 0.0 && spot.is_finite()) {
            return Err(AnalyticalError::InvalidSpot { spot });
        }
        if !(strike > 0.0 && strike.is_finite()) {
            return Err(AnalyticalError::InvalidStrike { strike });
        }
        if !(expiry > 0.0 && expiry.is_finite()) {
            return Err(AnalyticalError::InvalidExpiry { expiry });
        }
        if !(volatility > 0.0 && volatility.is_finite()) {
            return Err(AnalyticalError::InvalidVolatility { volatility });
        }
        if !rate.is_finite() {
            return Err(AnalyticalError::InvalidRate { rate });
        }
        let total_vol = volatility * expiry.sqrt();
        if total_vol == 0.0 {
            return Err(AnalyticalError::DegenerateVariance { volatility, expiry });
        }
        Ok(Self {
            spot,
            strike,
            expiry,
            rate,
            volatility,
            total_vol,
        })
    }

    /// d1 term.
    #[inline]
    pub fn d1(&self) -> f64 {
        ((self.spot / self.strike).ln()
            + (self.rate + 0.5 * self.volatility * self.volatility) * self.expiry)
            / self.total_vol
    }

    /// d2 = d1 - σ√T.
    #[inline]
    pub fn d2(&self) -> f64 {
        self.d1() - self.total_vol
    }

    /// Discount factor e^(-rT).
    #[inline]
    pub fn discount_factor(&self) -> f64 {
        (-self.rate * self.expiry).exp()
    }

    /// Closed-form premium, no floor.
    pub fn price(&self, kind: OptionKind) -> f64 {
        let d1 = self.d1();
        let d2 = d1 - self.total_vol;
        let df = self.discount_factor();
        match kind {
            OptionKind::Call => self.spot * norm_cdf(d1) - self.strike * df * norm_cdf(d2),
            OptionKind::Put => self.strike * df * norm_cdf(-d2) - self.spot * norm_cdf(-d1),
        }
    }

    /// Vega ∂V/∂σ, identical for calls and puts.
    pub fn vega(&self) -> f64 {
        self.spot * norm_pdf(self.d1()) * self.expiry.sqrt()
    }
}

/// Closed-form Black-Scholes premium with no floor applied.
///
/// # Examples
/// ```
/// use pricer_core::types::OptionKind;
/// use pricer_models::analytical::black_scholes_price;
///
/// let call = black_scholes_price(100.0, 100.0, 0.5, 0.05, 0.2, OptionKind::Call).unwrap();
/// assert!((call - 6.89).abs() < 0.01);
/// ```
pub fn black_scholes_price(
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    volatility: f64,
    kind: OptionKind,
) -> Result<f64, AnalyticalError> {
    Ok(BlackScholesInputs::new(spot, strike, expiry, rate, volatility)?.price(kind))
}

/// Black-Scholes pricer settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BlackScholesConfig {
    /// Puts whose in-the-money probability Φ(-d2) falls below this value are
    /// priced at zero. `0.0` disables the floor.
    pub put_floor_threshold: f64,
}

impl Default for BlackScholesConfig {
    fn default() -> Self {
        Self {
            put_floor_threshold: 0.01,
        }
    }
}

impl BlackScholesConfig {
    /// Configuration with the put floor switched off.
    pub fn without_put_floor() -> Self {
        Self {
            put_floor_threshold: 0.0,
        }
    }
}

/// Black-Scholes pricer with the configured put floor.
///
/// # Examples
/// ```
/// use pricer_core::types::OptionKind;
/// use pricer_models::analytical::{BlackScholesConfig, BlackScholesPricer};
///
/// let pricer = BlackScholesPricer::new(BlackScholesConfig::default());
///
/// // Φ(-d2) is far below 1%: floored
/// let put = pricer.price(100.0, 50.0, 0.25, 0.0, 0.2, OptionKind::Put).unwrap();
/// assert_eq!(put, 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlackScholesPricer {
    config: BlackScholesConfig,
}

impl BlackScholesPricer {
    /// Create a pricer.
    pub fn new(config: BlackScholesConfig) -> Self {
        Self { config }
    }

    /// Pricer settings.
    pub fn config(&self) -> &BlackScholesConfig {
        &self.config
    }

    /// Price one option.
    pub fn price(
        &self,
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        volatility: f64,
        kind: OptionKind,
    ) -> Result<f64, AnalyticalError> {
        let inputs = BlackScholesInputs::new(spot, strike, expiry, rate, volatility)?;
        if kind == OptionKind::Put && norm_cdf(-inputs.d2()) < self.config.put_floor_threshold {
            return Ok(0.0);
        }
        Ok(inputs.price(kind))
    }

    /// Price a quote with its own rate and implied volatility.
    pub fn price_quote(&self, quote: &OptionQuote) -> Result<f64, PricingError> {
        quote.validate()?;
        Ok(self.price(
            quote.spot,
            quote.strike,
            quote.time_to_expiry,
            quote.rate,
            quote.volatility,
            quote.kind,
        )?)
    }
}
