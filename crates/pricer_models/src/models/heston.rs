//! Heston stochastic volatility model: parameters and characteristic function.
//!
//! ## Dynamics
//!
//! ```text
//! dS = r S dt + √v S dW₁
//! dv = κ(θ - v) dt + σ √v dW₂,   d⟨W₁, W₂⟩ = ρ dt
//! ```
//!
//! ## Characteristic function
//!
//! For each [`ProbabilityBranch`] `j` with weight `w_j` and drift `b_j`
//! (P1: `w = 1/2, b = κ - ρσ`; P2: `w = -1/2, b = κ`):
//!
//! ```text
//! β = b - ρσiu
//! d = √(β² - σ²(2w·iu - u²))        principal root, Re(d) ≥ 0
//! g = (β - d) / (β + d)
//! C = r·iu·T + κθ/σ² [(β - d)T - 2 ln((1 - g e^{-dT}) / (1 - g))]
//! D = (β - d)/σ² · (1 - e^{-dT}) / (1 - g e^{-dT})
//! φ_j(u) = exp(C + D v0 + iu ln S)
//! ```
//!
//! This is the "little Heston trap" arrangement: algebraically identical to
//! Heston's original formula but with `|g e^{-dT}| < 1`, so the complex
//! logarithm never crosses its branch cut as `u` grows. `β - d` is computed
//! as `σ²(2w·iu - u²) / (β + d)` to avoid cancellation when σ is small.

use std::fmt;

use num_complex::Complex64;
use pricer_core::types::PricingError;

/// Heston model parameters.
///
/// Immutable once constructed; [`HestonParameters::new`] enforces
/// κ, θ, σ, v0 > 0 and ρ ∈ [-1, 1]. Deserialisation goes through the same
/// checks.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawHestonParameters"))]
pub struct HestonParameters {
    kappa: f64,
    theta: f64,
    sigma: f64,
    rho: f64,
    v0: f64,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawHestonParameters {
    kappa: f64,
    theta: f64,
    sigma: f64,
    rho: f64,
    v0: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawHestonParameters> for HestonParameters {
    type Error = PricingError;

    fn try_from(raw: RawHestonParameters) -> Result<Self, Self::Error> {
        Self::new(raw.kappa, raw.theta, raw.sigma, raw.rho, raw.v0)
    }
}

impl HestonParameters {
    /// Default calibration starting point: κ = 3, θ = 0.05, σ = 0.3,
    /// ρ = -0.6, v0 = 0.1.
    pub const CALIBRATION_GUESS: HestonParameters = HestonParameters {
        kappa: 3.0,
        theta: 0.05,
        sigma: 0.3,
        rho: -0.6,
        v0: 0.1,
    };

    /// Validate and build a parameter set.
    ///
    /// # Examples
    /// ```
    /// use pricer_models::models::HestonParameters;
    ///
    /// let params = HestonParameters::new(2.0, 0.04, 0.3, -0.7, 0.04).unwrap();
    /// assert_eq!(params.kappa(), 2.0);
    /// assert!(HestonParameters::new(2.0, 0.04, 0.3, -1.5, 0.04).is_err());
    /// ```
    pub fn new(
        kappa: f64,
        theta: f64,
        sigma: f64,
        rho: f64,
        v0: f64,
    ) -> Result<Self, PricingError> {
        let positive = [
            ("kappa", kappa),
            ("theta", theta),
            ("sigma", sigma),
            ("v0", v0),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(PricingError::InvalidInput(format!(
                    "Heston {} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if !(-1.0..=1.0).contains(&rho) {
            return Err(PricingError::InvalidInput(format!(
                "Heston rho must lie in [-1, 1], got {}",
                rho
            )));
        }
        Ok(Self {
            kappa,
            theta,
            sigma,
            rho,
            v0,
        })
    }

    /// Mean-reversion speed κ.
    #[inline]
    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    /// Long-run variance θ.
    #[inline]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Volatility of variance σ.
    #[inline]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Spot/variance correlation ρ.
    #[inline]
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Initial variance v0.
    #[inline]
    pub fn v0(&self) -> f64 {
        self.v0
    }

    /// Copy with a different vol-of-vol.
    pub fn with_sigma(&self, sigma: f64) -> Result<Self, PricingError> {
        Self::new(self.kappa, self.theta, sigma, self.rho, self.v0)
    }

    /// Whether 2κθ > σ² (variance stays strictly positive).
    pub fn satisfies_feller(&self) -> bool {
        2.0 * self.kappa * self.theta > self.sigma * self.sigma
    }
}

impl fmt::Display for HestonParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "κ={:.6} θ={:.6} σ={:.6} ρ={:.6} v0={:.6}",
            self.kappa, self.theta, self.sigma, self.rho, self.v0
        )
    }
}

/// Which of the two in-the-money probabilities a characteristic function
/// evaluation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbabilityBranch {
    /// Share-measure probability (delta term).
    P1,
    /// Risk-neutral exercise probability.
    P2,
}

impl ProbabilityBranch {
    /// Both branches, in order.
    pub const ALL: [ProbabilityBranch; 2] = [ProbabilityBranch::P1, ProbabilityBranch::P2];

    /// Weight `w_j` multiplying `iu`.
    #[inline]
    pub fn weight(&self) -> f64 {
        match self {
            ProbabilityBranch::P1 => 0.5,
            ProbabilityBranch::P2 => -0.5,
        }
    }

    /// Drift adjustment `b_j`.
    #[inline]
    pub fn drift(&self, params: &HestonParameters) -> f64 {
        match self {
            ProbabilityBranch::P1 => params.kappa - params.rho * params.sigma,
            ProbabilityBranch::P2 => params.kappa,
        }
    }
}

/// Heston characteristic function of ln S_T for a fixed option context.
///
/// Pure and stateless; overflow in pathological regimes propagates as
/// NaN/infinity in the returned value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HestonCharacteristicFunction {
    params: HestonParameters,
    ln_spot: f64,
    expiry: f64,
    rate: f64,
}

impl HestonCharacteristicFunction {
    /// Bind the function to a spot, expiry and rate.
    pub fn new(params: HestonParameters, spot: f64, expiry: f64, rate: f64) -> Self {
        Self {
            params,
            ln_spot: spot.ln(),
            expiry,
            rate,
        }
    }

    /// Model parameters.
    pub fn params(&self) -> &HestonParameters {
        &self.params
    }

    /// Evaluate φ_j(u) for complex `u`.
    ///
    /// # Examples
    /// ```
    /// use num_complex::Complex64;
    /// use pricer_models::models::{HestonCharacteristicFunction, HestonParameters, ProbabilityBranch};
    ///
    /// let params = HestonParameters::new(2.0, 0.04, 0.3, -0.7, 0.04).unwrap();
    /// let cf = HestonCharacteristicFunction::new(params, 100.0, 1.0, 0.05);
    ///
    /// // E[S_T] under the risk-neutral measure is the forward
    /// let forward = cf.phi(Complex64::new(0.0, -1.0), ProbabilityBranch::P2);
    /// assert!((forward.re - 100.0 * 0.05_f64.exp()).abs() < 1e-10);
    /// ```
    pub fn phi(&self, u: Complex64, branch: ProbabilityBranch) -> Complex64 {
        let HestonParameters {
            kappa,
            theta,
            sigma,
            rho,
            v0,
        } = self.params;
        let t = self.expiry;
        let sigma2 = sigma * sigma;

        let iu = Complex64::i() * u;
        let beta = branch.drift(&self.params) - rho * sigma * iu;
        let a = 2.0 * branch.weight() * iu - u * u;

        let d = (beta * beta - sigma2 * a).sqrt();
        let beta_plus_d = beta + d;
        let direct = beta - d;
        // (β - d)/σ²; the quotient form is exact when β + d dominates.
        let ratio = if beta_plus_d.norm_sqr() >= direct.norm_sqr() {
            a / beta_plus_d
        } else {
            direct / sigma2
        };
        let beta_minus_d = ratio * sigma2;

        let g = beta_minus_d / beta_plus_d;
        let e = (-d * t).exp();
        let one = Complex64::new(1.0, 0.0);
        let log_term = ((one - g * e) / (one - g)).ln();

        let c = self.rate * iu * t + kappa * theta * (ratio * t - 2.0 * log_term / sigma2);
        let dd = ratio * (one - e) / (one - g * e);

        (c + dd * v0 + iu * self.ln_spot).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> HestonParameters {
        HestonParameters::new(2.0, 0.04, 0.5, -0.7, 0.05).unwrap()
    }

    // ==========================================================
    // HestonParameters
    // ==========================================================

    #[test]
    fn test_parameters_validation() {
        assert!(HestonParameters::new(0.0, 0.04, 0.3, -0.7, 0.04).is_err());
        assert!(HestonParameters::new(2.0, -0.04, 0.3, -0.7, 0.04).is_err());
        assert!(HestonParameters::new(2.0, 0.04, 0.0, -0.7, 0.04).is_err());
        assert!(HestonParameters::new(2.0, 0.04, 0.3, 1.01, 0.04).is_err());
        assert!(HestonParameters::new(2.0, 0.04, 0.3, -0.7, f64::NAN).is_err());
        assert!(HestonParameters::new(2.0, 0.04, 0.3, -1.0, 0.04).is_ok());
        assert!(HestonParameters::new(2.0, 0.04, 0.3, 1.0, 0.04).is_ok());
    }

    #[test]
    fn test_with_sigma_and_feller() {
        let p = params().with_sigma(0.2).unwrap();
        assert_eq!(p.sigma(), 0.2);
        assert_eq!(p.kappa(), 2.0);
        // 2κθ = 0.16 > 0.04
        assert!(p.satisfies_feller());
        // 0.16 < 0.25
        assert!(!params().satisfies_feller());
        assert!(params().with_sigma(-1.0).is_err());
    }

    #[test]
    fn test_calibration_guess_is_valid() {
        let g = HestonParameters::CALIBRATION_GUESS;
        let rebuilt = HestonParameters::new(g.kappa(), g.theta(), g.sigma(), g.rho(), g.v0());
        assert_eq!(rebuilt.unwrap(), g);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialisation_validates() {
        let ok: HestonParameters = serde_json::from_str(
            r#"{"kappa": 2.0, "theta": 0.04, "sigma": 0.3, "rho": -0.7, "v0": 0.04}"#,
        )
        .unwrap();
        assert_eq!(ok.rho(), -0.7);

        let bad = serde_json::from_str::<HestonParameters>(
            r#"{"kappa": 2.0, "theta": 0.04, "sigma": 0.3, "rho": -1.7, "v0": 0.04}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_branch_constants() {
        let p = params();
        assert_eq!(ProbabilityBranch::P1.weight(), 0.5);
        assert_eq!(ProbabilityBranch::P2.weight(), -0.5);
        assert_relative_eq!(ProbabilityBranch::P1.drift(&p), 2.0 + 0.7 * 0.5);
        assert_eq!(ProbabilityBranch::P2.drift(&p), 2.0);
    }

    // ==========================================================
    // Characteristic function
    // ==========================================================

    #[test]
    fn test_phi_at_zero_is_one() {
        let cf = HestonCharacteristicFunction::new(params(), 100.0, 0.5, 0.03);
        for branch in ProbabilityBranch::ALL {
            let v = cf.phi(Complex64::new(0.0, 0.0), branch);
            assert_relative_eq!(v.re, 1.0, epsilon = 1e-14);
            assert_relative_eq!(v.im, 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_risk_neutral_martingale() {
        let cf = HestonCharacteristicFunction::new(params(), 250.0, 2.0, 0.04);
        let v = cf.phi(Complex64::new(0.0, -1.0), ProbabilityBranch::P2);
        assert_relative_eq!(v.re, 250.0 * 0.08_f64.exp(), max_relative = 1e-12);
        assert!(v.im.abs() < 1e-9);
    }

    #[test]
    fn test_share_measure_is_shifted_risk_neutral() {
        // φ₁(u) = φ₂(u - i) / (S e^{rT})
        let (spot, t, r) = (120.0, 0.75, 0.02);
        let cf = HestonCharacteristicFunction::new(params(), spot, t, r);
        let forward = spot * (r * t).exp();
        for &u in &[0.3, 1.0, 4.0, 15.0, 60.0] {
            let p1 = cf.phi(Complex64::new(u, 0.0), ProbabilityBranch::P1);
            let p2 = cf.phi(Complex64::new(u, -1.0), ProbabilityBranch::P2) / forward;
            assert_relative_eq!(p1.re, p2.re, epsilon = 1e-10);
            assert_relative_eq!(p1.im, p2.im, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_conjugate_symmetry() {
        let cf = HestonCharacteristicFunction::new(params(), 100.0, 1.0, 0.05);
        for branch in ProbabilityBranch::ALL {
            for &u in &[0.5, 3.0, 25.0] {
                let plus = cf.phi(Complex64::new(u, 0.0), branch);
                let minus = cf.phi(Complex64::new(-u, 0.0), branch);
                assert_relative_eq!(plus.re, minus.re, epsilon = 1e-12);
                assert_relative_eq!(plus.im, -minus.im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_modulus_bounded_by_one_for_real_argument() {
        let cf = HestonCharacteristicFunction::new(params(), 100.0, 5.0, 0.05);
        // Continuity across large u: no branch-cut jumps in |φ|
        let mut previous = 1.0;
        for k in 1..=400 {
            let u = k as f64 * 0.25;
            let m = cf.phi(Complex64::new(u, 0.0), ProbabilityBranch::P2).norm();
            assert!(m <= 1.0 + 1e-12, "|phi({})| = {}", u, m);
            assert!(m <= previous + 1e-2, "|phi| jumped at u = {}", u);
            previous = m;
        }
    }

    #[test]
    fn test_small_vol_of_vol_matches_lognormal() {
        // σ → 0 with v0 = θ: ln S_T ~ N(ln S + (r - θ/2)T, θT)
        let p = HestonParameters::new(1.5, 0.09, 1e-4, 0.0, 0.09).unwrap();
        let (spot, t, r) = (100.0, 1.0, 0.03);
        let cf = HestonCharacteristicFunction::new(p, spot, t, r);
        for &u in &[0.5, 2.0, 5.0] {
            let v = cf.phi(Complex64::new(u, 0.0), ProbabilityBranch::P2);
            let mean = spot.ln() + (r - 0.045) * t;
            let expected = Complex64::new(-0.5 * 0.09 * t * u * u, u * mean).exp();
            assert_relative_eq!(v.re, expected.re, epsilon = 1e-6);
            assert_relative_eq!(v.im, expected.im, epsilon = 1e-6);
        }
    }
}
