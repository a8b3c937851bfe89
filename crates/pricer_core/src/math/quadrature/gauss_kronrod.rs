//! Globally adaptive Gauss-Kronrod (G7/K15) quadrature.

use thiserror::Error;

use crate::types::PricingError;

/// Kronrod abscissae on [0, 1]; the Gauss nodes are the odd entries plus 0.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

/// Kronrod weights matching `XGK`.
const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_18,
    0.140_653_259_715_525_92,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_83,
];

/// Gauss weights for `XGK[1]`, `XGK[3]`, `XGK[5]` and the centre.
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Quadrature failure modes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuadratureError {
    /// Tolerance not met before the subinterval budget ran out.
    #[error("subdivision limit of {subintervals} reached (error estimate {estimated_error:e})")]
    SubdivisionLimit {
        /// Subintervals in use
        subintervals: usize,
        /// Summed error estimate
        estimated_error: f64,
    },

    /// The integrand returned NaN or infinity.
    #[error("integrand is not finite at x = {x}")]
    NonFinite {
        /// Abscissa of the offending evaluation
        x: f64,
    },

    /// Non-finite integration limits.
    #[error("invalid integration interval [{a}, {b}]")]
    InvalidInterval {
        /// Lower limit
        a: f64,
        /// Upper limit
        b: f64,
    },
}

impl From<QuadratureError> for PricingError {
    fn from(err: QuadratureError) -> Self {
        match err {
            QuadratureError::SubdivisionLimit {
                subintervals,
                estimated_error,
            } => PricingError::IntegrationFailure {
                subintervals,
                estimated_error,
            },
            QuadratureError::NonFinite { .. } => PricingError::NumericDegeneracy(err.to_string()),
            QuadratureError::InvalidInterval { .. } => PricingError::InvalidInput(err.to_string()),
        }
    }
}

/// Tolerances and budget for [`GaussKronrod`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QuadratureConfig {
    /// Absolute error tolerance.
    pub abs_tolerance: f64,
    /// Relative error tolerance.
    pub rel_tolerance: f64,
    /// Maximum number of subintervals.
    pub max_subintervals: usize,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self {
            abs_tolerance: 1e-10,
            rel_tolerance: 1e-10,
            max_subintervals: 200,
        }
    }
}

impl QuadratureConfig {
    /// Create a configuration.
    pub fn new(abs_tolerance: f64, rel_tolerance: f64, max_subintervals: usize) -> Self {
        Self {
            abs_tolerance,
            rel_tolerance,
            max_subintervals,
        }
    }
}

/// Converged integral with diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadratureResult {
    /// Integral estimate.
    pub value: f64,
    /// Summed absolute error estimate.
    pub abs_error: f64,
    /// Subintervals used.
    pub subintervals: usize,
    /// Integrand evaluations.
    pub evaluations: usize,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

/// Globally adaptive Gauss-Kronrod integrator.
///
/// # Example
///
/// ```
/// use pricer_core::math::quadrature::{GaussKronrod, QuadratureConfig};
///
/// let integrator = GaussKronrod::new(QuadratureConfig::new(1e-10, 1e-10, 100));
/// let result = integrator.integrate(|x: f64| x.sin(), 0.0, std::f64::consts::PI).unwrap();
/// assert!((result.value - 2.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussKronrod {
    config: QuadratureConfig,
}

impl GaussKronrod {
    /// Create an integrator.
    pub fn new(config: QuadratureConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &QuadratureConfig {
        &self.config
    }

    /// Integrate `f` over `[a, b]`.
    ///
    /// Reversed limits flip the sign; equal limits give zero.
    ///
    /// # Errors
    ///
    /// - `SubdivisionLimit` when the tolerance is not met within `max_subintervals`
    /// - `NonFinite` on the first NaN/infinite integrand value
    /// - `InvalidInterval` for non-finite limits
    pub fn integrate<F>(&self, f: F, a: f64, b: f64) -> Result<QuadratureResult, QuadratureError>
    where
        F: Fn(f64) -> f64,
    {
        if !a.is_finite() || !b.is_finite() {
            return Err(QuadratureError::InvalidInterval { a, b });
        }
        if a == b {
            return Ok(QuadratureResult {
                value: 0.0,
                abs_error: 0.0,
                subintervals: 0,
                evaluations: 0,
            });
        }
        if a > b {
            let mut result = self.integrate(f, b, a)?;
            result.value = -result.value;
            return Ok(result);
        }

        let max_subintervals = self.config.max_subintervals.max(1);
        let mut evaluations = 15;
        let mut segments = vec![qk15(&f, a, b)?];

        loop {
            // Sequential sums over segment storage order.
            let value: f64 = segments.iter().map(|s| s.value).sum();
            let error: f64 = segments.iter().map(|s| s.error).sum();
            let tolerance = self
                .config
                .abs_tolerance
                .max(self.config.rel_tolerance * value.abs());

            if error <= tolerance {
                return Ok(QuadratureResult {
                    value,
                    abs_error: error,
                    subintervals: segments.len(),
                    evaluations,
                });
            }

            if segments.len() >= max_subintervals {
                return Err(QuadratureError::SubdivisionLimit {
                    subintervals: segments.len(),
                    estimated_error: error,
                });
            }

            let worst = segments
                .iter()
                .enumerate()
                .max_by(|(_, l), (_, r)| l.error.total_cmp(&r.error))
                .map(|(i, _)| i)
                .unwrap_or(0);
            let seg = segments[worst];
            let mid = 0.5 * (seg.a + seg.b);
            if mid <= seg.a || mid >= seg.b {
                // Interval cannot be bisected any further in f64.
                return Err(QuadratureError::SubdivisionLimit {
                    subintervals: segments.len(),
                    estimated_error: error,
                });
            }

            segments[worst] = qk15(&f, seg.a, mid)?;
            segments.push(qk15(&f, mid, seg.b)?);
            evaluations += 30;
        }
    }
}

/// 15-point Kronrod estimate with the embedded 7-point Gauss rule as error proxy.
fn qk15<F>(f: &F, a: f64, b: f64) -> Result<Segment, QuadratureError>
where
    F: Fn(f64) -> f64,
{
    let centre = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let eval = |x: f64| -> Result<f64, QuadratureError> {
        let y = f(x);
        if y.is_finite() {
            Ok(y)
        } else {
            Err(QuadratureError::NonFinite { x })
        }
    };

    let fc = eval(centre)?;
    let mut kronrod = WGK[7] * fc;
    let mut gauss = WG[3] * fc;

    for (j, (&x, &wk)) in XGK.iter().zip(WGK.iter()).take(7).enumerate() {
        let dx = half * x;
        let pair = eval(centre - dx)? + eval(centre + dx)?;
        kronrod += wk * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    Ok(Segment {
        a,
        b,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    // ========================================
    // Exactness Tests
    // ========================================

    #[test]
    fn test_polynomial_is_exact() {
        let integrator = GaussKronrod::default();
        let result = integrator
            .integrate(|x| 3.0 * x * x - 2.0 * x + 1.0, -1.0, 2.0)
            .unwrap();
        // [x³ - x² + x] from -1 to 2 = 6 - (-3)
        assert_relative_eq!(result.value, 9.0, epsilon = 1e-12);
        assert_eq!(result.subintervals, 1);
        assert_eq!(result.evaluations, 15);
    }

    #[test]
    fn test_weights_sum_to_two() {
        let k: f64 = WGK[7] + 2.0 * WGK.iter().take(7).sum::<f64>();
        let g: f64 = WG[3] + 2.0 * WG.iter().take(3).sum::<f64>();
        assert_relative_eq!(k, 2.0, epsilon = 1e-14);
        assert_relative_eq!(g, 2.0, epsilon = 1e-14);
    }

    // ========================================
    // Adaptivity Tests
    // ========================================

    #[test]
    fn test_oscillatory_integrand_subdivides() {
        let integrator = GaussKronrod::new(QuadratureConfig::new(1e-10, 1e-10, 200));
        let result = integrator.integrate(|x: f64| (20.0 * x).cos(), 0.0, PI).unwrap();
        assert!(result.value.abs() < 1e-9);
        assert!(result.subintervals > 1);
    }

    #[test]
    fn test_peaked_integrand() {
        let integrator = GaussKronrod::new(QuadratureConfig::new(1e-10, 1e-10, 200));
        // ∫ 1 / (1 + 100 x²) over [-1, 1] = 2 atan(10) / 10
        let result = integrator
            .integrate(|x| 1.0 / (1.0 + 100.0 * x * x), -1.0, 1.0)
            .unwrap();
        assert_relative_eq!(result.value, 2.0 * 10.0_f64.atan() / 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reversed_limits_flip_sign() {
        let integrator = GaussKronrod::default();
        let forward = integrator.integrate(|x: f64| x.exp(), 0.0, 1.0).unwrap();
        let backward = integrator.integrate(|x: f64| x.exp(), 1.0, 0.0).unwrap();
        assert_relative_eq!(forward.value, -backward.value, epsilon = 1e-15);
        assert_relative_eq!(forward.value, std::f64::consts::E - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_interval() {
        let result = GaussKronrod::default().integrate(|x| x, 1.0, 1.0).unwrap();
        assert_eq!(result.value, 0.0);
        assert_eq!(result.evaluations, 0);
    }

    // ========================================
    // Failure Tests
    // ========================================

    #[test]
    fn test_subdivision_limit_reported() {
        let integrator = GaussKronrod::new(QuadratureConfig::new(1e-14, 1e-14, 2));
        let err = integrator
            .integrate(|x: f64| (50.0 * x).sin() * x.sqrt(), 0.0, 10.0)
            .unwrap_err();
        match err {
            QuadratureError::SubdivisionLimit { subintervals, .. } => assert_eq!(subintervals, 2),
            other => panic!("expected SubdivisionLimit, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_integrand_propagates() {
        let err = GaussKronrod::default()
            .integrate(|x| if x > 0.5 { f64::NAN } else { x }, 0.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, QuadratureError::NonFinite { .. }));

        let pricing: PricingError = err.into();
        assert!(matches!(pricing, PricingError::NumericDegeneracy(_)));
    }

    #[test]
    fn test_invalid_interval() {
        let err = GaussKronrod::default()
            .integrate(|x| x, 0.0, f64::INFINITY)
            .unwrap_err();
        assert!(matches!(err, QuadratureError::InvalidInterval { .. }));
    }

    #[test]
    fn test_subdivision_limit_maps_to_integration_failure() {
        let err = QuadratureError::SubdivisionLimit {
            subintervals: 300,
            estimated_error: 1e-4,
        };
        let pricing: PricingError = err.into();
        assert_eq!(
            pricing,
            PricingError::IntegrationFailure {
                subintervals: 300,
                estimated_error: 1e-4
            }
        );
    }

    // ========================================
    // Property Tests
    // ========================================

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_gaussian_bump_integral_matches_closed_form(
            centre in -2.0f64..2.0,
            width in 0.2f64..2.0,
        ) {
            // ∫ exp(-((x - c)/w)²) dx over R = w √π; ±8w captures it to f64 precision
            let integrator = GaussKronrod::new(QuadratureConfig::new(1e-11, 1e-11, 500));
            let result = integrator
                .integrate(
                    |x| (-((x - centre) / width).powi(2)).exp(),
                    centre - 8.0 * width,
                    centre + 8.0 * width,
                )
                .unwrap();
            prop_assert!((result.value - width * PI.sqrt()).abs() < 1e-9);
        }
    }
}
