//! Calibration traits and bound types.
//!
//! # Example
//!
//! ```
//! use pricer_core::traits::calibration::{Calibrator, ParameterBounds};
//! use pricer_core::types::CalibrationError;
//!
//! struct MeanCalibrator;
//!
//! impl Calibrator for MeanCalibrator {
//!     type MarketData = Vec<f64>;
//!     type ModelParams = f64;
//!     type Output = f64;
//!
//!     fn calibrate(
//!         &self,
//!         market_data: &Self::MarketData,
//!         _initial_params: Self::ModelParams,
//!     ) -> Result<Self::Output, CalibrationError> {
//!         Ok(market_data.iter().sum::<f64>() / market_data.len() as f64)
//!     }
//!
//!     fn objective_function(&self, params: &[f64], market_data: &Self::MarketData) -> Vec<f64> {
//!         market_data.iter().map(|m| params[0] - m).collect()
//!     }
//!
//!     fn bounds(&self) -> Vec<ParameterBounds> {
//!         vec![ParameterBounds::unbounded()]
//!     }
//! }
//!
//! let data = vec![1.0, 2.0, 3.0];
//! let cal = MeanCalibrator;
//! assert_eq!(cal.calibrate(&data, 0.0).unwrap(), 2.0);
//! assert_eq!(cal.objective_value(&[2.0], &data), 2.0);
//! ```

use crate::types::CalibrationError;

/// Closed interval `[min, max]` for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterBounds {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl ParameterBounds {
    /// Create bounds. Validity is checked by [`ParameterBounds::validate`].
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `(-inf, +inf)`.
    pub fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// Whether `value` lies inside the bounds.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp `value` into the bounds.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// `min <= max` and neither is NaN.
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// Validate, naming the parameter in the error.
    pub fn validate(&self, name: &str) -> Result<(), CalibrationError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(CalibrationError::invalid_bounds(name, self.min, self.max))
        }
    }
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Least-squares calibration of model parameters.
///
/// Implementors expose the residual vector whose squared norm is minimised;
/// `objective_value` reduces it sequentially in residual order so the scalar
/// objective is reproducible to the last bit.
pub trait Calibrator {
    /// Market observations to fit.
    type MarketData;
    /// Starting point for the search.
    type ModelParams;
    /// Result of a calibration run.
    type Output;

    /// Run the calibration.
    ///
    /// # Errors
    ///
    /// Only configuration problems are returned as errors; a run that fails
    /// to converge is reported inside `Output`.
    fn calibrate(
        &self,
        market_data: &Self::MarketData,
        initial_params: Self::ModelParams,
    ) -> Result<Self::Output, CalibrationError>;

    /// Residual vector at `params` (free parameters in solver order).
    fn objective_function(&self, params: &[f64], market_data: &Self::MarketData) -> Vec<f64>;

    /// Box constraints, one per free parameter.
    fn bounds(&self) -> Vec<ParameterBounds>;

    /// Sum of squared residuals at `params`.
    fn objective_value(&self, params: &[f64], market_data: &Self::MarketData) -> f64 {
        self.objective_function(params, market_data)
            .iter()
            .map(|r| r * r)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // ParameterBounds Tests
    // ========================================

    #[test]
    fn test_bounds_contains_and_clamp() {
        let b = ParameterBounds::new(1.0, 5.0);
        assert!(b.contains(1.0));
        assert!(b.contains(5.0));
        assert!(!b.contains(5.5));
        assert_eq!(b.clamp(0.0), 1.0);
        assert_eq!(b.clamp(3.0), 3.0);
        assert_eq!(b.clamp(9.0), 5.0);
    }

    #[test]
    fn test_bounds_validity() {
        assert!(ParameterBounds::new(-0.9, -0.3).is_valid());
        assert!(ParameterBounds::new(0.1, 0.1).is_valid());
        assert!(!ParameterBounds::new(0.3, -0.3).is_valid());
        assert!(!ParameterBounds::new(f64::NAN, 1.0).is_valid());
        assert!(ParameterBounds::unbounded().is_valid());
    }

    #[test]
    fn test_bounds_validate_names_parameter() {
        let err = ParameterBounds::new(0.2, 0.02).validate("theta").unwrap_err();
        assert!(err.is_config_error());
        assert!(format!("{}", err).contains("theta"));
    }

    // ========================================
    // Calibrator Tests
    // ========================================

    struct LineCalibrator;

    impl Calibrator for LineCalibrator {
        type MarketData = Vec<(f64, f64)>;
        type ModelParams = [f64; 2];
        type Output = [f64; 2];

        fn calibrate(
            &self,
            _market_data: &Self::MarketData,
            initial_params: Self::ModelParams,
        ) -> Result<Self::Output, CalibrationError> {
            Ok(initial_params)
        }

        fn objective_function(&self, params: &[f64], market_data: &Self::MarketData) -> Vec<f64> {
            market_data
                .iter()
                .map(|(x, y)| params[0] + params[1] * x - y)
                .collect()
        }

        fn bounds(&self) -> Vec<ParameterBounds> {
            vec![ParameterBounds::unbounded(); 2]
        }
    }

    #[test]
    fn test_objective_value_is_sum_of_squares() {
        let data = vec![(0.0, 1.0), (1.0, 3.0), (2.0, 4.0)];
        let cal = LineCalibrator;
        // residuals at (1, 2): 0, 0, 1
        assert_eq!(cal.objective_value(&[1.0, 2.0], &data), 1.0);
        assert_eq!(cal.bounds().len(), 2);
    }
}
