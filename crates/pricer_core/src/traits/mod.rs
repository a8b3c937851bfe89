//! Core traits.
//!
//! - [`calibration::Calibrator`]: fit model parameters to market data by
//!   least squares
//! - [`calibration::ParameterBounds`]: box constraint for one parameter

pub mod calibration;
