//! Numerical building blocks.
//!
//! - [`quadrature`]: Globally adaptive Gauss-Kronrod integration
//! - [`solvers`]: Levenberg-Marquardt nonlinear least squares with box constraints

pub mod quadrature;
pub mod solvers;
