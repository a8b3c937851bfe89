//! # pricer_core: Numerical Foundation for Option Pricing
//!
//! ## Layer 1 (Foundation) Role
//!
//! pricer_core is the bottom layer of the workspace and provides:
//! - Error taxonomy shared by every pricer: `PricingError`, `SolverError`,
//!   `CalibrationError` (`types::error`)
//! - Option kind: `OptionKind` (`types::option_kind`)
//! - Adaptive Gauss-Kronrod quadrature (`math::quadrature`)
//! - Box-constrained Levenberg-Marquardt least squares (`math::solvers`)
//! - Calibration abstractions: `Calibrator`, `ParameterBounds` (`traits::calibration`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other pricer_* crates and keeps external
//! dependencies minimal:
//! - thiserror: Error derivation
//! - tracing: Solver iteration events
//! - serde: Serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use pricer_core::math::quadrature::{GaussKronrod, QuadratureConfig};
//! use pricer_core::types::OptionKind;
//!
//! let kind: OptionKind = " Call ".parse().unwrap();
//! assert_eq!(kind, OptionKind::Call);
//!
//! let integrator = GaussKronrod::new(QuadratureConfig::default());
//! let area = integrator.integrate(|x| x * x, 0.0, 3.0).unwrap();
//! assert!((area.value - 9.0).abs() < 1e-9);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Enable serialisation for configuration and value types

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod math;
pub mod traits;
pub mod types;
