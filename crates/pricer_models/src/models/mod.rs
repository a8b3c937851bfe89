//! Stochastic models.
//!
//! - [`HestonParameters`]: validated (κ, θ, σ, ρ, v0)
//! - [`HestonCharacteristicFunction`]: characteristic function of ln S_T,
//!   evaluated per [`ProbabilityBranch`]

pub mod heston;

pub use heston::{HestonCharacteristicFunction, HestonParameters, ProbabilityBranch};
