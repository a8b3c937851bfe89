//! Closed-form and semi-analytical pricing of European options.
//!
//! - Black-Scholes closed form with a configurable out-of-the-money put floor
//! - Heston semi-analytical pricing by Fourier inversion of the
//!   characteristic function
//! - Standard normal CDF/PDF

pub mod black_scholes;
pub mod distributions;
pub mod error;
pub mod heston;

pub use black_scholes::{
    black_scholes_price, BlackScholesConfig, BlackScholesInputs, BlackScholesPricer,
};
pub use distributions::{norm_cdf, norm_pdf};
pub use error::AnalyticalError;
pub use heston::{HestonPricer, HestonPricerConfig};
