//! # Pricer Models (L2: Business Logic)
//!
//! Option quotes, pricing models and calibration.
//!
//! This crate provides:
//! - [`instruments`]: `OptionQuote` and the ordered `QuoteSet`
//! - [`analytical`]: Black-Scholes closed form and the Heston Fourier pricer
//! - [`models`]: Heston parameters and characteristic function
//! - [`calibration`]: Heston calibration with fallback parameters
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialisation of quotes and configuration
//! - `parallel`: per-quote calibration residuals on the rayon pool; the
//!   objective is still summed in quote order, so results do not change

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod analytical;
pub mod calibration;
pub mod instruments;
pub mod models;
