//! # Pricer Pricing (Layer 3: Pipeline)
//!
//! Runs the pricing models of `pricer_models` over whole quote sets.
//!
//! ## Stages
//!
//! ```text
//! QuoteSet ──► universe ──► batch (Black-Scholes | Heston) ──► postprocess ──► comparison
//! ```
//!
//! - [`universe`]: expiry and moneyness windows per model
//! - [`batch`]: pricing passes with per-quote failure accounting
//! - [`postprocess`]: deep-OTM dampening, outlier rejection, missing-price removal
//! - [`comparison`]: absolute-error statistics against market
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialisation of configs and reports
//! - `parallel`: per-quote pricing and calibration residuals on the rayon
//!   pool; outputs are identical to the sequential path

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod batch;
pub mod comparison;
pub mod error;
pub mod postprocess;
pub mod universe;

pub use batch::{price_black_scholes, price_heston, BatchConfig, PassReport, QuoteFailure};
pub use comparison::{ErrorSummary, ModelComparison};
pub use error::PipelineError;
pub use postprocess::{PostProcessConfig, PostProcessReport, PostProcessor};
pub use universe::{FilterReport, UniverseFilter};
