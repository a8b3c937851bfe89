//! # Adapter Loader
//!
//! Moves option quotes between files and the pricing workspace.
//!
//! ## Input
//!
//! [`CsvQuoteSource`] reads exchange snapshots into a
//! [`QuoteSet`](pricer_models::instruments::QuoteSet). Row-level problems
//! (unknown option kind, unparseable numbers, missing volatility) reject the
//! row and are counted in a [`LoadReport`]; only I/O failures and missing
//! columns abort a load. See [`LoaderConfig`] for unit conversion, expiry
//! handling and the missing-volatility policy.
//!
//! ## Output
//!
//! - [`write_priced_csv`]: one row per quote, keyed by instrument id
//! - [`write_calibration_json`]: calibrated parameters and their provenance
//! - [`write_json`]: any serialisable report

#![deny(missing_docs)]

mod config;
mod error;
mod record;
mod source;
mod writer;

pub use config::{LoaderConfig, MissingVolatility, PriceUnit};
pub use error::LoaderError;
pub use record::QuoteRecord;
pub use source::{CsvQuoteSource, LoadReport, LoadedQuotes, QuoteSource, RowRejection};
pub use writer::{
    write_calibration_json, write_json, write_priced_csv, CalibrationRecord, ExcludedRecord,
    PricedRow,
};
