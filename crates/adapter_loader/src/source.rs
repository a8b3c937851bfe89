//! Quote sources.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Utc;
use pricer_core::types::OptionKind;
use pricer_models::instruments::QuoteSet;
use tracing::{debug, info, warn};

use crate::config::{LoaderConfig, MissingVolatility};
use crate::error::LoaderError;
use crate::record::{median, QuoteRecord};

/// Columns every input must carry, each with the names it may appear under.
const REQUIRED_COLUMNS: [(&str, &[&str]); 5] = [
    ("instrument_id", &["instrument_id", "instrument_name"]),
    ("spot", &["spot", "spot_price"]),
    ("strike", &["strike", "strike_price"]),
    ("kind", &["kind", "option_type"]),
    ("volatility", &["volatility", "implied_volatility"]),
];

const EXPIRY_COLUMNS: [&str; 3] = ["time_to_expiry", "expiration_timestamp", "expiration_date"];

/// A row that did not become a quote.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRejection {
    /// One-based line number.
    pub line: u64,
    /// Instrument id, when the row got far enough to have one.
    pub instrument_id: Option<String>,
    /// Why the row was rejected.
    pub reason: String,
}

/// Counts from one load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Data rows read.
    pub rows: usize,
    /// Quotes produced.
    pub loaded: usize,
    /// Rows whose volatility was filled with the median.
    pub volatility_filled: usize,
    /// Rejected rows, in file order.
    pub rejected: Vec<RowRejection>,
}

/// Quotes plus the report describing how they were obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedQuotes {
    /// Loaded quotes in file order.
    pub quotes: QuoteSet,
    /// Load statistics.
    pub report: LoadReport,
}

/// Producer of quote sets.
pub trait QuoteSource {
    /// Read every available quote.
    fn load(&self) -> Result<LoadedQuotes, LoaderError>;
}

/// CSV file source.
#[derive(Debug, Clone)]
pub struct CsvQuoteSource {
    path: PathBuf,
    config: LoaderConfig,
}

impl CsvQuoteSource {
    /// Source reading `path` with `config`.
    pub fn new(path: impl Into<PathBuf>, config: LoaderConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    /// File being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse CSV from any reader.
    pub fn read_from<R: Read>(reader: R, config: &LoaderConfig) -> Result<LoadedQuotes, LoaderError> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        check_headers(csv.headers()?)?;

        let mut report = LoadReport::default();
        let mut records = Vec::new();
        for result in csv.deserialize::<QuoteRecord>() {
            report.rows += 1;
            // Header is line 1
            let line = report.rows as u64 + 1;
            match result {
                Ok(record) => records.push((line, record)),
                Err(e) if matches!(e.kind(), csv::ErrorKind::Deserialize { .. }) => {
                    report.rejected.push(RowRejection {
                        line,
                        instrument_id: None,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        let fill = match config.missing_volatility {
            MissingVolatility::Reject => None,
            MissingVolatility::FillMedian => {
                // Rows with an unknown kind are rejected below and do not contribute
                let vols: Vec<f64> = records
                    .iter()
                    .filter(|(_, r)| r.kind.parse::<OptionKind>().is_ok())
                    .filter_map(|(_, r)| r.finite_volatility())
                    .collect();
                median(&vols)
            }
        };
        if let Some(fill) = fill {
            debug!(fill, "filling missing implied volatility with median");
        }

        let valuation = config.valuation_time.unwrap_or_else(Utc::now);
        let mut quotes = Vec::with_capacity(records.len());
        for (line, record) in records {
            let id = record.instrument_id.clone();
            let filled = record.finite_volatility().is_none();
            match record.into_quote(line, config, valuation, fill) {
                Ok(quote) => {
                    if filled {
                        report.volatility_filled += 1;
                    }
                    quotes.push(quote);
                }
                Err(e) => {
                    debug!(line, instrument_id = %id, error = %e, "row rejected");
                    report.rejected.push(RowRejection {
                        line,
                        instrument_id: Some(id),
                        reason: e.to_string(),
                    });
                }
            }
        }
        report.rejected.sort_by_key(|r| r.line);
        report.loaded = quotes.len();

        if !report.rejected.is_empty() {
            warn!(rejected = report.rejected.len(), rows = report.rows, "rows rejected during load");
        }
        Ok(LoadedQuotes {
            quotes: QuoteSet::new(quotes),
            report,
        })
    }
}

impl QuoteSource for CsvQuoteSource {
    fn load(&self) -> Result<LoadedQuotes, LoaderError> {
        let file = std::fs::File::open(&self.path)?;
        let loaded = Self::read_from(file, &self.config)?;
        info!(
            path = %self.path.display(),
            rows = loaded.report.rows,
            loaded = loaded.report.loaded,
            "quotes loaded"
        );
        Ok(loaded)
    }
}

fn check_headers(headers: &csv::StringRecord) -> Result<(), LoaderError> {
    let has = |name: &str| headers.iter().any(|h| h == name);
    for (canonical, names) in REQUIRED_COLUMNS {
        if !names.iter().any(|n| has(n)) {
            return Err(LoaderError::MissingColumn(canonical.to_string()));
        }
    }
    if !EXPIRY_COLUMNS.iter().any(|n| has(n)) {
        return Err(LoaderError::MissingColumn(
            "time_to_expiry, expiration_timestamp or expiration_date".to_string(),
        ));
    }
    Ok(())
}
