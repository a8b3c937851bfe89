//! File-level loading and writing through temporary directories.

use std::io::Write;

use adapter_loader::{
    write_json, write_priced_csv, CsvQuoteSource, LoaderConfig, LoaderError, MissingVolatility,
    PriceUnit, QuoteSource,
};
use approx::assert_relative_eq;
use chrono::{TimeZone, Utc};
use pricer_core::types::OptionKind;

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn test_exchange_export_with_inverse_prices() {
    let dir = tempfile::tempdir().unwrap();
    let valuation = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let expiry = valuation + chrono::Duration::days(146);
    let content = format!(
        "instrument_name,spot_price,strike_price,option_type,implied_volatility,real_market_price,expiration_date\n\
         BTC-A-C,60000,65000,Call,0.62,0.04,{secs}\n\
         BTC-A-P,60000,55000,PUT ,,0.03,{secs}\n\
         BTC-A-X,60000,60000,future,0.55,0.05,{secs}\n",
        secs = expiry.timestamp()
    );
    let path = write_file(&dir, "deribit.csv", &content);

    let config = LoaderConfig {
        market_price_unit: PriceUnit::Underlying,
        missing_volatility: MissingVolatility::FillMedian,
        valuation_time: Some(valuation),
        ..Default::default()
    };
    let loaded = CsvQuoteSource::new(&path, config).load().unwrap();

    assert_eq!(loaded.report.rows, 3);
    assert_eq!(loaded.report.loaded, 2);
    assert_eq!(loaded.report.rejected.len(), 1);
    assert_eq!(
        loaded.report.rejected[0].instrument_id.as_deref(),
        Some("BTC-A-X")
    );

    let call = loaded.quotes.get("BTC-A-C").unwrap();
    assert_eq!(call.kind, OptionKind::Call);
    assert_relative_eq!(call.time_to_expiry, 0.4);
    assert_relative_eq!(call.market_price.unwrap(), 2_400.0);

    // The future row is rejected, so only the call's 0.62 feeds the median
    let put = loaded.quotes.get("BTC-A-P").unwrap();
    assert_eq!(put.kind, OptionKind::Put);
    assert_relative_eq!(put.volatility, 0.62);
    assert_relative_eq!(put.time_to_expiry, 0.4);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = CsvQuoteSource::new(dir.path().join("absent.csv"), LoaderConfig::default());
    assert!(matches!(source.load(), Err(LoaderError::Io(_))));
}

#[test]
fn test_loaded_quotes_write_back_keyed_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "quotes.csv",
        "instrument_id,spot,strike,kind,volatility,market_price,time_to_expiry,rate\n\
         A,100,100,call,0.2,10.45,1.0,0.05\n\
         B,100,120,put,0.25,,0.5,\n",
    );
    let mut loaded = CsvQuoteSource::new(&path, LoaderConfig::default())
        .load()
        .unwrap();
    assert_eq!(loaded.quotes.get("B").unwrap().rate, 0.045);
    assert!(loaded.quotes.get("B").unwrap().market_price.is_none());

    loaded.quotes.quotes_mut()[0].bs_price = Some(10.4506);

    let out = dir.path().join("priced.csv");
    write_priced_csv(std::fs::File::create(&out).unwrap(), &loaded.quotes).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("A,call,"));
    assert!(rows[1].contains("10.4506"));
    assert!(rows[2].ends_with(",,,"));

    let json_path = dir.path().join("report.json");
    write_json(&json_path, &vec!["A", "B"]).unwrap();
    let back: Vec<String> =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(back, vec!["A", "B"]);
}
