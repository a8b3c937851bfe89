//! Compare command implementation
//!
//! Prices with both models and summarises their absolute errors against
//! market, over quotes carrying all three prices.

use std::path::Path;

use adapter_loader::write_json;
use pricer_pricing::{ErrorSummary, ModelComparison};
use tracing::info;

use super::pipeline;
use crate::{AppConfig, ModelChoice, Result};

/// Run the compare command
pub fn run(config: &AppConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    info!("Starting model comparison...");

    let quotes = pipeline::load(config, input)?;
    let priced = pipeline::price(config, &quotes, ModelChoice::Both)?;
    let comparison = ModelComparison::from_quotes(&priced.quotes);

    print!("{}", render(&comparison));

    if let Some(path) = output {
        write_json(path, &comparison)?;
    }

    info!("Comparison complete");
    Ok(())
}

fn render(comparison: &ModelComparison) -> String {
    let (Some(bs), Some(heston)) = (comparison.black_scholes, comparison.heston) else {
        return format!(
            "No quote carries market, Black-Scholes and Heston prices ({} incomplete)\n",
            comparison.incomplete
        );
    };

    let rows: [(&str, fn(&ErrorSummary) -> f64); 8] = [
        ("count", |s| s.count as f64),
        ("mean", |s| s.mean),
        ("std", |s| s.std),
        ("min", |s| s.min),
        ("25%", |s| s.q25),
        ("50%", |s| s.median),
        ("75%", |s| s.q75),
        ("max", |s| s.max),
    ];
    let mut out = format!("{:<8}{:>16}{:>16}\n", "", "error_bs", "error_heston");
    for (label, field) in rows {
        out.push_str(&format!(
            "{:<8}{:>16.6}{:>16.6}\n",
            label,
            field(&bs),
            field(&heston)
        ));
    }
    if let Some(better) = comparison.better_model() {
        out.push_str(&format!("\nlower mean error: {}\n", better));
    }
    out
}
