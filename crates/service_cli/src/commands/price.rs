//! Price command implementation
//!
//! Loads quotes, applies the requested models and writes one CSV row per
//! quote.

use std::fs::File;
use std::path::Path;

use adapter_loader::{write_calibration_json, write_priced_csv};
use tracing::info;

use super::pipeline;
use crate::{AppConfig, CliError, ModelChoice, Result};

/// Run the price command
pub fn run(
    config: &AppConfig,
    input: &Path,
    output: &Path,
    model: ModelChoice,
    calibration_output: Option<&Path>,
) -> Result<()> {
    info!("Starting pricing...");
    info!("  Input: {}", input.display());
    info!("  Models: {:?}", model);

    if calibration_output.is_some() && !model.heston() {
        return Err(CliError::InvalidArgument(
            "--calibration-output needs the heston model".to_string(),
        ));
    }

    let quotes = pipeline::load(config, input)?;
    let priced = pipeline::price(config, &quotes, model)?;

    write_priced_csv(File::create(output)?, &priced.quotes)?;
    info!("Priced quotes written to: {}", output.display());

    if let (Some(path), Some(calibration)) = (calibration_output, priced.calibration.as_ref()) {
        write_calibration_json(File::create(path)?, calibration)?;
        info!("Calibration written to: {}", path.display());
    }

    info!("Pricing complete");
    Ok(())
}
