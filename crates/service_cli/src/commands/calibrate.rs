//! Calibrate command implementation
//!
//! Fits Heston parameters to the quotes of the Heston universe.

use std::fs::File;
use std::path::Path;

use adapter_loader::write_calibration_json;
use tracing::info;

use super::pipeline;
use crate::{AppConfig, CliError, Result};

/// Run the calibrate command
pub fn run(config: &AppConfig, input: &Path, output: Option<&Path>, rate: Option<f64>) -> Result<()> {
    info!("Starting calibration...");
    info!("  Input: {}", input.display());

    let r_fixed = match rate {
        Some(r) if !r.is_finite() => {
            return Err(CliError::InvalidArgument(format!(
                "rate must be finite, got {}",
                r
            )))
        }
        Some(r) => r,
        None => config.pricing.r_fixed,
    };

    let quotes = pipeline::load(config, input)?;
    let result = pipeline::calibrate(config, &quotes, r_fixed)?;

    match output {
        Some(path) => {
            write_calibration_json(File::create(path)?, &result)?;
            let p = &result.params;
            println!("path       {}", result.path.label());
            println!("kappa      {:.6}", p.kappa());
            println!("theta      {:.6}", p.theta());
            println!("rho        {:.6}", p.rho());
            println!("v0         {:.6}", p.v0());
            println!("objective  {:.6e}", result.objective);
            println!("quotes     {}", result.quotes_used);
            info!("Writing calibrated parameters to: {}", path.display());
        }
        None => {
            write_calibration_json(std::io::stdout().lock(), &result)?;
            println!();
        }
    }

    info!("Calibration complete");
    Ok(())
}
