//! Application configuration.
//!
//! Layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`optpricer.toml` unless `--config` says otherwise; optional)
//! 3. Environment variables `OPTPRICER__<SECTION>__<KEY>`, e.g.
//!    `OPTPRICER__PRICING__R_FIXED=0.03`

use std::path::Path;

use adapter_loader::LoaderConfig;
use ::config::{Config, Environment, File, FileFormat};
use pricer_models::analytical::BlackScholesConfig;
use pricer_models::calibration::HestonCalibratorConfig;
use pricer_pricing::{BatchConfig, PostProcessConfig, UniverseFilter};
use serde::{Deserialize, Serialize};

use crate::{CliError, Result};

const ENV_PREFIX: &str = "OPTPRICER";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Pricing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSection {
    /// Rate used for Heston calibration and pricing.
    pub r_fixed: f64,
    /// Black-Scholes pricer settings.
    pub black_scholes: BlackScholesConfig,
    /// Batch execution.
    pub batch: BatchConfig,
}

impl Default for PricingSection {
    fn default() -> Self {
        Self {
            r_fixed: 0.045,
            black_scholes: BlackScholesConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

/// Universe windows per model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSection {
    /// Window for Heston calibration and pricing.
    pub heston: UniverseFilter,
    /// Window for Black-Scholes pricing.
    pub black_scholes: UniverseFilter,
}

impl Default for UniverseSection {
    fn default() -> Self {
        Self {
            heston: UniverseFilter::heston(),
            black_scholes: UniverseFilter::black_scholes(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default log level when neither `RUST_LOG` nor `-v` is given.
    pub log_level: String,
    /// Quote loading.
    pub loader: LoaderConfig,
    /// Pricing.
    pub pricing: PricingSection,
    /// Universe filters.
    pub universe: UniverseSection,
    /// Heston calibration.
    pub calibration: HestonCalibratorConfig,
    /// Heston post-processing.
    pub postprocess: PostProcessConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            loader: LoaderConfig::default(),
            pricing: PricingSection::default(),
            universe: UniverseSection::default(),
            calibration: HestonCalibratorConfig::default(),
            postprocess: PostProcessConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build from defaults, the optional TOML file at `path` and the
    /// environment, then validate.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section; all problems are reported together.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "invalid log_level '{}', expected one of {:?}",
                self.log_level, LOG_LEVELS
            ));
        }
        if !self.pricing.r_fixed.is_finite() {
            errors.push(format!("r_fixed must be finite, got {}", self.pricing.r_fixed));
        }
        if !(self.pricing.black_scholes.put_floor_threshold >= 0.0) {
            errors.push(format!(
                "put_floor_threshold must be non-negative, got {}",
                self.pricing.black_scholes.put_floor_threshold
            ));
        }
        if let Err(e) = self.loader.validate() {
            errors.push(e);
        }
        for result in [
            self.universe.heston.validate(),
            self.universe.black_scholes.validate(),
            self.postprocess.validate(),
        ] {
            if let Err(e) = result {
                errors.push(e.to_string());
            }
        }
        if let Err(e) = self.calibration.validate() {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CliError::Config(errors.join("; ")))
        }
    }
}
