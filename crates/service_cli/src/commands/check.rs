//! Check command implementation
//!
//! Loading already validated the configuration; this prints the effective
//! values so file and environment overrides can be inspected.

use tracing::info;

use crate::{AppConfig, CliError, Result};

/// Run the check command
pub fn run(config: &AppConfig) -> Result<()> {
    let rendered =
        toml::to_string_pretty(config).map_err(|e| CliError::Config(e.to_string()))?;
    println!("{}", rendered);

    #[cfg(feature = "parallel")]
    info!("Parallel pricing enabled");
    #[cfg(not(feature = "parallel"))]
    info!("Parallel pricing disabled");

    info!("Configuration OK");
    Ok(())
}
