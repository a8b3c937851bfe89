//! optpricer - European option pricing from the command line
//!
//! Loads option quotes from CSV, prices them with Black-Scholes and a
//! calibrated Heston model, and compares both against market.
//!
//! # Commands
//!
//! - `optpricer price --input <csv> --output <csv>` - Price quotes with one or both models
//! - `optpricer calibrate --input <csv>` - Calibrate Heston parameters
//! - `optpricer compare --input <csv>` - Error statistics of both models against market
//! - `optpricer check` - Validate and print the effective configuration
//!
//! # Architecture
//!
//! As the service layer, this crate wires `adapter_loader` (I/O) to the
//! `pricer_*` crates (computation). It owns no pricing logic.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;

pub use crate::config::AppConfig;
pub use crate::error::{CliError, Result};

/// European option pricer (Black-Scholes and Heston)
#[derive(Parser)]
#[command(name = "optpricer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "optpricer.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Models a pricing run applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelChoice {
    /// Black-Scholes only
    BlackScholes,
    /// Calibrated Heston only
    Heston,
    /// Both models
    Both,
}

impl ModelChoice {
    fn black_scholes(self) -> bool {
        matches!(self, ModelChoice::BlackScholes | ModelChoice::Both)
    }

    fn heston(self) -> bool {
        matches!(self, ModelChoice::Heston | ModelChoice::Both)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Price option quotes
    Price {
        /// Quote CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Priced-quote CSV output
        #[arg(short, long)]
        output: PathBuf,

        /// Models to apply
        #[arg(short, long, value_enum, default_value = "both")]
        model: ModelChoice,

        /// Write the Heston calibration as JSON here
        #[arg(long)]
        calibration_output: Option<PathBuf>,
    },

    /// Calibrate Heston parameters to market quotes
    Calibrate {
        /// Quote CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Calibration JSON output
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured fixed rate
        #[arg(long)]
        rate: Option<f64>,
    },

    /// Compare Black-Scholes and Heston errors against market
    Compare {
        /// Quote CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Comparison JSON output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate and print the effective configuration
    Check,
}

fn init_tracing(verbose: u8, config_level: &str) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    init_tracing(cli.verbose, &config.log_level);
    debug!(path = %cli.config.display(), "configuration loaded");

    match cli.command {
        Commands::Price {
            input,
            output,
            model,
            calibration_output,
        } => commands::price::run(&config, &input, &output, model, calibration_output.as_deref()),
        Commands::Calibrate {
            input,
            output,
            rate,
        } => commands::calibrate::run(&config, &input, output.as_deref(), rate),
        Commands::Compare { input, output } => {
            commands::compare::run(&config, &input, output.as_deref())
        }
        Commands::Check => {
            info!("Checking configuration...");
            commands::check::run(&config)
        }
    }
}
