//! Trading Core Binary
//!
//! Starts and stops the advisor fleet described by a configuration
//! file.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin trading-core -- start --config trading.toml
//! cargo run --bin trading-core -- stop --config trading.toml
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter (default: info)

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use trading_core::advisor::NoOpAdvisor;
use trading_core::bus::{EventBus, InProcessBus};
use trading_core::cli::{build_specs, format_config_error, format_started, format_stopped};
use trading_core::groups::{AdvisorSpec, GroupRegistry};
use trading_core::orderbook::{InMemoryOrderBook, InsideQuoteSource};
use trading_core::settings::RuntimeSettings;
use trading_core::supervisor::AdvisorsSupervisor;
use trading_core::telemetry::TelemetryHub;
use trading_core::{Advisor, AdvisorDeps};

/// Exit code for configuration parse failures.
const CONFIG_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(name = "trading-core", about = "Advisor fleet runtime")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the configured advisors and run until interrupted.
    Start {
        /// Path to the runtime configuration file.
        #[arg(long, default_value = "trading.toml")]
        config: PathBuf,
    },
    /// Stop advisors matching the configuration.
    Stop {
        /// Path to the runtime configuration file.
        #[arg(long, default_value = "trading.toml")]
        config: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn load_specs(config: &Path) -> Result<(RuntimeSettings, Vec<AdvisorSpec>), ExitCode> {
    let settings = match RuntimeSettings::load(config) {
        Ok(settings) => settings,
        Err(error) => {
            eprintln!("failed to load {}: {error}", config.display());
            return Err(ExitCode::from(CONFIG_FAILURE));
        }
    };

    let registry = GroupRegistry::new();
    match build_specs(&settings, &registry) {
        Ok(specs) => Ok((settings, specs)),
        Err(error) => {
            eprintln!("{}", format_config_error(&error));
            Err(ExitCode::from(CONFIG_FAILURE))
        }
    }
}

fn supervisor() -> AdvisorsSupervisor {
    let deps = AdvisorDeps {
        bus: Arc::new(InProcessBus::new()) as Arc<dyn EventBus>,
        books: Arc::new(InMemoryOrderBook::new()) as Arc<dyn InsideQuoteSource>,
        telemetry: Arc::new(TelemetryHub::new()),
    };
    AdvisorsSupervisor::new(deps).with_builder(
        "noop",
        Arc::new(|_spec: &AdvisorSpec| Box::new(NoOpAdvisor) as Box<dyn Advisor>),
    )
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Start { config } => {
            let (_settings, specs) = match load_specs(&config) {
                Ok(loaded) => loaded,
                Err(code) => return code,
            };

            let supervisor = supervisor();
            let summary = match supervisor.start(&specs) {
                Ok(summary) => summary,
                Err(error) => {
                    eprintln!("{error}");
                    return ExitCode::from(CONFIG_FAILURE);
                }
            };
            println!("{}", format_started(summary));

            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("shutdown signal unavailable, stopping");
            }
            let stopped = supervisor.shutdown().await;
            println!("{}", format_stopped(stopped));
            ExitCode::SUCCESS
        }
        Command::Stop { config } => {
            let (_settings, specs) = match load_specs(&config) {
                Ok(loaded) => loaded,
                Err(code) => return code,
            };

            let supervisor = supervisor();
            let stopped = supervisor.stop(&specs).await;
            println!("{}", format_stopped(stopped));
            ExitCode::SUCCESS
        }
    }
}
