pub mod config;
pub mod logging_system;
pub mod pipeline;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use logging_system::{LoggingError, init_logging};
pub use pipeline::{Pipeline, RunError, RunReport, RunStage};

use crate::fetcher::GoogleTrendsClient;
use crate::presenter::WorkbookPresenter;
use crate::store::WorkbookStore;
use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

pub struct App {
    config: Config,
    pipeline: Pipeline,
}

impl App {
    /// Wires the Google Trends client and the workbook store described by `config`.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let client = GoogleTrendsClient::new(config.google_config())
            .context("failed to build trends client")?;
        let store = WorkbookStore::new(config.output_path());
        let presenter = WorkbookPresenter::new(store.clone());

        let pipeline = Pipeline::new(
            Arc::new(client),
            Arc::new(store),
            Arc::new(presenter),
            config.trends_request(),
            config.sheet.clone(),
        );

        Ok(Self { config, pipeline })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one pull and reports the outcome on the status log.
    pub async fn run(&self) -> ExitCode {
        info!("Starting Google Trends data pull...");
        info!("Queries: {}", self.config.terms().join(", "));

        match self.pipeline.run().await {
            Ok(report) => {
                log_success(&report);
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("ERROR: {err}");
                error!("Error type: {} ({})", err.kind(), err.category());
                ExitCode::FAILURE
            }
        }
    }
}

fn log_success(report: &RunReport) {
    info!("SUCCESS!");
    info!("File saved to: {}", report.location);
    if let Some((first, last)) = report.fetched_range {
        info!("Date range: {first} to {last}");
    }
    info!("Total records in file: {}", report.total_rows);
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<ExitCode> {
    let config = match Config::from_args(std::env::args_os()) {
        Ok(config) => config,
        // --help, --version, and usage errors print and exit the way clap does
        Err(ConfigError::Cli(err)) => err.exit(),
        Err(err) => return Err(err).context("invalid configuration"),
    };

    init_logging(config.log_level, config.log_format).context("failed to initialize logging")?;

    let app = App::from_config(config)?;
    Ok(app.run().await)
}
