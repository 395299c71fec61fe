//! Command-line interface
//!
//! Provides commands for:
//! - `serve`: Run the live pipeline and the dashboard API (default)
//! - `forecast`: Print a one-shot forecast for an instrument
//! - `chat`: Interactive assistant session on stdin/stdout
//! - `snapshot`: Fetch the live instrument once and print the view

pub mod chat;
pub mod forecast;
pub mod serve;
pub mod snapshot;

use crate::config::Settings;
use crate::market::yahoo::YahooSource;
use crate::market::DataSource;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Stockcast CLI
#[derive(Parser)]
#[command(name = "stockcast")]
#[command(about = "Live price dashboard with forecasting and a market assistant")]
#[command(version)]
pub struct Cli {
    /// Directory holding default/<RUN_MODE>/local settings files
    #[arg(long, global = true, default_value = "config", env = "STOCKCAST_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the live pipeline and serve the dashboard API
    Serve(serve::ServeArgs),
    /// Forecast one instrument and print the result
    Forecast(forecast::ForecastArgs),
    /// Chat with the market assistant
    Chat,
    /// Fetch the live instrument once and print the rendered view
    Snapshot(snapshot::SnapshotArgs),
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve(serve::ServeArgs::default())
    }
}

/// Default data source for one-shot commands
fn data_source(settings: &Settings) -> crate::error::Result<Arc<dyn DataSource>> {
    Ok(Arc::new(YahooSource::new(&settings.data_source)?))
}
