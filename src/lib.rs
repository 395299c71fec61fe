//! Stockcast - live price dashboard with forecasting and a market assistant
//!
//! Two pipelines share one process:
//! - Live refresh: a supervised worker re-fetches a short-interval series
//!   into a shared slot while a render trigger republishes the view
//! - Forecast and assistant: per-request history fit and projection, plus
//!   per-session chat with a web-search-enabled reasoning service

pub mod assistant;
pub mod cli;
pub mod config;
pub mod error;
pub mod forecast;
pub mod market;
pub mod scheduler;
pub mod server;
pub mod services;
pub mod state;
pub mod view;

use anyhow::Context;
use clap::Parser;
use crate::cli::{Cli, Commands};
use crate::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse arguments, load settings and run the selected command
pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stockcast=debug,stockcast_lib=debug,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config_dir).with_context(|| {
        format!("Failed to load settings from {}", cli.config_dir.display())
    })?;

    tracing::info!("Starting Stockcast...");

    match cli.command.unwrap_or_default() {
        Commands::Serve(args) => cli::serve::execute(settings, args).await,
        Commands::Forecast(args) => cli::forecast::execute(settings, args).await,
        Commands::Chat => cli::chat::execute(settings).await,
        Commands::Snapshot(args) => cli::snapshot::execute(settings, args).await,
    }
}
