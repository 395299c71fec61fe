//! Serve command - live pipeline plus dashboard API until Ctrl-C

use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::server::DashboardServer;
use crate::services::LiveService;
use crate::state::AppState;

/// Arguments for the serve command
#[derive(Args, Default)]
pub struct ServeArgs {
    /// Override server.host
    #[arg(long)]
    pub host: Option<String>,

    /// Override server.port
    #[arg(long, short)]
    pub port: Option<u16>,
}

pub async fn execute(mut settings: Settings, args: ServeArgs) -> Result<()> {
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    // Initial fetch completes before anything can read the slot
    let state = Arc::new(AppState::from_settings(settings).await?);
    let tasks = LiveService::start(&state);

    let mut server = DashboardServer::new(state.clone());
    server
        .start(&state.settings.server)
        .await
        .context("Failed to start API server")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Received shutdown signal");

    server.stop().await;
    tasks.stop().await;
    info!("Shutdown complete");
    Ok(())
}
