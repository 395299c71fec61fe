//! Snapshot command - one live fetch, printed as the rendered view

use anyhow::Result;
use clap::Args;

use crate::config::Settings;
use crate::market::FetchAdapter;
use crate::state::AppState;
use crate::view::live_text;

/// Arguments for the snapshot command
#[derive(Args)]
pub struct SnapshotArgs {
    /// Number of most recent bars to print
    #[arg(long, short, default_value_t = 10)]
    pub rows: usize,
}

pub async fn execute(settings: Settings, args: SnapshotArgs) -> Result<()> {
    let source = super::data_source(&settings)?;
    let series = FetchAdapter::new(source.clone())
        .fetch(&settings.live.fetch_request())
        .await;

    let state = AppState::new(settings, source, series);
    println!("{}", live_text(&state.current_view(), args.rows));
    Ok(())
}
