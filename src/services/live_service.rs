//! Live Service
//!
//! Wires the refresh worker and the render trigger to the shared state.

use crate::market::InstrumentFeed;
use crate::scheduler::{RefreshWorker, RenderTrigger, TaskHandle};
use crate::state::AppState;
use crate::view::LiveView;
use std::sync::Arc;
use tracing::info;

/// Running live-pipeline tasks
pub struct LiveTasks {
    pub refresh: TaskHandle,
    pub render: TaskHandle,
}

impl LiveTasks {
    /// Stop both tasks, producer first
    pub async fn stop(self) {
        self.refresh.stop().await;
        self.render.stop().await;
    }
}

/// Live service for business logic
pub struct LiveService;

impl LiveService {
    /// Start the refresh worker and the render trigger
    ///
    /// The slot already holds the initial series, so the first render never
    /// waits on the network.
    pub fn start(state: &AppState) -> LiveTasks {
        let live = &state.settings.live;
        info!(
            "Starting live pipeline for {} ({} / {})",
            live.symbol, live.interval, live.period
        );

        let feed = InstrumentFeed::new(state.adapter.clone(), live.fetch_request());
        let refresh = RefreshWorker::new(
            Arc::new(feed),
            state.live.clone(),
            live.refresh_interval(),
            live.backoff_interval(),
        )
        .start();

        let render = RenderTrigger::new(
            state.live.clone(),
            live.clone(),
            live.render_interval(),
            state.live_view.clone(),
        )
        .start();

        LiveTasks { refresh, render }
    }

    /// Latest rendered live view
    pub fn current_view(state: &AppState) -> LiveView {
        state.current_view()
    }
}
