//! Periodic live-view re-render
//!
//! Every tick reads whatever the live slot holds and publishes a freshly
//! rendered view, whether or not the data changed. It never waits on the
//! network.

use super::TaskHandle;
use crate::config::LiveSettings;
use crate::state::LiveSlot;
use crate::view::{render_live, LiveView};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Fixed-period trigger that keeps the published view in step with the slot
pub struct RenderTrigger {
    slot: Arc<LiveSlot>,
    settings: LiveSettings,
    period: Duration,
    views: watch::Sender<LiveView>,
}

impl RenderTrigger {
    pub fn new(
        slot: Arc<LiveSlot>,
        settings: LiveSettings,
        period: Duration,
        views: watch::Sender<LiveView>,
    ) -> Self {
        Self {
            slot,
            settings,
            period,
            views,
        }
    }

    pub fn start(self) -> TaskHandle {
        TaskHandle::spawn("Render trigger", move |shutdown| self.run(shutdown))
    }

    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        info!("Render trigger started (every {}s)", self.period.as_secs());

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.render_once(),
            }
        }
    }

    fn render_once(&self) {
        let snapshot = self.slot.snapshot();
        let view = render_live(&snapshot, &self.settings, Utc::now());
        self.views.send_replace(view);
        debug!("Rendered live view (version {})", snapshot.version);
    }
}
