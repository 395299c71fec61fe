//! Background tasks for the live pipeline
//!
//! - Refresh worker: fetches the live series on a fixed cadence, backing off
//!   after failures
//! - Render trigger: re-renders the live view on a short fixed tick

mod refresh;
mod render;

pub use refresh::RefreshWorker;
pub use render::RenderTrigger;

use std::future::Future;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Handle to a supervised background task
///
/// Dropping the handle signals the task to stop; [`TaskHandle::stop`] also
/// waits for it to finish.
pub struct TaskHandle {
    name: &'static str,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Spawn `task`, handing it the receiving end of the shutdown channel
    pub(crate) fn spawn<F, Fut>(name: &'static str, task: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(task(shutdown_rx));
        Self {
            name,
            shutdown_tx: Some(shutdown_tx),
            join: Some(join),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Signal the task and wait for it to exit
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!("{} exited abnormally: {}", self.name, e);
            }
        }
        info!("{} stopped", self.name);
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
