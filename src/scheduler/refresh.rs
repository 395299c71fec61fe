//! Live refresh worker
//!
//! Runs for the life of the process. Each cycle fetches the live series and,
//! when the result holds data, publishes it to the live slot. A cycle that
//! errors or panics is logged and retried after the shorter backoff delay;
//! the loop never exits on its own.

use super::TaskHandle;
use crate::error::Result;
use crate::market::SeriesFetcher;
use crate::state::LiveSlot;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// What one refresh cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    /// Non-empty series published under this version
    Published { bars: usize, version: u64 },
    /// Fetch returned nothing; previous series kept
    NoData,
}

/// Supervised loop that keeps the live slot current
pub struct RefreshWorker {
    fetcher: Arc<dyn SeriesFetcher>,
    slot: Arc<LiveSlot>,
    cadence: Duration,
    backoff: Duration,
}

impl RefreshWorker {
    pub fn new(
        fetcher: Arc<dyn SeriesFetcher>,
        slot: Arc<LiveSlot>,
        cadence: Duration,
        backoff: Duration,
    ) -> Self {
        Self {
            fetcher,
            slot,
            cadence,
            backoff,
        }
    }

    /// Spawn the loop; the first cycle runs immediately
    pub fn start(self) -> TaskHandle {
        TaskHandle::spawn("Refresh worker", move |shutdown| self.run(shutdown))
    }

    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        info!(
            "Background worker started (every {}s, backoff {}s)",
            self.cadence.as_secs(),
            self.backoff.as_secs()
        );

        loop {
            let outcome = tokio::select! {
                _ = &mut shutdown => break,
                outcome = AssertUnwindSafe(self.cycle()).catch_unwind() => outcome,
            };

            let delay = match outcome {
                Ok(Ok(CycleOutcome::Published { bars, version })) => {
                    info!("Data refreshed successfully ({} bars, version {})", bars, version);
                    self.cadence
                }
                Ok(Ok(CycleOutcome::NoData)) => {
                    debug!("Refresh returned no data, keeping previous series");
                    self.cadence
                }
                Ok(Err(e)) => {
                    error!("Worker error: {}", e);
                    self.backoff
                }
                Err(panic) => {
                    error!("Worker error: fetch panicked: {}", panic_message(panic.as_ref()));
                    self.backoff
                }
            };

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn cycle(&self) -> Result<CycleOutcome> {
        let series = self.fetcher.fetch_series().await?;
        if series.is_empty() {
            return Ok(CycleOutcome::NoData);
        }

        let bars = series.len();
        let version = self.slot.publish(series);
        Ok(CycleOutcome::Published { bars, version })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::market::types::{Bar, PriceSeries};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    const CADENCE: Duration = Duration::from_secs(300);
    const BACKOFF: Duration = Duration::from_secs(60);

    fn series(close: f64) -> PriceSeries {
        PriceSeries::from_bars(
            "TEST",
            vec![Bar {
                timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1,
            }],
        )
    }

    /// Behaviour of each scripted call
    #[derive(Clone)]
    enum Step {
        Data(f64),
        Empty,
        Fail,
        Panic,
    }

    /// Fetcher that plays a script, repeating its last step forever
    struct ScriptedFetcher {
        script: Vec<Step>,
        calls: AtomicUsize,
        call_times: Mutex<Vec<Instant>>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
                call_times: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn gaps(&self) -> Vec<Duration> {
            let times = self.call_times.lock();
            times.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    #[async_trait]
    impl SeriesFetcher for ScriptedFetcher {
        async fn fetch_series(&self) -> Result<PriceSeries> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_times.lock().push(Instant::now());
            let step = self.script[n.min(self.script.len() - 1)].clone();
            match step {
                Step::Data(close) => Ok(series(close)),
                Step::Empty => Ok(PriceSeries::empty("TEST")),
                Step::Fail => Err(AppError::DataSource("upstream down".into())),
                Step::Panic => panic!("fetcher exploded"),
            }
        }
    }

    fn worker(fetcher: Arc<ScriptedFetcher>, slot: Arc<LiveSlot>) -> RefreshWorker {
        RefreshWorker::new(fetcher, slot, CADENCE, BACKOFF)
    }

    fn within(gap: Duration, expected: Duration) -> bool {
        gap >= expected && gap <= expected + Duration::from_millis(5)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_publishes_within_one_cycle() {
        let slot = Arc::new(LiveSlot::new(PriceSeries::empty("TEST")));
        let fetcher = ScriptedFetcher::new(vec![Step::Data(101.0)]);
        let handle = worker(fetcher.clone(), slot.clone()).start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(slot.series().last().unwrap().close, 101.0);
        assert_eq!(slot.version(), 1);

        tokio::time::sleep(CADENCE).await;
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(slot.version(), 2);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_retry_at_backoff_and_never_write() {
        let slot = Arc::new(LiveSlot::new(series(50.0)));
        let fetcher = ScriptedFetcher::new(vec![Step::Fail]);
        let handle = worker(fetcher.clone(), slot.clone()).start();

        tokio::time::sleep(BACKOFF * 5 + Duration::from_secs(1)).await;

        assert_eq!(fetcher.calls(), 6);
        assert!(fetcher.gaps().iter().all(|g| within(*g, BACKOFF)));
        assert_eq!(slot.version(), 0);
        assert_eq!(slot.series().last().unwrap().close, 50.0);
        assert!(handle.is_running());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_is_contained_and_retried() {
        let slot = Arc::new(LiveSlot::new(PriceSeries::empty("TEST")));
        let fetcher = ScriptedFetcher::new(vec![Step::Panic, Step::Data(7.0)]);
        let handle = worker(fetcher.clone(), slot.clone()).start();

        tokio::time::sleep(BACKOFF + Duration::from_secs(1)).await;

        assert_eq!(fetcher.calls(), 2);
        assert!(within(fetcher.gaps()[0], BACKOFF));
        assert_eq!(slot.series().last().unwrap().close, 7.0);
        assert!(handle.is_running());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_keeps_previous_series() {
        let slot = Arc::new(LiveSlot::new(PriceSeries::empty("TEST")));
        let fetcher = ScriptedFetcher::new(vec![Step::Data(10.0), Step::Empty]);
        let handle = worker(fetcher.clone(), slot.clone()).start();

        tokio::time::sleep(CADENCE * 2 + Duration::from_secs(1)).await;

        assert_eq!(fetcher.calls(), 3);
        // Empty results use the normal cadence, not the backoff
        assert!(fetcher.gaps().iter().all(|g| within(*g, CADENCE)));
        assert_eq!(slot.version(), 1);
        assert_eq!(slot.series().last().unwrap().close, 10.0);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_after_failure_returns_to_cadence() {
        let slot = Arc::new(LiveSlot::new(PriceSeries::empty("TEST")));
        let fetcher = ScriptedFetcher::new(vec![Step::Fail, Step::Data(1.0), Step::Data(2.0)]);
        let handle = worker(fetcher.clone(), slot.clone()).start();

        tokio::time::sleep(BACKOFF + CADENCE + Duration::from_secs(1)).await;

        let gaps = fetcher.gaps();
        assert_eq!(fetcher.calls(), 3);
        assert!(within(gaps[0], BACKOFF));
        assert!(within(gaps[1], CADENCE));
        assert_eq!(slot.series().last().unwrap().close, 2.0);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_the_loop() {
        let slot = Arc::new(LiveSlot::new(PriceSeries::empty("TEST")));
        let fetcher = ScriptedFetcher::new(vec![Step::Data(1.0)]);
        let handle = worker(fetcher.clone(), slot).start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.stop().await;

        tokio::time::sleep(CADENCE * 3).await;
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
