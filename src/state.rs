//! Application state management

use crate::assistant::{Assistant, DuckDuckGoSearch, GeminiAssistant, SessionStore, Tools};
use crate::config::Settings;
use crate::error::Result;
use crate::forecast::{AdditiveForecaster, Forecaster};
use crate::market::types::PriceSeries;
use crate::market::yahoo::YahooSource;
use crate::market::{DataSource, FetchAdapter};
use crate::view::{render_live, LiveView};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;

/// What a reader sees when it looks at the live slot
#[derive(Debug, Clone)]
pub struct LiveSnapshot {
    pub series: Arc<PriceSeries>,
    /// Number of publishes since startup (0 = initial value)
    pub version: u64,
    /// When the current series was stored, if it holds data
    pub published_at: Option<DateTime<Utc>>,
}

/// Single-writer holder of the current live price series
///
/// The series is replaced by swapping an `Arc` under the write lock, so a
/// reader always gets one complete series together with its version.
pub struct LiveSlot {
    current: RwLock<LiveSnapshot>,
}

impl LiveSlot {
    /// Create the slot with its initial (possibly empty) series
    pub fn new(initial: PriceSeries) -> Self {
        let published_at = (!initial.is_empty()).then(Utc::now);
        Self {
            current: RwLock::new(LiveSnapshot {
                series: Arc::new(initial),
                version: 0,
                published_at,
            }),
        }
    }

    /// Current series with its metadata
    pub fn snapshot(&self) -> LiveSnapshot {
        self.current.read().clone()
    }

    /// Current series
    pub fn series(&self) -> Arc<PriceSeries> {
        self.current.read().series.clone()
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Replace the series wholesale, returning the new version
    pub fn publish(&self, series: PriceSeries) -> u64 {
        let series = Arc::new(series);
        let now = Utc::now();

        let mut current = self.current.write();
        let version = current.version + 1;
        *current = LiveSnapshot {
            series,
            version,
            published_at: Some(now),
        };
        version
    }
}

/// Application state shared by the pipelines, the HTTP server and the CLI
pub struct AppState {
    pub settings: Settings,

    /// Live-data slot (written only by the refresh worker)
    pub live: Arc<LiveSlot>,

    /// Latest rendered live view (written only by the render trigger)
    pub live_view: watch::Sender<LiveView>,

    /// Degrade-to-empty wrapper around the data source
    pub adapter: FetchAdapter,

    pub forecaster: Arc<dyn Forecaster>,

    /// Reasoning service, absent when no API key is configured
    pub assistant: Option<Arc<dyn Assistant>>,

    pub tools: Tools,

    /// Long daily history per instrument
    pub history_cache: DashMap<String, Arc<PriceSeries>>,

    /// Chat transcripts per session
    pub chat_sessions: SessionStore,
}

impl AppState {
    /// Create state around a data source and an initial live series
    pub fn new(settings: Settings, source: Arc<dyn DataSource>, initial: PriceSeries) -> Self {
        let live = Arc::new(LiveSlot::new(initial));
        let first_view = render_live(&live.snapshot(), &settings.live, Utc::now());
        let (live_view, _) = watch::channel(first_view);
        let chat_sessions = SessionStore::from_settings(&settings.assistant);
        let forecaster = AdditiveForecaster::new(settings.forecast.model.clone());

        Self {
            settings,
            live,
            live_view,
            adapter: FetchAdapter::new(source),
            forecaster: Arc::new(forecaster),
            assistant: None,
            tools: Tools::default(),
            history_cache: DashMap::new(),
            chat_sessions,
        }
    }

    pub fn with_assistant(mut self, assistant: Arc<dyn Assistant>, tools: Tools) -> Self {
        self.assistant = Some(assistant);
        self.tools = tools;
        self
    }

    /// Build production state: Yahoo source, synchronous initial load,
    /// Gemini assistant when a key is available
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let source: Arc<dyn DataSource> = Arc::new(YahooSource::new(&settings.data_source)?);
        let adapter = FetchAdapter::new(source.clone());

        tracing::info!("Loading initial data...");
        let initial = adapter.fetch(&settings.live.fetch_request()).await;
        tracing::info!("Initial data loaded ({} bars)", initial.len());

        let mut state = Self::new(settings, source, initial);

        match GeminiAssistant::from_settings(&state.settings.assistant) {
            Ok(assistant) => {
                let search = DuckDuckGoSearch::from_settings(&state.settings.assistant)?;
                tracing::info!("Assistant enabled (model {})", assistant.name());
                let tools = Tools::with_search(Arc::new(search));
                state = state.with_assistant(Arc::new(assistant), tools);
            }
            Err(e) => tracing::warn!("Assistant disabled: {}", e),
        }

        Ok(state)
    }

    /// Receiver for rendered live views
    pub fn subscribe_views(&self) -> watch::Receiver<LiveView> {
        self.live_view.subscribe()
    }

    /// Most recently rendered live view
    pub fn current_view(&self) -> LiveView {
        self.live_view.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::Bar;
    use chrono::TimeZone;
    use std::thread;

    /// Series number `k`: k bars, every close equal to k
    fn numbered_series(k: usize) -> PriceSeries {
        let bars = (0..k)
            .map(|i| Bar {
                timestamp: Utc.timestamp_opt(1_700_000_000 + 60 * i as i64, 0).unwrap(),
                open: k as f64,
                high: k as f64,
                low: k as f64,
                close: k as f64,
                volume: k as u64,
            })
            .collect();
        PriceSeries::from_bars("TEST", bars)
    }

    #[test]
    fn test_initial_value_and_publish() {
        let slot = LiveSlot::new(PriceSeries::empty("TEST"));
        let snapshot = slot.snapshot();
        assert!(snapshot.series.is_empty());
        assert_eq!(snapshot.version, 0);
        assert!(snapshot.published_at.is_none());

        let version = slot.publish(numbered_series(3));
        assert_eq!(version, 1);
        assert_eq!(slot.series().len(), 3);
        assert!(slot.snapshot().published_at.is_some());
    }

    #[test]
    fn test_readers_never_see_partial_series() {
        const PUBLISHES: usize = 200;
        const READERS: usize = 8;

        let slot = Arc::new(LiveSlot::new(PriceSeries::empty("TEST")));

        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let slot = slot.clone();
                thread::spawn(move || {
                    let mut last_version = 0;
                    for _ in 0..2_000 {
                        let snapshot = slot.snapshot();
                        let k = snapshot.series.len();

                        // Every read is exactly one of the published snapshots
                        assert_eq!(*snapshot.series, numbered_series(k));
                        // Version and content were swapped together
                        assert_eq!(snapshot.version as usize, k);
                        // Single writer: versions only move forward
                        assert!(snapshot.version >= last_version);
                        last_version = snapshot.version;
                    }
                })
            })
            .collect();

        let writer = {
            let slot = slot.clone();
            thread::spawn(move || {
                for k in 1..=PUBLISHES {
                    slot.publish(numbered_series(k));
                }
            })
        };

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(slot.version() as usize, PUBLISHES);
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_publish() {
        let slot = LiveSlot::new(numbered_series(2));
        let before = slot.snapshot();
        slot.publish(numbered_series(5));
        assert_eq!(before.series.len(), 2);
        assert_eq!(slot.series().len(), 5);
    }
}
