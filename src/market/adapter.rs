//! Fetch adapter
//!
//! Wraps a [`DataSource`] and turns every failure into an empty series, so
//! callers only ever see "data" or "no data yet".

use crate::error::Result;
use crate::market::types::*;
use crate::market::DataSource;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Degrade-to-empty wrapper around a data source
#[derive(Clone)]
pub struct FetchAdapter {
    source: Arc<dyn DataSource>,
}

impl FetchAdapter {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    /// Fetch a normalized series, never failing
    ///
    /// Transport errors, parse errors and timeouts are logged and returned as
    /// an empty series for the requested symbol.
    pub async fn fetch(&self, request: &FetchRequest) -> PriceSeries {
        if request.symbol.trim().is_empty() {
            warn!("Refusing to fetch an empty symbol");
            return PriceSeries::empty("");
        }

        info!(
            "Fetching {} ({} / {}) from {}...",
            request.symbol,
            request.interval,
            request.period,
            self.source.name()
        );

        // The source applies the timeout to the request; this outer bound
        // also covers time spent decoding the body.
        let outer = request.timeout + Duration::from_secs(1);
        match tokio::time::timeout(outer, self.source.fetch(request)).await {
            Ok(Ok(series)) if !series.is_empty() => {
                info!("Got {} candles for {}", series.len(), request.symbol);
                series
            }
            Ok(Ok(_)) => {
                warn!("No data for {}", request.symbol);
                PriceSeries::empty(&request.symbol)
            }
            Ok(Err(e)) => {
                warn!(
                    "Error fetching {} from {}: {}",
                    request.symbol,
                    self.source.id(),
                    e
                );
                PriceSeries::empty(&request.symbol)
            }
            Err(_) => {
                warn!(
                    "Error fetching {} from {}: timed out after {:?}",
                    request.symbol,
                    self.source.id(),
                    outer
                );
                PriceSeries::empty(&request.symbol)
            }
        }
    }
}

/// Something that can produce the latest series for the live pipeline
#[async_trait]
pub trait SeriesFetcher: Send + Sync {
    async fn fetch_series(&self) -> Result<PriceSeries>;
}

/// The live instrument bound to a fetch adapter
pub struct InstrumentFeed {
    adapter: FetchAdapter,
    request: FetchRequest,
}

impl InstrumentFeed {
    pub fn new(adapter: FetchAdapter, request: FetchRequest) -> Self {
        Self { adapter, request }
    }
}

#[async_trait]
impl SeriesFetcher for InstrumentFeed {
    async fn fetch_series(&self) -> Result<PriceSeries> {
        Ok(self.adapter.fetch(&self.request).await)
    }
}
