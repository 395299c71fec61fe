//! Market data sources

pub mod types;
pub mod yahoo;
mod adapter;

pub use adapter::{FetchAdapter, InstrumentFeed, SeriesFetcher};

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use types::*;

/// Trait that every price data source implements
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Source ID (e.g., "yahoo")
    fn id(&self) -> &'static str;

    /// Source display name
    fn name(&self) -> &'static str;

    /// Latest series for a symbol over a lookback period
    async fn fetch(&self, request: &FetchRequest) -> Result<PriceSeries>;

    /// Series between two calendar dates (end exclusive)
    async fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<PriceSeries>;
}
