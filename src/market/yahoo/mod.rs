//! Yahoo Finance chart API adapter

use crate::config::DataSourceSettings;
use crate::error::{AppError, Result};
use crate::market::types::*;
use crate::market::DataSource;
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Yahoo Finance data source
pub struct YahooSource {
    client: Client,
    base_url: String,
}

impl YahooSource {
    pub fn new(settings: &DataSourceSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, symbol: &str, params: &[(&str, String)]) -> Result<Url> {
        let raw = format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            urlencoding::encode(symbol)
        );
        Url::parse_with_params(&raw, params)
            .map_err(|e| AppError::DataSource(format!("Invalid chart URL: {}", e)))
    }

    async fn get_chart(
        &self,
        symbol: &str,
        url: Url,
        timeout: Option<Duration>,
    ) -> Result<PriceSeries> {
        debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let body: ChartEnvelope = response.json().await?;

        if let Some(err) = body.chart.error {
            return Err(AppError::DataSource(format!(
                "{}: {}",
                err.code,
                err.description.unwrap_or_default()
            )));
        }
        if !status.is_success() {
            return Err(AppError::DataSource(format!(
                "Chart request for {} failed with status {}",
                symbol, status
            )));
        }

        normalize_chart(symbol, body.chart.result.unwrap_or_default())
    }
}

#[async_trait]
impl DataSource for YahooSource {
    fn id(&self) -> &'static str {
        "yahoo"
    }

    fn name(&self) -> &'static str {
        "Yahoo Finance"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<PriceSeries> {
        let url = self.chart_url(
            &request.symbol,
            &[
                ("interval", request.interval.to_string()),
                ("range", request.period.to_string()),
                ("includePrePost", "false".to_string()),
            ],
        )?;
        self.get_chart(&request.symbol, url, Some(request.timeout))
            .await
    }

    async fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<PriceSeries> {
        if end < start {
            return Err(AppError::Validation(format!(
                "Range end {} precedes start {}",
                end, start
            )));
        }

        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let period2 = end
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();

        let url = self.chart_url(
            symbol,
            &[
                ("interval", interval.to_string()),
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
            ],
        )?;
        self.get_chart(symbol, url, None).await
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    currency: Option<String>,
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Flatten the per-instrument chart results into a single bar series
///
/// Picks the result labelled with the requested symbol (or the first one
/// when no label matches) and zips its parallel columns into bars. Rows with
/// any missing price are dropped; missing volume counts as zero.
fn normalize_chart(symbol: &str, results: Vec<ChartResult>) -> Result<PriceSeries> {
    let matches_symbol = |r: &ChartResult| {
        r.meta
            .symbol
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case(symbol))
            .unwrap_or(false)
    };

    let position = results.iter().position(matches_symbol).unwrap_or(0);
    let Some(result) = results.into_iter().nth(position) else {
        return Ok(PriceSeries::empty(symbol));
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let column = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

    let bars: Vec<Bar> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let timestamp = Utc.timestamp_opt(ts, 0).single()?;
            Some(Bar {
                timestamp,
                open: column(&quote.open, i)?,
                high: column(&quote.high, i)?,
                low: column(&quote.low, i)?,
                close: column(&quote.close, i)?,
                volume: column(&quote.volume, i)
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .map(|v| v as u64)
                    .unwrap_or(0),
            })
        })
        .collect();

    Ok(PriceSeries::from_bars(symbol, bars)
        .with_currency(result.meta.currency)
        .with_timezone(result.meta.exchange_timezone_name))
}
