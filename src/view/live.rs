//! Live dashboard rendering

use super::{currency_symbol, date_label, BarRow};
use crate::config::LiveSettings;
use crate::state::LiveSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

const LOADING_MESSAGE: &str = "Loading data... please wait.";

/// Rendered live view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LiveView {
    /// Slot is still empty
    Loading { message: String },
    Ready(LiveDashboard),
}

impl LiveView {
    pub fn loading() -> Self {
        LiveView::Loading {
            message: LOADING_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveDashboard {
    pub symbol: String,
    pub title: String,
    pub y_axis_title: String,
    pub chart: CandleChart,
    pub table: Vec<BarRow>,
    pub stats: SummaryStats,
    pub version: u64,
    pub last_updated: Option<DateTime<Utc>>,
    /// Last publish is older than two refresh cadences
    pub stale: bool,
}

/// Candlestick trace, one entry per bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleChart {
    pub name: String,
    pub x: Vec<String>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
}

/// Headline numbers taken from the most recent bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub latest_close: f64,
    pub high: f64,
    pub low: f64,
    /// Volume in millions, truncated
    pub volume_millions: u64,
    pub latest_close_display: String,
    pub high_display: String,
    pub low_display: String,
    pub volume_display: String,
}

/// Render the live view for a slot snapshot at instant `now`
pub fn render_live(
    snapshot: &LiveSnapshot,
    settings: &LiveSettings,
    now: DateTime<Utc>,
) -> LiveView {
    let series = &snapshot.series;
    let last = match series.last() {
        Some(bar) => bar,
        None => return LiveView::loading(),
    };

    let tz = series.timezone();
    let intraday = settings.interval.is_intraday();
    let symbol = currency_symbol(series.currency.as_deref());

    let table: Vec<BarRow> = series
        .bars
        .iter()
        .map(|b| BarRow::from_bar(b, tz, intraday))
        .collect();

    let chart = CandleChart {
        name: settings.label.clone(),
        x: table.iter().map(|r| r.date.clone()).collect(),
        open: series.bars.iter().map(|b| b.open).collect(),
        high: series.bars.iter().map(|b| b.high).collect(),
        low: series.bars.iter().map(|b| b.low).collect(),
        close: series.bars.iter().map(|b| b.close).collect(),
    };

    let volume_millions = last.volume / 1_000_000;
    let stats = SummaryStats {
        latest_close: last.close,
        high: last.high,
        low: last.low,
        volume_millions,
        latest_close_display: format!("{}{:.2}", symbol, last.close),
        high_display: format!("{}{:.2}", symbol, last.high),
        low_display: format!("{}{:.2}", symbol, last.low),
        volume_display: format!("{}M", volume_millions),
    };

    let stale = snapshot.published_at.is_some_and(|at| {
        let limit = chrono::Duration::seconds(2 * settings.refresh_secs as i64);
        now - at > limit
    });

    let currency = series.currency.as_deref().unwrap_or("price");
    LiveView::Ready(LiveDashboard {
        symbol: series.symbol.clone(),
        title: format!(
            "{} - Live Chart ({} candlesticks)",
            settings.label, settings.interval
        ),
        y_axis_title: format!("Stock Price ({})", currency),
        chart,
        table,
        stats,
        version: snapshot.version,
        last_updated: snapshot.published_at,
        stale,
    })
}

/// Plain-text form of a live view: statistics plus the last `rows` bars
pub fn live_text(view: &LiveView, rows: usize) -> String {
    let dashboard = match view {
        LiveView::Loading { message } => return message.clone(),
        LiveView::Ready(dashboard) => dashboard,
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", dashboard.title);
    let _ = writeln!(
        out,
        "Latest Close: {}   High: {}   Low: {}   Volume: {}",
        dashboard.stats.latest_close_display,
        dashboard.stats.high_display,
        dashboard.stats.low_display,
        dashboard.stats.volume_display
    );
    if let Some(at) = dashboard.last_updated {
        let _ = writeln!(
            out,
            "Last updated: {}{}",
            at.format("%Y-%m-%d %H:%M:%S UTC"),
            if dashboard.stale { " (stale)" } else { "" }
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<17} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "date", "open", "high", "low", "close", "volume"
    );

    let start = dashboard.table.len().saturating_sub(rows);
    for row in &dashboard.table[start..] {
        let _ = writeln!(
            out,
            "{:<17} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12}",
            row.date, row.open, row.high, row.low, row.close, row.volume
        );
    }
    out
}
