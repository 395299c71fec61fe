//! View models for the dashboard
//!
//! Everything here is a pure function of its inputs. The HTTP layer
//! serializes these structs and the CLI prints their text form.

mod forecast;
mod live;

pub use forecast::{build_forecast_view, forecast_text, Components, ForecastView, PriceTraces};
pub use live::{live_text, render_live, CandleChart, LiveDashboard, LiveView, SummaryStats};

use crate::market::types::Bar;
use chrono_tz::Tz;
use serde::Serialize;

/// One table row of bar data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarRow {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl BarRow {
    fn from_bar(bar: &Bar, tz: Tz, intraday: bool) -> Self {
        Self {
            date: date_label(bar, tz, intraday),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

/// Bar timestamp as shown to users, in the exchange time zone
fn date_label(bar: &Bar, tz: Tz, intraday: bool) -> String {
    let local = bar.timestamp.with_timezone(&tz);
    if intraday {
        local.format("%Y-%m-%d %H:%M").to_string()
    } else {
        local.format("%Y-%m-%d").to_string()
    }
}

/// Display symbol for an ISO currency code
fn currency_symbol(code: Option<&str>) -> String {
    match code {
        Some("INR") => "₹".to_string(),
        Some("USD") => "$".to_string(),
        Some("EUR") => "€".to_string(),
        Some("GBP") => "£".to_string(),
        Some("JPY") | Some("CNY") => "¥".to_string(),
        Some(other) if !other.is_empty() => format!("{} ", other),
        _ => String::new(),
    }
}
