//! Forecast page rendering

use super::BarRow;
use crate::forecast::{Forecast, ForecastPoint};
use crate::market::types::PriceSeries;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Everything the forecast page shows for one instrument and horizon
#[derive(Debug, Clone, Serialize)]
pub struct ForecastView {
    pub symbol: String,
    pub years: u32,
    pub horizon_days: u32,
    /// Last rows of the raw daily history
    pub history_tail: Vec<BarRow>,
    pub history_chart: PriceTraces,
    /// Last rows of the forecast
    pub forecast_tail: Vec<ForecastPoint>,
    pub forecast: Vec<ForecastPoint>,
    pub components: Components,
}

/// Open and close traces of the raw history
#[derive(Debug, Clone, Serialize)]
pub struct PriceTraces {
    pub dates: Vec<String>,
    pub open: Vec<f64>,
    pub close: Vec<f64>,
}

/// Additive breakdown of the forecast
#[derive(Debug, Clone, Serialize)]
pub struct Components {
    pub trend: Vec<(NaiveDate, f64)>,
    /// Weekly effect by weekday, Monday first
    pub weekly: Vec<(String, f64)>,
    /// Yearly effect by day of year
    pub yearly: Vec<(u32, f64)>,
}

impl Components {
    fn from_points(points: &[ForecastPoint]) -> Self {
        let trend = points.iter().map(|p| (p.date, p.trend)).collect();

        let mut by_weekday: BTreeMap<u32, f64> = BTreeMap::new();
        let mut by_ordinal: BTreeMap<u32, f64> = BTreeMap::new();
        for p in points {
            by_weekday
                .entry(p.date.weekday().num_days_from_monday())
                .or_insert(p.weekly);
            by_ordinal.entry(p.date.ordinal()).or_insert(p.yearly);
        }

        let weekly = by_weekday
            .into_iter()
            .map(|(day, value)| (weekday_name(day), value))
            .collect();
        let yearly = by_ordinal.into_iter().collect();

        Self {
            trend,
            weekly,
            yearly,
        }
    }
}

fn weekday_name(days_from_monday: u32) -> String {
    let mut day = Weekday::Mon;
    for _ in 0..days_from_monday {
        day = day.succ();
    }
    format!("{:?}", day)
}

/// Assemble the forecast view from daily history and the model output
pub fn build_forecast_view(
    history: &PriceSeries,
    forecast: &Forecast,
    years: u32,
    horizon_days: u32,
    tail_rows: usize,
) -> ForecastView {
    let tz = history.timezone();
    let rows: Vec<BarRow> = history
        .bars
        .iter()
        .map(|b| BarRow::from_bar(b, tz, false))
        .collect();

    let history_chart = PriceTraces {
        dates: rows.iter().map(|r| r.date.clone()).collect(),
        open: rows.iter().map(|r| r.open).collect(),
        close: rows.iter().map(|r| r.close).collect(),
    };

    ForecastView {
        symbol: history.symbol.clone(),
        years,
        horizon_days,
        history_tail: tail(&rows, tail_rows).to_vec(),
        history_chart,
        forecast_tail: tail(&forecast.points, tail_rows).to_vec(),
        forecast: forecast.points.clone(),
        components: Components::from_points(&forecast.points),
    }
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

/// Plain-text form of a forecast view
pub fn forecast_text(view: &ForecastView) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Raw data for {}", view.symbol);
    let _ = writeln!(
        out,
        "{:<12} {:>12} {:>12} {:>12} {:>12} {:>14}",
        "date", "open", "high", "low", "close", "volume"
    );
    for row in &view.history_tail {
        let _ = writeln!(
            out,
            "{:<12} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>14}",
            row.date, row.open, row.high, row.low, row.close, row.volume
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Forecast for {} ({} year(s), {} days)",
        view.symbol, view.years, view.horizon_days
    );
    let _ = writeln!(
        out,
        "{:<12} {:>12} {:>12} {:>12}",
        "date", "yhat", "yhat_lower", "yhat_upper"
    );
    for p in &view.forecast_tail {
        let _ = writeln!(
            out,
            "{:<12} {:>12.2} {:>12.2} {:>12.2}",
            p.date.format("%Y-%m-%d"),
            p.yhat,
            p.yhat_lower,
            p.yhat_upper
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Weekly effect");
    for (day, value) in &view.components.weekly {
        let _ = writeln!(out, "  {:<4} {:>+10.4}", day, value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::Bar;
    use chrono::{Duration, TimeZone, Utc};

    fn history(days: i64) -> PriceSeries {
        let bars = (0..days)
            .map(|d| Bar {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(d),
                open: 100.0 + d as f64,
                high: 101.0 + d as f64,
                low: 99.0 + d as f64,
                close: 100.5 + d as f64,
                volume: 1_000,
            })
            .collect();
        PriceSeries::from_bars("AAPL", bars)
    }

    fn forecast(start: NaiveDate, days: i64, horizon_start: usize) -> Forecast {
        let points = (0..days)
            .map(|d| {
                let date = start + Duration::days(d);
                ForecastPoint {
                    date,
                    yhat: d as f64,
                    yhat_lower: d as f64 - 1.0,
                    yhat_upper: d as f64 + 1.0,
                    trend: d as f64,
                    weekly: date.weekday().num_days_from_monday() as f64,
                    yearly: 0.0,
                }
            })
            .collect();
        Forecast {
            points,
            horizon_start,
        }
    }

    #[test]
    fn test_tails_and_traces() {
        let hist = history(30);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let fc = forecast(start, 30 + 365, 30);
        let view = build_forecast_view(&hist, &fc, 1, 365, 5);

        assert_eq!(view.history_tail.len(), 5);
        assert_eq!(view.history_tail[4].date, "2024-01-30");
        assert_eq!(view.history_chart.dates.len(), 30);
        assert_eq!(view.history_chart.open.len(), 30);
        assert_eq!(view.forecast_tail.len(), 5);
        assert_eq!(view.forecast.len(), 395);
        assert_eq!(
            view.forecast_tail.last().unwrap().date,
            NaiveDate::from_ymd_opt(2025, 1, 29).unwrap()
        );
    }

    #[test]
    fn test_weekly_component_ordered_from_monday() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(); // Wednesday
        let fc = forecast(start, 14, 14);
        let components = Components::from_points(&fc.points);

        assert_eq!(components.weekly.len(), 7);
        assert_eq!(components.weekly[0], ("Mon".to_string(), 0.0));
        assert_eq!(components.weekly[6], ("Sun".to_string(), 6.0));
        assert_eq!(components.trend.len(), 14);
    }

    #[test]
    fn test_short_history_tail() {
        let hist = history(2);
        let fc = forecast(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 3, 2);
        let view = build_forecast_view(&hist, &fc, 1, 1, 5);
        assert_eq!(view.history_tail.len(), 2);
        assert_eq!(view.forecast_tail.len(), 3);
        assert!(forecast_text(&view).contains("Forecast for AAPL"));
    }
}
