//! Common market data types

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// One sampled interval of price/volume data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Ordered price series for one instrument
///
/// Bars are strictly increasing by timestamp. A series is never edited in
/// place; a refresh produces a complete new value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub currency: Option<String>,
    pub exchange_timezone: Option<String>,
    pub bars: Vec<Bar>,
}

impl PriceSeries {
    /// Empty series for a symbol
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Build a series from unordered bars
    ///
    /// Drops bars with non-finite prices, sorts by timestamp and keeps the
    /// last bar for any duplicated timestamp.
    pub fn from_bars(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        let mut bars: Vec<Bar> = bars.into_iter().filter(Bar::is_valid).collect();
        // Stable sort keeps arrival order within equal timestamps
        bars.sort_by_key(|b| b.timestamp);

        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
                _ => deduped.push(bar),
            }
        }

        Self {
            symbol: symbol.into(),
            currency: None,
            exchange_timezone: None,
            bars: deduped,
        }
    }

    pub fn with_currency(mut self, currency: Option<String>) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_timezone(mut self, timezone: Option<String>) -> Self {
        self.exchange_timezone = timezone;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Exchange time zone, falling back to UTC when unknown
    pub fn timezone(&self) -> Tz {
        self.exchange_timezone
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC)
    }

    /// Daily closing prices keyed by exchange-local date
    pub fn daily_closes(&self) -> Vec<(NaiveDate, f64)> {
        let tz = self.timezone();
        self.bars
            .iter()
            .filter(|b| b.close.is_finite())
            .map(|b| (b.timestamp.with_timezone(&tz).date_naive(), b.close))
            .collect()
    }
}

/// Sampling interval supported by the data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[serde(rename = "90m")]
    NinetyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::TwoMinutes => "2m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::SixtyMinutes => "60m",
            Interval::NinetyMinutes => "90m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::FiveDays => "5d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
            Interval::ThreeMonths => "3mo",
        }
    }

    pub fn all() -> &'static [Interval] {
        &[
            Interval::OneMinute,
            Interval::TwoMinutes,
            Interval::FiveMinutes,
            Interval::FifteenMinutes,
            Interval::ThirtyMinutes,
            Interval::SixtyMinutes,
            Interval::NinetyMinutes,
            Interval::OneHour,
            Interval::OneDay,
            Interval::FiveDays,
            Interval::OneWeek,
            Interval::OneMonth,
            Interval::ThreeMonths,
        ]
    }

    /// Whether bars carry an intraday time component
    pub fn is_intraday(&self) -> bool {
        matches!(
            self,
            Interval::OneMinute
                | Interval::TwoMinutes
                | Interval::FiveMinutes
                | Interval::FifteenMinutes
                | Interval::ThirtyMinutes
                | Interval::SixtyMinutes
                | Interval::NinetyMinutes
                | Interval::OneHour
        )
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::all()
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unsupported interval: {}", s)))
    }
}

/// Lookback period supported by the data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    pub fn all() -> &'static [Period] {
        &[
            Period::OneDay,
            Period::FiveDays,
            Period::OneMonth,
            Period::ThreeMonths,
            Period::SixMonths,
            Period::OneYear,
            Period::TwoYears,
            Period::FiveYears,
            Period::TenYears,
            Period::YearToDate,
            Period::Max,
        ]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unsupported period: {}", s)))
    }
}

/// Request for the latest series of one instrument
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub symbol: String,
    pub interval: Interval,
    pub period: Period,
    pub timeout: Duration,
}
