//! Forecast Service
//!
//! Loads long daily history (cached per instrument), fits the forecaster off
//! the async runtime and assembles the forecast view. Errors propagate to
//! the caller; nothing here is degraded to an empty result.

use crate::error::{AppError, Result};
use crate::market::types::{Interval, PriceSeries};
use crate::state::AppState;
use crate::view::{build_forecast_view, ForecastView};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

const DAYS_PER_YEAR: u32 = 365;

/// Forecast service for business logic
pub struct ForecastService;

impl ForecastService {
    /// Instruments offered by the forecast selector
    pub fn instruments(state: &AppState) -> &[String] {
        &state.settings.forecast.instruments
    }

    /// Forecast `symbol` for `years` years
    pub async fn get_forecast(state: &AppState, symbol: &str, years: u32) -> Result<ForecastView> {
        let symbol = Self::resolve_symbol(state, symbol)?;
        let max_years = state.settings.forecast.max_years;
        if years < 1 || years > max_years {
            return Err(AppError::Validation(format!(
                "years must be between 1 and {}, got {}",
                max_years, years
            )));
        }

        info!("ForecastService::get_forecast - {} for {} year(s)", symbol, years);

        let history = Self::load_history(state, &symbol).await?;
        let training = history.daily_closes();
        let horizon_days = years * DAYS_PER_YEAR;

        let forecaster = state.forecaster.clone();
        let forecast = tokio::task::spawn_blocking(move || {
            let model = forecaster.fit(&training)?;
            model.predict(horizon_days)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Forecast task failed: {}", e)))??;

        debug!(
            "Forecast for {} has {} points ({} projected)",
            symbol,
            forecast.points.len(),
            forecast.projected().len()
        );

        Ok(build_forecast_view(
            &history,
            &forecast,
            years,
            horizon_days,
            state.settings.forecast.tail_rows,
        ))
    }

    /// Daily history from the configured start date to today
    ///
    /// Non-empty results are cached for the life of the process.
    pub async fn load_history(state: &AppState, symbol: &str) -> Result<Arc<PriceSeries>> {
        let cached = state.history_cache.get(symbol).map(|entry| entry.value().clone());
        if let Some(series) = cached {
            debug!("History cache hit for {}", symbol);
            return Ok(series);
        }

        let start = state.settings.forecast.history_start;
        let end = Utc::now().date_naive();
        info!("Loading history for {} from {} to {}", symbol, start, end);

        let series = state
            .adapter
            .source()
            .fetch_range(symbol, start, end, Interval::OneDay)
            .await?;
        let series = Arc::new(series);

        if !series.is_empty() {
            state
                .history_cache
                .insert(symbol.to_string(), series.clone());
        }
        Ok(series)
    }

    /// Match `symbol` against the configured instrument list
    fn resolve_symbol(state: &AppState, symbol: &str) -> Result<String> {
        let symbol = symbol.trim();
        Self::instruments(state)
            .iter()
            .find(|s| s.eq_ignore_ascii_case(symbol))
            .cloned()
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Unknown instrument '{}'. Choose one of: {}",
                    symbol,
                    Self::instruments(state).join(", ")
                ))
            })
    }
}
