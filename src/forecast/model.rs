//! Additive trend + seasonality model
//!
//! `y(t) = trend(t) + yearly(t) + weekly(t) + noise`, where the trend is
//! piecewise linear with changepoints spread over the first part of the
//! history and each seasonality is a truncated Fourier series. All
//! coefficients come from one penalized least-squares solve on the
//! absmax-scaled series.

use super::linalg::solve_spd;
use super::{FittedModel, Forecast, ForecastPoint, Forecaster};
use crate::error::{AppError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Range;
use tracing::debug;

const YEAR_DAYS: f64 = 365.25;
const WEEK_DAYS: f64 = 7.0;
const JITTER: f64 = 1e-9;

/// Tuning knobs for [`AdditiveForecaster`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub n_changepoints: usize,
    /// Share of the history in which changepoints may sit
    pub changepoint_range: f64,
    /// Ridge weight on changepoint slope deltas
    pub changepoint_penalty: f64,
    pub yearly_order: usize,
    pub weekly_order: usize,
    /// Ridge weight on Fourier coefficients
    pub seasonality_penalty: f64,
    /// Coverage of the uncertainty band
    pub interval_width: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_penalty: 1.0,
            yearly_order: 10,
            weekly_order: 3,
            seasonality_penalty: 0.01,
            interval_width: 0.8,
        }
    }
}

/// Default [`Forecaster`]
#[derive(Debug, Clone, Default)]
pub struct AdditiveForecaster {
    config: ModelConfig,
}

impl AdditiveForecaster {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }
}

/// Feature layout shared by fitting and prediction
#[derive(Debug, Clone)]
struct Design {
    start: NaiveDate,
    span_days: f64,
    changepoints: Vec<f64>,
    yearly_order: usize,
    weekly_order: usize,
}

impl Design {
    fn days(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64
    }

    fn n_features(&self) -> usize {
        2 + self.changepoints.len() + 2 * self.yearly_order + 2 * self.weekly_order
    }

    fn trend_range(&self) -> Range<usize> {
        0..2 + self.changepoints.len()
    }

    fn yearly_range(&self) -> Range<usize> {
        let start = self.trend_range().end;
        start..start + 2 * self.yearly_order
    }

    fn weekly_range(&self) -> Range<usize> {
        let start = self.yearly_range().end;
        start..start + 2 * self.weekly_order
    }

    fn row(&self, date: NaiveDate) -> Vec<f64> {
        let days = self.days(date);
        let t = days / self.span_days;

        let mut row = Vec::with_capacity(self.n_features());
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|&s| (t - s).max(0.0)));
        push_fourier(&mut row, days, YEAR_DAYS, self.yearly_order);
        push_fourier(&mut row, days, WEEK_DAYS, self.weekly_order);
        row
    }

    fn penalties(&self, config: &ModelConfig) -> Vec<f64> {
        let mut penalties = vec![JITTER; self.n_features()];
        for i in 2..self.trend_range().end {
            penalties[i] += config.changepoint_penalty;
        }
        for i in self.yearly_range().chain(self.weekly_range()) {
            penalties[i] += config.seasonality_penalty;
        }
        penalties
    }
}

fn push_fourier(row: &mut Vec<f64>, days: f64, period: f64, order: usize) {
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * days / period;
        row.push(angle.sin());
        row.push(angle.cos());
    }
}

fn dot(row: &[f64], beta: &[f64], range: Range<usize>) -> f64 {
    range.map(|i| row[i] * beta[i]).sum()
}

impl Forecaster for AdditiveForecaster {
    fn fit(&self, history: &[(NaiveDate, f64)]) -> Result<Box<dyn FittedModel>> {
        let mut history: Vec<(NaiveDate, f64)> = history
            .iter()
            .copied()
            .filter(|(_, y)| y.is_finite())
            .collect();
        history.sort_by_key(|(d, _)| *d);

        if history.len() < 2 {
            return Err(AppError::Forecast(format!(
                "Need at least two observations to fit, got {}",
                history.len()
            )));
        }

        let start = history[0].0;
        let end = history[history.len() - 1].0;
        if start == end {
            return Err(AppError::Forecast(
                "History must span more than one date".to_string(),
            ));
        }
        let span_days = (end - start).num_days() as f64;

        let y_scale = history
            .iter()
            .map(|(_, y)| y.abs())
            .fold(0.0_f64, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let min_gap = history
            .windows(2)
            .map(|w| (w[1].0 - w[0].0).num_days())
            .filter(|&g| g > 0)
            .min()
            .unwrap_or(i64::MAX);

        let yearly_order = if span_days >= 2.0 * 365.0 {
            self.config.yearly_order
        } else {
            0
        };
        let weekly_order = if min_gap < 7 && span_days >= 14.0 {
            self.config.weekly_order
        } else {
            0
        };

        let design = Design {
            start,
            span_days,
            changepoints: changepoints(&history, start, span_days, &self.config),
            yearly_order,
            weekly_order,
        };

        let n = design.n_features();
        let mut xtx = vec![0.0; n * n];
        let mut xty = vec![0.0; n];
        let rows: Vec<Vec<f64>> = history.iter().map(|(d, _)| design.row(*d)).collect();

        for (row, (_, y)) in rows.iter().zip(&history) {
            let y = y / y_scale;
            for i in 0..n {
                xty[i] += row[i] * y;
                for j in 0..=i {
                    xtx[i * n + j] += row[i] * row[j];
                }
            }
        }
        for i in 0..n {
            for j in 0..i {
                xtx[j * n + i] = xtx[i * n + j];
            }
        }
        for (i, p) in design.penalties(&self.config).into_iter().enumerate() {
            xtx[i * n + i] += p;
        }

        let beta = solve_spd(&xtx, &xty, n)
            .ok_or_else(|| AppError::Forecast("Normal equations are singular".to_string()))?;

        let ssr: f64 = rows
            .iter()
            .zip(&history)
            .map(|(row, (_, y))| {
                let fitted: f64 = row.iter().zip(&beta).map(|(x, b)| x * b).sum();
                (y / y_scale - fitted).powi(2)
            })
            .sum();
        let sigma = (ssr / (history.len().saturating_sub(1).max(1)) as f64).sqrt();

        debug!(
            "Fitted additive model: {} points, {} features, {} changepoints, sigma={:.5}",
            history.len(),
            n,
            design.changepoints.len(),
            sigma * y_scale
        );

        Ok(Box::new(FittedAdditive {
            z: normal_quantile(0.5 + self.config.interval_width.clamp(0.0, 0.999) / 2.0),
            dates: history.into_iter().map(|(d, _)| d).collect(),
            design,
            beta,
            y_scale,
            sigma,
        }))
    }
}

/// Changepoints at evenly spaced history rows within the changepoint range
fn changepoints(
    history: &[(NaiveDate, f64)],
    start: NaiveDate,
    span_days: f64,
    config: &ModelConfig,
) -> Vec<f64> {
    let limit = ((history.len() as f64) * config.changepoint_range).floor() as usize;
    let count = config.n_changepoints.min(limit.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    let mut points: Vec<f64> = (1..=count)
        .map(|i| {
            let idx = (i * limit) / (count + 1);
            (history[idx].0 - start).num_days() as f64 / span_days
        })
        .filter(|&t| t > 0.0)
        .collect();
    points.dedup();
    points
}

struct FittedAdditive {
    design: Design,
    beta: Vec<f64>,
    y_scale: f64,
    sigma: f64,
    z: f64,
    dates: Vec<NaiveDate>,
}

impl FittedModel for FittedAdditive {
    fn predict(&self, horizon_days: u32) -> Result<Forecast> {
        let last = *self
            .dates
            .last()
            .ok_or_else(|| AppError::Forecast("Model has no history".to_string()))?;

        let future = (1..=horizon_days as i64).map(|k| last + Duration::days(k));
        let dates: Vec<NaiveDate> = self.dates.iter().copied().chain(future).collect();

        let points = dates
            .into_iter()
            .map(|date| {
                let row = self.design.row(date);
                let trend = dot(&row, &self.beta, self.design.trend_range()) * self.y_scale;
                let yearly = dot(&row, &self.beta, self.design.yearly_range()) * self.y_scale;
                let weekly = dot(&row, &self.beta, self.design.weekly_range()) * self.y_scale;
                let yhat = trend + yearly + weekly;

                // Band widens with the square root of the distance past the history
                let ahead = (date - last).num_days().max(0) as f64;
                let half_width =
                    self.z * self.sigma * self.y_scale * (1.0 + ahead / YEAR_DAYS).sqrt();

                ForecastPoint {
                    date,
                    yhat,
                    yhat_lower: yhat - half_width,
                    yhat_upper: yhat + half_width,
                    trend,
                    weekly,
                    yearly,
                }
            })
            .collect();

        Ok(Forecast {
            points,
            horizon_start: self.dates.len(),
        })
    }
}

/// Inverse standard normal CDF (Acklam's rational approximation)
fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    let p = p.clamp(1e-12, 1.0 - 1e-12);
    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -normal_quantile(1.0 - p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_history(days: i64) -> Vec<(NaiveDate, f64)> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        (0..days)
            .map(|d| (start + Duration::days(d), 100.0 + 0.5 * d as f64))
            .collect()
    }

    #[test]
    fn test_two_year_horizon_ends_730_days_out() {
        let history = linear_history(400);
        let last = history.last().unwrap().0;

        let model = AdditiveForecaster::default().fit(&history).unwrap();
        let forecast = model.predict(2 * 365).unwrap();

        assert_eq!(forecast.projected().len(), 730);
        assert_eq!(forecast.points.last().unwrap().date, last + Duration::days(730));
        assert_eq!(forecast.points.len(), history.len() + 730);
        assert_eq!(forecast.horizon_start, history.len());
    }

    #[test]
    fn test_linear_trend_is_extrapolated() {
        let history = linear_history(300);
        let model = AdditiveForecaster::default().fit(&history).unwrap();
        let forecast = model.predict(100).unwrap();

        let last = forecast.points.last().unwrap();
        let expected = 100.0 + 0.5 * 399.0;
        assert!(
            (last.yhat - expected).abs() / expected < 0.02,
            "yhat {} vs expected {}",
            last.yhat,
            expected
        );
    }

    #[test]
    fn test_bands_contain_estimate_and_widen() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let history: Vec<(NaiveDate, f64)> = (0..200)
            .map(|d| {
                let noise = if d % 2 == 0 { 1.5 } else { -1.5 };
                (start + Duration::days(d), 50.0 + 0.1 * d as f64 + noise)
            })
            .collect();

        let forecast = AdditiveForecaster::default()
            .fit(&history)
            .unwrap()
            .predict(365)
            .unwrap();

        for p in &forecast.points {
            assert!(p.yhat_lower <= p.yhat && p.yhat <= p.yhat_upper);
        }
        let first = &forecast.projected()[0];
        let last = forecast.points.last().unwrap();
        assert!(last.yhat_upper - last.yhat_lower > first.yhat_upper - first.yhat_lower);
    }

    #[test]
    fn test_weekly_pattern_is_captured() {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let history: Vec<(NaiveDate, f64)> = (0..140)
            .map(|d| {
                let season = 5.0 * (2.0 * PI * d as f64 / 7.0).sin();
                (start + Duration::days(d), 200.0 + season)
            })
            .collect();

        let forecast = AdditiveForecaster::default()
            .fit(&history)
            .unwrap()
            .predict(7)
            .unwrap();

        let amplitude = forecast
            .points
            .iter()
            .map(|p| p.weekly.abs())
            .fold(0.0, f64::max);
        assert!(amplitude > 3.0, "weekly amplitude {}", amplitude);
        for (p, (_, y)) in forecast.points.iter().zip(&history) {
            assert!((p.yhat - y).abs() < 1.0);
        }
    }

    #[test]
    fn test_components_sum_to_estimate() {
        let forecast = AdditiveForecaster::default()
            .fit(&linear_history(900))
            .unwrap()
            .predict(30)
            .unwrap();
        for p in &forecast.points {
            assert!((p.trend + p.weekly + p.yearly - p.yhat).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rejects_short_history() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(AdditiveForecaster::default().fit(&[]).is_err());
        assert!(AdditiveForecaster::default()
            .fit(&[(start, 1.0)])
            .is_err());
        assert!(AdditiveForecaster::default()
            .fit(&[(start, 1.0), (start, f64::NAN)])
            .is_err());
    }

    #[test]
    fn test_normal_quantile() {
        assert!((normal_quantile(0.9) - 1.281551).abs() < 1e-5);
        assert!((normal_quantile(0.975) - 1.959964).abs() < 1e-5);
        assert!(normal_quantile(0.5).abs() < 1e-9);
    }

    #[test]
    fn test_interval_width_sets_band() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let history: Vec<(NaiveDate, f64)> = (0..120)
            .map(|d| {
                let noise = if d % 3 == 0 { 2.0 } else { -1.0 };
                (start + Duration::days(d), 80.0 + 0.2 * d as f64 + noise)
            })
            .collect();

        let band = |interval_width: f64| {
            let forecaster = AdditiveForecaster::new(ModelConfig {
                interval_width,
                ..ModelConfig::default()
            });
            let forecast = forecaster.fit(&history).unwrap().predict(30).unwrap();
            let last = forecast.points.last().unwrap().clone();
            last.yhat_upper - last.yhat_lower
        };

        assert!(band(0.95) > band(0.5));
    }
}
