//! Forecasting models
//!
//! A [`Forecaster`] fits a model to `(date, value)` history; the fitted model
//! projects the series forward by a number of calendar days. The default
//! implementation is an additive trend + seasonality model fitted by
//! penalized least squares.

mod linalg;
mod model;

pub use model::{AdditiveForecaster, ModelConfig};

use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One projected point with its uncertainty band and component breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
    pub weekly: f64,
    pub yearly: f64,
}

/// Model output over the history dates followed by the projected horizon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
    /// Index of the first point past the training history
    pub horizon_start: usize,
}

impl Forecast {
    /// Points past the last historical date
    pub fn projected(&self) -> &[ForecastPoint] {
        &self.points[self.horizon_start.min(self.points.len())..]
    }
}

/// Fits forecasting models to historical values
pub trait Forecaster: Send + Sync {
    fn fit(&self, history: &[(NaiveDate, f64)]) -> Result<Box<dyn FittedModel>>;
}

/// A fitted model ready to project forward
pub trait FittedModel: Send + Sync {
    /// Predict every history date plus `horizon_days` calendar days
    fn predict(&self, horizon_days: u32) -> Result<Forecast>;
}
