//! Forecast command - fit and print a forecast for one instrument

use anyhow::Result;
use clap::Args;

use crate::config::Settings;
use crate::market::types::PriceSeries;
use crate::services::ForecastService;
use crate::state::AppState;
use crate::view::forecast_text;

/// Arguments for the forecast command
#[derive(Args)]
pub struct ForecastArgs {
    /// Instrument from forecast.instruments (e.g. AAPL)
    #[arg(long, short)]
    pub symbol: String,

    /// Years of prediction
    #[arg(long, short, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub years: u32,
}

pub async fn execute(settings: Settings, args: ForecastArgs) -> Result<()> {
    let source = super::data_source(&settings)?;
    let live_symbol = settings.live.symbol.clone();
    let state = AppState::new(settings, source, PriceSeries::empty(live_symbol));

    let view = ForecastService::get_forecast(&state, &args.symbol, args.years).await?;
    println!("{}", forecast_text(&view));
    Ok(())
}
