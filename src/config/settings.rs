//! Application settings and configuration

use crate::error::{AppError, Result};
use crate::forecast::ModelConfig;
use crate::market::types::{FetchRequest, Interval, Period};
use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix (e.g., STOCKCAST__LIVE__SYMBOL)
pub const ENV_PREFIX: &str = "STOCKCAST";

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Live-refresh pipeline
    #[serde(default)]
    pub live: LiveSettings,
    /// Forecast pipeline
    #[serde(default)]
    pub forecast: ForecastSettings,
    /// Conversational assistant
    #[serde(default)]
    pub assistant: AssistantSettings,
    /// Dashboard HTTP server
    #[serde(default)]
    pub server: ServerSettings,
    /// Price data source
    #[serde(default)]
    pub data_source: DataSourceSettings,
}

/// Live instrument and cadences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSettings {
    /// Instrument polled by the refresh worker
    #[serde(default = "default_live_symbol")]
    pub symbol: String,
    /// Short label used in chart titles
    #[serde(default = "default_live_label")]
    pub label: String,
    #[serde(default = "default_live_interval")]
    pub interval: Interval,
    #[serde(default = "default_live_period")]
    pub period: Period,
    /// Normal refresh cadence in seconds
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    /// Retry delay after a failed cycle, in seconds
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    /// Redraw cadence in seconds
    #[serde(default = "default_render_secs")]
    pub render_secs: u64,
    /// Per-fetch timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_live_symbol() -> String {
    "RELIANCE.NS".to_string()
}

fn default_live_label() -> String {
    "RELIANCE".to_string()
}

fn default_live_interval() -> Interval {
    Interval::OneMinute
}

fn default_live_period() -> Period {
    Period::OneDay
}

fn default_refresh_secs() -> u64 {
    300
}

fn default_backoff_secs() -> u64 {
    60
}

fn default_render_secs() -> u64 {
    5
}

fn default_fetch_timeout_secs() -> u64 {
    15
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            symbol: default_live_symbol(),
            label: default_live_label(),
            interval: default_live_interval(),
            period: default_live_period(),
            refresh_secs: default_refresh_secs(),
            backoff_secs: default_backoff_secs(),
            render_secs: default_render_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl LiveSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn backoff_interval(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_secs(self.render_secs)
    }

    /// Fetch request for the live instrument
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            symbol: self.symbol.clone(),
            interval: self.interval,
            period: self.period,
            timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}

/// Forecast instrument list and history window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSettings {
    #[serde(default = "default_instruments")]
    pub instruments: Vec<String>,
    /// First day of the training history
    #[serde(default = "default_history_start")]
    pub history_start: NaiveDate,
    #[serde(default = "default_max_years")]
    pub max_years: u32,
    /// Rows shown in the raw-data and forecast tails
    #[serde(default = "default_tail_rows")]
    pub tail_rows: usize,
    /// Trend and seasonality tuning
    #[serde(default)]
    pub model: ModelConfig,
}

fn default_instruments() -> Vec<String> {
    ["AAPL", "GOOG", "MSFT", "GME", "TSLA"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default()
}

fn default_max_years() -> u32 {
    4
}

fn default_tail_rows() -> usize {
    5
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            instruments: default_instruments(),
            history_start: default_history_start(),
            max_years: default_max_years(),
            tail_rows: default_tail_rows(),
            model: ModelConfig::default(),
        }
    }
}

/// Reasoning service and search tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Falls back to GEMINI_API_KEY when unset
    #[serde(default)]
    pub api_key: Option<String>,
    /// Maximum model/tool round trips per user turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_search_results")]
    pub search_results: usize,
    #[serde(default = "default_assistant_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Chat sessions idle longer than this are dropped
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    /// Upper bound on open chat sessions; the least recently used go first
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tool_rounds() -> u32 {
    4
}

fn default_search_url() -> String {
    "https://api.duckduckgo.com".to_string()
}

fn default_search_results() -> usize {
    5
}

fn default_assistant_timeout_secs() -> u64 {
    60
}

fn default_session_idle_secs() -> u64 {
    3600
}

fn default_max_sessions() -> usize {
    1000
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            api_key: None,
            max_tool_rounds: default_max_tool_rounds(),
            search_url: default_search_url(),
            search_results: default_search_results(),
            request_timeout_secs: default_assistant_timeout_secs(),
            session_idle_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl AssistantSettings {
    /// Configured key, or GEMINI_API_KEY from the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Dashboard server bind address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Yahoo Finance endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceSettings {
    #[serde(default = "default_data_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Client-wide timeout, also bounds history downloads
    #[serde(default = "default_data_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_data_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .to_string()
}

fn default_data_timeout_secs() -> u64 {
    30
}

impl Default for DataSourceSettings {
    fn default() -> Self {
        Self {
            base_url: default_data_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_data_timeout_secs(),
        }
    }
}

impl Settings {
    /// Load settings from `config_dir` and STOCKCAST__* variables
    pub fn load(config_dir: &Path) -> Result<Self> {
        Self::load_with_prefix(config_dir, ENV_PREFIX)
    }

    /// Load settings with a custom environment variable prefix
    pub fn load_with_prefix(config_dir: &Path, env_prefix: &str) -> Result<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let dir = config_dir.display();

        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Local overrides (not checked into git)
            .add_source(File::with_name(&format!("{}/local", dir)).required(false))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the pipelines cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.live.symbol.trim().is_empty() {
            return Err(AppError::Config("live.symbol must not be empty".into()));
        }
        if self.live.refresh_secs == 0 || self.live.backoff_secs == 0 || self.live.render_secs == 0
        {
            return Err(AppError::Config(
                "live cadences must be greater than zero".into(),
            ));
        }
        if self.forecast.instruments.is_empty() {
            return Err(AppError::Config(
                "forecast.instruments must list at least one symbol".into(),
            ));
        }
        if self.forecast.max_years == 0 {
            return Err(AppError::Config(
                "forecast.max_years must be greater than zero".into(),
            ));
        }
        if self.assistant.max_sessions == 0 {
            return Err(AppError::Config(
                "assistant.max_sessions must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_dashboard_cadences() {
        let settings = Settings::default();
        assert_eq!(settings.live.symbol, "RELIANCE.NS");
        assert_eq!(settings.live.refresh_interval(), Duration::from_secs(300));
        assert_eq!(settings.live.backoff_interval(), Duration::from_secs(60));
        assert_eq!(settings.live.render_interval(), Duration::from_secs(5));
        assert_eq!(settings.live.fetch_request().timeout, Duration::from_secs(15));
        assert_eq!(settings.forecast.instruments.len(), 5);
        assert_eq!(
            settings.forecast.history_start,
            NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load_with_prefix(dir.path(), "STOCKCAST_TEST_EMPTY").unwrap();
        assert_eq!(settings.server.port, 8501);
        assert_eq!(settings.live.interval, Interval::OneMinute);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
[live]
symbol = "TCS.NS"
interval = "5m"
period = "5d"
refresh_secs = 120

[forecast]
instruments = ["NVDA"]

[forecast.model]
n_changepoints = 10
"#
        )
        .unwrap();

        let settings = Settings::load_with_prefix(dir.path(), "STOCKCAST_TEST_FILE").unwrap();
        assert_eq!(settings.live.symbol, "TCS.NS");
        assert_eq!(settings.live.interval, Interval::FiveMinutes);
        assert_eq!(settings.live.period, Period::FiveDays);
        assert_eq!(settings.live.refresh_secs, 120);
        // Untouched fields keep their defaults
        assert_eq!(settings.live.backoff_secs, 60);
        assert_eq!(settings.forecast.instruments, vec!["NVDA".to_string()]);
        assert_eq!(settings.forecast.model.n_changepoints, 10);
        assert_eq!(settings.forecast.model.weekly_order, 3);
    }

    #[test]
    fn test_validate_rejects_zero_cadence() {
        let mut settings = Settings::default();
        settings.live.render_secs = 0;
        assert!(matches!(settings.validate(), Err(AppError::Config(_))));

        let mut settings = Settings::default();
        settings.forecast.instruments.clear();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.assistant.max_sessions = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_configured_api_key_wins() {
        let settings = AssistantSettings {
            api_key: Some("configured".into()),
            ..Default::default()
        };
        assert_eq!(settings.resolve_api_key().as_deref(), Some("configured"));
    }
}
