//! Configuration module
//!
//! Settings come from optional files in the config directory followed by
//! `STOCKCAST__*` environment variables. Every field has a default, so the
//! service starts with no configuration at all.

mod settings;

pub use settings::{
    AssistantSettings, DataSourceSettings, ForecastSettings, LiveSettings, ServerSettings,
    Settings, ENV_PREFIX,
};
