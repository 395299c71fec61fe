//! Services Layer
//!
//! Business logic shared between the CLI subcommands and the REST API
//! handlers.
//!
//! # Architecture
//!
//! ```text
//! CLI          ──┐
//!                ├──> Services --> AppState / data source / assistant
//! HTTP API     ──┘
//! ```
//!
//! # Services
//!
//! - `LiveService` - Start the live pipeline, read the rendered view
//! - `ForecastService` - History loading, model fit and forecast view
//! - `ChatService` - Chat sessions and assistant turns

pub mod chat_service;
pub mod forecast_service;
pub mod live_service;

pub use chat_service::ChatService;
pub use forecast_service::ForecastService;
pub use live_service::{LiveService, LiveTasks};
