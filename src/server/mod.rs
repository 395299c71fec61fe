//! Dashboard HTTP server
//!
//! Serves the rendered live view (polling and SSE), forecasts and the
//! assistant chat over a JSON API, plus a minimal page that uses them.

pub mod handlers;
pub mod server;
pub mod types;

pub use server::{router, DashboardServer};
pub use types::ApiResponse;
