//! HTTP server for the dashboard API
//!
//! Provides:
//! - Live view snapshot and SSE stream (/api/live, /api/live/stream)
//! - Forecasts for the configured instruments (/api/forecast)
//! - Assistant chat sessions (/api/chat/sessions, /api/chat/sessions/:id)

use crate::config::ServerSettings;
use crate::error::{AppError, Result};
use crate::server::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Open SSE streams keep connections alive, so shutdown waits only this long
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Build the router with all routes
pub fn router(state: Arc<AppState>) -> Router {
    // Allow all origins for local use
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ================================================================
        // Health check and page
        // ================================================================
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::index))
        // ================================================================
        // Live pipeline
        // ================================================================
        .route("/api/live", get(handlers::get_live))
        .route("/api/live/stream", get(handlers::live_stream))
        // ================================================================
        // Forecast
        // ================================================================
        .route("/api/instruments", get(handlers::get_instruments))
        .route("/api/forecast", get(handlers::get_forecast))
        // ================================================================
        // Chat
        // ================================================================
        .route("/api/chat/sessions", post(handlers::create_session))
        .route(
            "/api/chat/sessions/:id",
            get(handlers::get_session)
                .post(handlers::post_message)
                .delete(handlers::delete_session),
        )
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Dashboard API server manager
pub struct DashboardServer {
    state: Arc<AppState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl DashboardServer {
    /// Create a new server
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            shutdown_tx: None,
            join: None,
        }
    }

    /// Bind and start serving, returning the bound address
    pub async fn start(&mut self, config: &ServerSettings) -> Result<SocketAddr> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid address: {}", e)))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let app = router(self.state.clone());

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        info!("Starting Stockcast API server on {}", local_addr);

        self.join = Some(tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            });

            if let Err(e) = server.await {
                error!("API server error: {}", e);
            }
        }));

        info!("");
        info!("=== Endpoints ===");
        info!("  GET  http://{}/", local_addr);
        info!("  GET  http://{}/health", local_addr);
        info!("  GET  http://{}/api/live", local_addr);
        info!("  GET  http://{}/api/live/stream", local_addr);
        info!("  GET  http://{}/api/instruments", local_addr);
        info!("  GET  http://{}/api/forecast?symbol=AAPL&years=1", local_addr);
        info!("  POST http://{}/api/chat/sessions", local_addr);
        info!("  GET  http://{}/api/chat/sessions/{{id}}", local_addr);
        info!("  POST http://{}/api/chat/sessions/{{id}}", local_addr);
        info!("  DEL  http://{}/api/chat/sessions/{{id}}", local_addr);

        Ok(local_addr)
    }

    /// Stop the server and wait for it to finish
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("API server stop signal sent");
        }

        if let Some(join) = self.join.take() {
            let abort = join.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, join).await.is_err() {
                warn!("API server did not drain within {:?}, aborting", SHUTDOWN_GRACE);
                abort.abort();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }
}

impl Drop for DashboardServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{Assistant, ChatTurn, Tools};
    use crate::config::Settings;
    use crate::market::types::{Bar, FetchRequest, Interval, PriceSeries};
    use crate::market::DataSource;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
    use reqwest::StatusCode;
    use serde_json::Value;

    struct FakeSource;

    #[async_trait]
    impl DataSource for FakeSource {
        fn id(&self) -> &'static str {
            "fake"
        }

        fn name(&self) -> &'static str {
            "Fake"
        }

        async fn fetch(&self, request: &FetchRequest) -> Result<PriceSeries> {
            Ok(PriceSeries::empty(&request.symbol))
        }

        async fn fetch_range(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
            _interval: Interval,
        ) -> Result<PriceSeries> {
            let bars = (0..40)
                .map(|d| Bar {
                    timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                        + ChronoDuration::days(d),
                    open: 10.0 + d as f64,
                    high: 11.0 + d as f64,
                    low: 9.0 + d as f64,
                    close: 10.0 + d as f64,
                    volume: 100,
                })
                .collect();
            Ok(PriceSeries::from_bars(symbol, bars))
        }
    }

    struct EchoAssistant;

    #[async_trait]
    impl Assistant for EchoAssistant {
        fn name(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, transcript: &[ChatTurn], _tools: &Tools) -> Result<ChatTurn> {
            let last = transcript.last().map(|t| t.content.clone()).unwrap_or_default();
            Ok(ChatTurn::assistant(format!("echo: {}", last)))
        }
    }

    async fn start_server() -> (DashboardServer, String) {
        let state = AppState::new(
            Settings::default(),
            Arc::new(FakeSource),
            PriceSeries::empty("RELIANCE.NS"),
        )
        .with_assistant(Arc::new(EchoAssistant), Tools::default());

        let mut server = DashboardServer::new(Arc::new(state));
        let addr = server
            .start(&ServerSettings {
                host: "127.0.0.1".into(),
                port: 0,
            })
            .await
            .unwrap();
        (server, format!("http://{}", addr))
    }

    #[tokio::test]
    async fn test_health_and_live() {
        let (mut server, base) = start_server().await;
        let client = reqwest::Client::new();

        let health: Value = client
            .get(format!("{}/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "success");

        let live: Value = client
            .get(format!("{}/api/live", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(live["data"]["state"], "loading");

        server.stop().await;
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_forecast_endpoint() {
        let (mut server, base) = start_server().await;
        let client = reqwest::Client::new();

        let ok = client
            .get(format!("{}/api/forecast?symbol=AAPL&years=1", base))
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        let body: Value = ok.json().await.unwrap();
        assert_eq!(body["data"]["horizon_days"], 365);
        assert_eq!(body["data"]["forecast"].as_array().unwrap().len(), 40 + 365);

        let bad = client
            .get(format!("{}/api/forecast?symbol=AAPL&years=9", base))
            .send()
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        let body: Value = bad.json().await.unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "VALIDATION_ERROR");

        server.stop().await;
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let (mut server, base) = start_server().await;
        let client = reqwest::Client::new();

        let created = client
            .post(format!("{}/api/chat/sessions", base))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let created: Value = created.json().await.unwrap();
        let id = created["data"]["session_id"].as_str().unwrap().to_string();

        let reply: Value = client
            .post(format!("{}/api/chat/sessions/{}", base, id))
            .json(&serde_json::json!({ "message": "Why did GME rally?" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let turns = reply["data"]["turns"].as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1]["role"], "assistant");
        assert_eq!(turns[1]["content"], "echo: Why did GME rally?");

        let missing = client
            .get(format!("{}/api/chat/sessions/{}", base, uuid::Uuid::new_v4()))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let closed = client
            .delete(format!("{}/api/chat/sessions/{}", base, id))
            .send()
            .await
            .unwrap();
        assert_eq!(closed.status(), StatusCode::OK);
        let gone = client
            .get(format!("{}/api/chat/sessions/{}", base, id))
            .send()
            .await
            .unwrap();
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);

        server.stop().await;
    }
}
