//! HTTP handlers for the dashboard API

use crate::error::Result;
use crate::server::types::{
    ApiResponse, ChatRequest, ChatSession, Empty, ForecastQuery, InstrumentsResult,
};
use crate::services::{ChatService, ForecastService, LiveService};
use crate::state::AppState;
use crate::view::{ForecastView, LiveView};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    Json,
};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

const INDEX_HTML: &str = include_str!("index.html");

/// Health check - GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::<Empty>::success_with_message("Stockcast API is running"))
}

/// Dashboard page - GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ============================================================================
// Live pipeline
// ============================================================================

/// Latest rendered live view - GET /api/live
pub async fn get_live(State(state): State<Arc<AppState>>) -> Json<ApiResponse<LiveView>> {
    Json(ApiResponse::success_with_data(LiveService::current_view(&state)))
}

/// Live views as server-sent events - GET /api/live/stream
///
/// Sends the current view right away, then one event per render tick.
pub async fn live_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut rx = state.subscribe_views();
    rx.mark_changed();
    debug!("Live stream client connected");

    Sse::new(view_events(rx)).keep_alive(KeepAlive::default())
}

fn view_events(
    rx: watch::Receiver<LiveView>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let view = rx.borrow_and_update().clone();
        let event = Event::default()
            .event("live")
            .json_data(&view)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
        Some((Ok(event), rx))
    })
}

// ============================================================================
// Forecast
// ============================================================================

/// Forecast instrument list - GET /api/instruments
pub async fn get_instruments(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<InstrumentsResult>> {
    Json(ApiResponse::success_with_data(InstrumentsResult {
        instruments: ForecastService::instruments(&state).to_vec(),
        max_years: state.settings.forecast.max_years,
    }))
}

/// Forecast view - GET /api/forecast?symbol=AAPL&years=2
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ApiResponse<ForecastView>>> {
    info!("Forecast request: {} for {} year(s)", query.symbol, query.years);
    let view = ForecastService::get_forecast(&state, &query.symbol, query.years).await?;
    Ok(Json(ApiResponse::success_with_data(view)))
}

// ============================================================================
// Chat
// ============================================================================

/// New chat session - POST /api/chat/sessions
pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let id = ChatService::create_session(&state);
    (
        StatusCode::CREATED,
        Json(ApiResponse::success_with_data(ChatSession {
            session_id: id,
            turns: Vec::new(),
        })),
    )
}

/// Session transcript - GET /api/chat/sessions/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ChatSession>>> {
    let transcript = ChatService::transcript(&state, id).await?;
    Ok(Json(ApiResponse::success_with_data(ChatSession::new(id, transcript))))
}

/// Close a session - DELETE /api/chat/sessions/:id
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Empty>>> {
    ChatService::delete_session(&state, id)?;
    Ok(Json(ApiResponse::success_with_message("Chat session closed")))
}

/// Send a message - POST /api/chat/sessions/:id
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatSession>>> {
    let transcript = ChatService::send_message(&state, id, &request.message).await?;
    Ok(Json(ApiResponse::success_with_data(ChatSession::new(id, transcript))))
}
