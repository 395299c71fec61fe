//! REST API types
//!
//! Every JSON response uses the `{status, message?, data?}` envelope.
//! Errors are rendered by [`crate::error::AppError`].

use crate::assistant::{ChatTurn, Transcript};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard API response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success_with_message(message: &str) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.to_string()),
            data: None,
        }
    }

    pub fn success_with_data(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            data: Some(data),
        }
    }
}

/// Placeholder payload for responses without data
#[derive(Debug, Serialize)]
pub struct Empty {}

/// GET /api/forecast query
#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub symbol: String,
    #[serde(default = "default_years")]
    pub years: u32,
}

fn default_years() -> u32 {
    1
}

/// GET /api/instruments payload
#[derive(Debug, Serialize)]
pub struct InstrumentsResult {
    pub instruments: Vec<String>,
    pub max_years: u32,
}

/// POST /api/chat/sessions/:id body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Chat session with its transcript
#[derive(Debug, Serialize)]
pub struct ChatSession {
    pub session_id: Uuid,
    pub turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(session_id: Uuid, transcript: Transcript) -> Self {
        Self {
            session_id,
            turns: transcript.turns().to_vec(),
        }
    }
}
