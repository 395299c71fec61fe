//! Chat Service
//!
//! Per-session transcripts and the assistant round trip.

use crate::assistant::Transcript;
use crate::error::{AppError, Result};
use crate::state::AppState;
use tracing::{info, warn};
use uuid::Uuid;

/// Chat service for business logic
pub struct ChatService;

impl ChatService {
    /// Open a new empty session
    pub fn create_session(state: &AppState) -> Uuid {
        let id = state.chat_sessions.create();
        info!("Created chat session {} ({} open)", id, state.chat_sessions.len());
        id
    }

    /// Close a session
    pub fn delete_session(state: &AppState, id: Uuid) -> Result<()> {
        if !state.chat_sessions.remove(id) {
            return Err(not_found(id));
        }
        info!("Closed chat session {}", id);
        Ok(())
    }

    /// Current transcript of a session, once any turn in flight has finished
    pub async fn transcript(state: &AppState, id: Uuid) -> Result<Transcript> {
        let session = state.chat_sessions.get(id).ok_or_else(|| not_found(id))?;
        let transcript = session.lock().await;
        Ok(transcript.clone())
    }

    /// Append `message`, ask the assistant and append its answer
    ///
    /// Returns the whole transcript. If the assistant fails the error is
    /// returned and the user turn stays recorded. The session stays locked
    /// for the whole turn, so a second message waits for this answer.
    pub async fn send_message(state: &AppState, id: Uuid, message: &str) -> Result<Transcript> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation("Message must not be empty".to_string()));
        }

        let assistant = state.assistant.clone().ok_or_else(|| {
            AppError::Config(
                "Assistant is not configured: set assistant.api_key or GEMINI_API_KEY".to_string(),
            )
        })?;

        let session = state.chat_sessions.get(id).ok_or_else(|| not_found(id))?;
        let mut transcript = session.lock().await;
        transcript.push_user(message);

        let reply = assistant.invoke(transcript.turns(), &state.tools).await;
        session.touch();
        match reply {
            Ok(reply) => {
                transcript.push_assistant(reply.content);
                Ok(transcript.clone())
            }
            Err(e) => {
                warn!("Assistant {} failed for session {}: {}", assistant.name(), id, e);
                Err(e)
            }
        }
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Chat session {} not found", id))
}
