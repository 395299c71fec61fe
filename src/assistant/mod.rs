//! Conversational market assistant
//!
//! The reasoning service sits behind [`Assistant::invoke`]; it receives the
//! whole transcript plus the tools it may call and returns one assistant
//! turn. The crate ships a Gemini-backed assistant and a DuckDuckGo search
//! tool.

pub mod gemini;
pub mod prompt;
pub mod search;
pub mod session;
pub mod tool;

pub use gemini::GeminiAssistant;
pub use search::DuckDuckGoSearch;
pub use session::{Session, SessionStore};
pub use tool::SearchWebTool;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Speaker of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only conversation record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatTurn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatTurn::assistant(content));
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }
}

/// One ranked web search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Web search capability offered to the assistant
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Render hits as the text block handed back to the model
pub fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("Search results for '{}': no results found.", query);
    }

    let body: Vec<String> = hits
        .iter()
        .map(|h| format!("Title: {}\nSource: {}\nSummary: {}\n", h.title, h.url, h.snippet))
        .collect();
    format!("Search results for '{}':\n{}", query, body.join("\n"))
}

/// Tools the assistant may call while answering
#[derive(Clone, Default)]
pub struct Tools {
    pub web_search: Option<Arc<dyn WebSearch>>,
}

impl Tools {
    pub fn with_search(search: Arc<dyn WebSearch>) -> Self {
        Self {
            web_search: Some(search),
        }
    }
}

/// Reasoning service that answers the latest user turn
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Model or provider name, for logs
    fn name(&self) -> &str;

    /// Produce the next assistant turn for `transcript`
    async fn invoke(&self, transcript: &[ChatTurn], tools: &Tools) -> Result<ChatTurn>;
}
