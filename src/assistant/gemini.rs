//! Google Gemini assistant
//!
//! Built on a rig agent: the system prompt is the preamble, earlier turns are
//! replayed as chat history and `search_web` is registered as a tool when
//! search is available. rig runs the tool round trips itself, bounded by
//! `max_tool_rounds`.

use super::prompt::SYSTEM_PROMPT;
use super::tool::SearchWebTool;
use super::{Assistant, ChatTurn, Role, Tools};
use crate::config::AssistantSettings;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use rig::agent::Agent;
use rig::client::CompletionClient;
use rig::completion::{Message, Prompt};
use rig::providers::gemini;
use std::future::IntoFuture;
use std::time::Duration;
use tracing::debug;

/// Gemini-backed [`Assistant`]
pub struct GeminiAssistant {
    client: gemini::Client,
    model: String,
    temperature: f32,
    max_tool_rounds: u32,
    timeout: Duration,
}

impl GeminiAssistant {
    /// Create a client, resolving the API key from settings or GEMINI_API_KEY
    pub fn from_settings(settings: &AssistantSettings) -> Result<Self> {
        let api_key = settings.resolve_api_key().ok_or_else(|| {
            AppError::Config(
                "No Gemini API key: set assistant.api_key or GEMINI_API_KEY".to_string(),
            )
        })?;

        Ok(Self {
            client: gemini::Client::new(&api_key),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tool_rounds: settings.max_tool_rounds,
            timeout: Duration::from_secs(settings.request_timeout_secs),
        })
    }

    fn agent(&self, tools: &Tools) -> Agent<gemini::completion::CompletionModel> {
        let mut builder = self
            .client
            .agent(&self.model)
            .preamble(SYSTEM_PROMPT)
            .temperature(f64::from(self.temperature));

        if let Some(search) = &tools.web_search {
            builder = builder.tool(SearchWebTool::new(search.clone()));
        }

        builder.build()
    }
}

/// Split a transcript into rig history and the user turn to answer
fn to_history(transcript: &[ChatTurn]) -> Result<(Vec<Message>, &str)> {
    match transcript.split_last() {
        Some((latest, earlier)) if latest.role == Role::User => {
            let history = earlier
                .iter()
                .map(|turn| match turn.role {
                    Role::User => Message::user(turn.content.clone()),
                    Role::Assistant => Message::assistant(turn.content.clone()),
                })
                .collect();
            Ok((history, latest.content.as_str()))
        }
        _ => Err(AppError::Assistant(
            "Transcript must end with a user turn".to_string(),
        )),
    }
}

#[async_trait]
impl Assistant for GeminiAssistant {
    fn name(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, transcript: &[ChatTurn], tools: &Tools) -> Result<ChatTurn> {
        let (mut history, question) = to_history(transcript)?;
        let agent = self.agent(tools);
        debug!(
            "Asking {} with {} prior turn(s), tools: {}",
            self.model,
            history.len(),
            tools.web_search.is_some()
        );

        let request = agent
            .prompt(Message::user(question))
            .with_history(&mut history)
            .multi_turn(self.max_tool_rounds as usize)
            .into_future();

        let answer = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| {
                AppError::Assistant(format!("Gemini gave no answer within {:?}", self.timeout))
            })?
            .map_err(|e| AppError::Assistant(e.to_string()))?;

        if answer.trim().is_empty() {
            return Err(AppError::Assistant(
                "Gemini returned an empty answer".to_string(),
            ));
        }
        Ok(ChatTurn::assistant(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_replays_earlier_turns() {
        let transcript = vec![
            ChatTurn::user("Why did TSLA fall?"),
            ChatTurn::assistant("Possible reasons include weak deliveries."),
            ChatTurn::user("And GME?"),
        ];
        let (history, question) = to_history(&transcript).unwrap();
        assert_eq!(question, "And GME?");
        assert_eq!(history.len(), 2);
        assert!(matches!(history[0], Message::User { .. }));
        assert!(matches!(history[1], Message::Assistant { .. }));
    }

    #[test]
    fn test_history_needs_trailing_user_turn() {
        assert!(matches!(to_history(&[]), Err(AppError::Assistant(_))));
        let answered = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        assert!(to_history(&answered).is_err());
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let settings = AssistantSettings {
            api_key: Some("   ".into()),
            ..Default::default()
        };
        if std::env::var("GEMINI_API_KEY").is_err() {
            assert!(matches!(
                GeminiAssistant::from_settings(&settings),
                Err(AppError::Config(_))
            ));
        }
    }

    #[tokio::test]
    #[ignore = "requires GEMINI_API_KEY"]
    async fn test_invoke_live() {
        let assistant = GeminiAssistant::from_settings(&AssistantSettings::default()).unwrap();
        let reply = assistant
            .invoke(&[ChatTurn::user("Say 'hello' and nothing else.")], &Tools::default())
            .await
            .unwrap();
        assert!(reply.content.to_lowercase().contains("hello"));
    }
}
