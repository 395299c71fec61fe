//! `search_web` exposed to the model as a rig tool

use super::prompt::SEARCH_TOOL_DESCRIPTION;
use super::{format_hits, WebSearch};
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Arguments the model sends with a `search_web` call
#[derive(Debug, Deserialize)]
pub struct SearchArgs {
    pub query: String,
}

/// The search task itself died before answering
#[derive(Debug, Error)]
#[error("search_web task failed: {0}")]
pub struct SearchToolError(String);

/// Wraps a [`WebSearch`] so the agent can call it
#[derive(Clone)]
pub struct SearchWebTool {
    search: Arc<dyn WebSearch>,
}

impl SearchWebTool {
    pub fn new(search: Arc<dyn WebSearch>) -> Self {
        Self { search }
    }
}

impl Tool for SearchWebTool {
    const NAME: &'static str = "search_web";

    type Error = SearchToolError;
    type Args = SearchArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: SEARCH_TOOL_DESCRIPTION.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: SearchArgs) -> Result<String, SearchToolError> {
        let search = self.search.clone();
        info!("Assistant searching the web for '{}'", args.query);

        // rig wants a Sync future; the async_trait search future is only Send
        tokio::spawn(async move { run_search(search.as_ref(), &args.query).await })
            .await
            .map_err(|e| SearchToolError(e.to_string()))
    }
}

/// Search and format; a failed search becomes text the model can read
pub async fn run_search(search: &dyn WebSearch, query: &str) -> String {
    match search.search(query).await {
        Ok(hits) => format_hits(query, &hits),
        Err(e) => {
            warn!("Web search for '{}' failed: {}", query, e);
            format!("Search for '{}' failed: {}", query, e)
        }
    }
}
