//! Chat command - line-based assistant session

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::assistant::{DuckDuckGoSearch, GeminiAssistant, Tools};
use crate::config::Settings;
use crate::market::types::PriceSeries;
use crate::services::ChatService;
use crate::state::AppState;

pub async fn execute(settings: Settings) -> Result<()> {
    let assistant = GeminiAssistant::from_settings(&settings.assistant)
        .context("Market assistant needs a Gemini API key")?;
    let search = DuckDuckGoSearch::from_settings(&settings.assistant)?;

    let source = super::data_source(&settings)?;
    let live_symbol = settings.live.symbol.clone();
    let state = AppState::new(settings, source, PriceSeries::empty(live_symbol))
        .with_assistant(Arc::new(assistant), Tools::with_search(Arc::new(search)));
    let session = ChatService::create_session(&state);

    println!("Market assistant. Ask about stocks, or type 'exit' to quit.");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        match ChatService::send_message(&state, session, message).await {
            Ok(transcript) => {
                if let Some(turn) = transcript.last() {
                    println!("\nAssistant: {}", turn.content);
                }
            }
            Err(e) => eprintln!("\nAssistant unavailable: {}", e),
        }
    }
    Ok(())
}
