//! DuckDuckGo web search tool

use super::{SearchHit, WebSearch};
use crate::config::AssistantSettings;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Web search over the DuckDuckGo Instant Answer API
pub struct DuckDuckGoSearch {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn from_settings(settings: &AssistantSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.search_url.trim_end_matches('/').to_string(),
            max_results: settings.search_results,
        })
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = Url::parse_with_params(
            &format!("{}/", self.base_url),
            &[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )
        .map_err(|e| AppError::Internal(format!("Invalid search URL: {}", e)))?;

        let response = self.client.get(url).send().await?.error_for_status()?;
        let answer: InstantAnswer = response.json().await?;
        let hits = collect_hits(answer, self.max_results);

        debug!("Search '{}' returned {} hits", query, hits.len());
        Ok(hits)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(default)]
    results: Vec<Topic>,
    #[serde(default)]
    related_topics: Vec<Topic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Topic {
    #[serde(default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
    /// Present on category groups, which nest further topics
    #[serde(default)]
    topics: Vec<Topic>,
}

fn topic_hit(topic: &Topic) -> Option<SearchHit> {
    if topic.text.is_empty() || topic.first_url.is_empty() {
        return None;
    }
    let title = topic
        .text
        .split(" - ")
        .next()
        .unwrap_or(&topic.text)
        .chars()
        .take(80)
        .collect();
    Some(SearchHit {
        title,
        url: topic.first_url.clone(),
        snippet: topic.text.clone(),
    })
}

/// Rank abstract first, then direct results, then related topics
fn collect_hits(answer: InstantAnswer, limit: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    if !answer.abstract_text.is_empty() {
        hits.push(SearchHit {
            title: answer.heading.clone(),
            url: answer.abstract_url.clone(),
            snippet: answer.abstract_text.clone(),
        });
    }

    hits.extend(answer.results.iter().filter_map(topic_hit));
    for topic in &answer.related_topics {
        if topic.topics.is_empty() {
            hits.extend(topic_hit(topic));
        } else {
            hits.extend(topic.topics.iter().filter_map(topic_hit));
        }
    }

    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Heading": "Tesla, Inc.",
        "AbstractText": "Tesla, Inc. is an American electric vehicle company.",
        "AbstractURL": "https://en.wikipedia.org/wiki/Tesla,_Inc.",
        "Results": [
            {"Text": "Official site - Tesla", "FirstURL": "https://www.tesla.com"}
        ],
        "RelatedTopics": [
            {"Text": "Elon Musk - CEO of Tesla", "FirstURL": "https://duckduckgo.com/Elon_Musk"},
            {"Name": "Companies", "Topics": [
                {"Text": "SpaceX - Aerospace company", "FirstURL": "https://duckduckgo.com/SpaceX"},
                {"Text": "", "FirstURL": ""}
            ]}
        ]
    }"#;

    #[test]
    fn test_collect_hits_ranks_and_flattens() {
        let answer: InstantAnswer = serde_json::from_str(SAMPLE).unwrap();
        let hits = collect_hits(answer, 5);

        assert_eq!(hits.len(), 4);
        assert_eq!(hits[0].title, "Tesla, Inc.");
        assert_eq!(hits[1].url, "https://www.tesla.com");
        assert_eq!(hits[2].title, "Elon Musk");
        assert_eq!(hits[3].title, "SpaceX");
    }

    #[test]
    fn test_collect_hits_respects_limit() {
        let answer: InstantAnswer = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(collect_hits(answer, 2).len(), 2);
    }

    #[test]
    fn test_empty_answer() {
        let answer: InstantAnswer = serde_json::from_str("{}").unwrap();
        assert!(collect_hits(answer, 5).is_empty());
    }
}
