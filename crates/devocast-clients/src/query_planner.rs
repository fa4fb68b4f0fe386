//! Query Planner: summarizes a slot's subtitle text into a short noun
//! phrase for the Clip Source to search on (§4.F).

use devocast_models::FALLBACK_QUERY_TAGS;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ClientError, ClientResult};

const SERVICE: &str = "query-planner";
const MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.5-pro"];

pub struct QueryPlannerClient {
    api_key: String,
    client: Client,
    /// Rotates through the fallback tags so consecutive degraded slots don't
    /// all search on the same term.
    fallback_cursor: std::sync::atomic::AtomicUsize,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct QueryPhrase {
    query: String,
}

/// The planner never fails the job; unavailability degrades to a static tag.
pub struct PlannedQuery {
    pub query: String,
    pub degraded: bool,
}

impl QueryPlannerClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            fallback_cursor: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn from_env() -> ClientResult<Self> {
        let api_key = std::env::var("QUERY_PLANNER_API_KEY").map_err(|_| ClientError::BadInput {
            service: SERVICE,
            message: "QUERY_PLANNER_API_KEY not set".to_string(),
        })?;
        Ok(Self::new(api_key))
    }

    /// Summarize `slot_text` into a 3-6 word English noun phrase. Falls back
    /// to a static rotation on upstream unavailability rather than failing.
    pub async fn plan_query(&self, slot_text: &str) -> PlannedQuery {
        for model in MODELS {
            match self.call_model(model, slot_text).await {
                Ok(query) => return PlannedQuery { query, degraded: false },
                Err(e) => warn!(model, error = %e, "query planner model failed"),
            }
        }
        let tag = self.next_fallback_tag();
        info!(tag, "query planner degraded to fallback tag");
        PlannedQuery { query: tag.to_string(), degraded: true }
    }

    fn next_fallback_tag(&self) -> &'static str {
        let i = self.fallback_cursor.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        FALLBACK_QUERY_TAGS[i % FALLBACK_QUERY_TAGS.len()]
    }

    async fn call_model(&self, model: &str, slot_text: &str) -> ClientResult<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={}",
            self.api_key
        );

        let prompt = build_prompt(slot_text);
        let request = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig { response_mime_type: "application/json".to_string() },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if response.status().is_server_error() {
            return Err(ClientError::Unavailable {
                service: SERVICE,
                message: response.text().await.unwrap_or_default(),
            });
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected { service: SERVICE, message: format!("{status}: {body}") });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| ClientError::Unavailable {
                service: SERVICE,
                message: "no content in response".to_string(),
            })?;

        let phrase: QueryPhrase = serde_json::from_str(strip_markdown_fence(text))
            .map_err(|e| ClientError::Unavailable { service: SERVICE, message: e.to_string() })?;

        Ok(phrase.query)
    }
}

fn build_prompt(slot_text: &str) -> String {
    format!(
        r#"Summarize the following spoken phrase into a short noun phrase of 3 to 6 words, \
suitable as a stock footage search query. Return ONLY a JSON object: {{"query": "..."}}

PHRASE:
{slot_text}"#
    )
}

fn strip_markdown_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").or_else(|| text.strip_prefix("```")).unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fence() {
        let raw = "```json\n{\"query\": \"quiet mountain sunrise\"}\n```";
        assert_eq!(strip_markdown_fence(raw), "{\"query\": \"quiet mountain sunrise\"}");
    }

    #[test]
    fn fallback_rotates_through_tags() {
        let client = QueryPlannerClient::new("unused");
        let first = client.next_fallback_tag();
        let second = client.next_fallback_tag();
        assert_ne!(first, second);
    }
}
