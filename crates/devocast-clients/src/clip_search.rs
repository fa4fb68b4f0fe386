//! Clip Source search dependency: looks up stock background footage by
//! query string (§4.G step 3, §6).

use devocast_models::{Candidate, SEARCH_PAGE_SIZE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ClientError, ClientResult};

const SERVICE: &str = "clip-search";

pub struct ClipSearchClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    per_page: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: String,
    download_url: String,
    thumbnail_url: String,
    duration_seconds: f64,
}

impl ClipSearchClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into(), api_key: api_key.into() }
    }

    pub fn from_env() -> ClientResult<Self> {
        let base_url = std::env::var("CLIP_SEARCH_API_BASE_URL").map_err(|_| ClientError::BadInput {
            service: SERVICE,
            message: "CLIP_SEARCH_API_BASE_URL not set".to_string(),
        })?;
        let api_key = std::env::var("CLIP_SEARCH_API_KEY").map_err(|_| ClientError::BadInput {
            service: SERVICE,
            message: "CLIP_SEARCH_API_KEY not set".to_string(),
        })?;
        Ok(Self::new(base_url, api_key))
    }

    /// Search for up to `SEARCH_PAGE_SIZE` candidate clips matching `query`.
    pub async fn search(&self, query: &str) -> ClientResult<Vec<Candidate>> {
        info!(query, "searching clip source");

        let response = self
            .client
            .get(format!("{}/v1/search", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&SearchRequest { query, per_page: SEARCH_PAGE_SIZE })
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::REQUEST_TIMEOUT {
            return Err(ClientError::Timeout { service: SERVICE });
        }
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

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed
            .results
            .into_iter()
            .take(SEARCH_PAGE_SIZE as usize)
            .map(|r| Candidate {
                external_clip_id: r.id,
                download_url: r.download_url,
                thumbnail_url: r.thumbnail_url,
                duration_seconds: r.duration_seconds,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_maps_onto_candidate() {
        let result = SearchResult {
            id: "abc123".to_string(),
            download_url: "https://example.com/abc123.mp4".to_string(),
            thumbnail_url: "https://example.com/abc123.jpg".to_string(),
            duration_seconds: 14.5,
        };
        let candidate = Candidate {
            external_clip_id: result.id,
            download_url: result.download_url,
            thumbnail_url: result.thumbnail_url,
            duration_seconds: result.duration_seconds,
        };
        assert_eq!(candidate.external_clip_id, "abc123");
        assert!(candidate.duration_seconds > 0.0);
    }
}
