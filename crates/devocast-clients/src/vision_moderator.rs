//! Vision Moderator: classifies a thumbnail candidate as ACCEPT/REJECT
//! against a fixed safety policy, cached by image hash (§4.H).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use base64::Engine;
use devocast_models::ModerationVerdict;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

const SERVICE: &str = "vision-moderator";
const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const POLICY_PROMPT: &str = "You are a content safety classifier for a devotional video platform. \
Given an image, respond ACCEPT if it contains no nudity, graphic violence, or hateful imagery, \
and no clearly identifiable human face shown in a degrading or violent context. Respond REJECT otherwise. \
Return ONLY a JSON object: {\"verdict\": \"ACCEPT\"} or {\"verdict\": \"REJECT\"}.";

pub struct VisionModeratorClient {
    api_key: String,
    client: Client,
    cache: RwLock<HashMap<String, (ModerationVerdict, Instant)>>,
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
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
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
struct VerdictPayload {
    verdict: String,
}

impl VisionModeratorClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), client: Client::new(), cache: RwLock::new(HashMap::new()) }
    }

    pub fn from_env() -> ClientResult<Self> {
        let api_key = std::env::var("VISION_MODERATOR_API_KEY").map_err(|_| ClientError::BadInput {
            service: SERVICE,
            message: "VISION_MODERATOR_API_KEY not set".to_string(),
        })?;
        Ok(Self::new(api_key))
    }

    /// Classify `image_bytes`, consulting the 24h process-local cache first.
    pub async fn classify(&self, image_bytes: &[u8]) -> ClientResult<ModerationVerdict> {
        let hash = hash_image(image_bytes);

        if let Some(verdict) = self.cached(&hash) {
            debug!(hash, "vision moderator cache hit");
            return Ok(verdict);
        }

        let verdict = self.call_model(image_bytes).await?;
        self.cache.write().unwrap().insert(hash, (verdict, Instant::now()));
        Ok(verdict)
    }

    fn cached(&self, hash: &str) -> Option<ModerationVerdict> {
        let cache = self.cache.read().unwrap();
        cache.get(hash).and_then(|(verdict, inserted_at)| {
            if inserted_at.elapsed() < CACHE_TTL {
                Some(*verdict)
            } else {
                None
            }
        })
    }

    async fn call_model(&self, image_bytes: &[u8]) -> ClientResult<ModerationVerdict> {
        info!(bytes = image_bytes.len(), "calling vision moderator");

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent?key={}",
            self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: POLICY_PROMPT.to_string() },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(image_bytes),
                        },
                    },
                ],
            }],
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

        let payload: VerdictPayload = serde_json::from_str(text.trim())
            .map_err(|e| ClientError::Unavailable { service: SERVICE, message: e.to_string() })?;

        match payload.verdict.as_str() {
            "ACCEPT" => Ok(ModerationVerdict::Accept),
            "REJECT" => Ok(ModerationVerdict::Reject),
            other => Err(ClientError::Unavailable {
                service: SERVICE,
                message: format!("unrecognized verdict: {other}"),
            }),
        }
    }
}

fn hash_image(image_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_images_hash_identically() {
        let a = hash_image(b"same bytes");
        let b = hash_image(b"same bytes");
        assert_eq!(a, b);
    }

    #[test]
    fn cache_expires_after_ttl() {
        let client = VisionModeratorClient::new("unused");
        let hash = hash_image(b"cached image");
        client.cache.write().unwrap().insert(
            hash.clone(),
            (ModerationVerdict::Accept, Instant::now() - CACHE_TTL - Duration::from_secs(1)),
        );
        assert!(client.cached(&hash).is_none());
    }

    #[test]
    fn cache_hit_within_ttl() {
        let client = VisionModeratorClient::new("unused");
        let hash = hash_image(b"fresh image");
        client.cache.write().unwrap().insert(hash.clone(), (ModerationVerdict::Reject, Instant::now()));
        assert_eq!(client.cached(&hash), Some(ModerationVerdict::Reject));
    }
}
