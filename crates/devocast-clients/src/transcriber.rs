//! Transcriber: calls the external STT API and aggregates its word-level
//! timing into phrase-level `SubtitleSegment`s (§4.D).

use std::time::Duration;

use base64::Engine;
use devocast_models::SubtitleSegment;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

const SERVICE: &str = "stt";
/// Segments longer than this are split at the next silence gap or punctuation.
const MAX_SEGMENT_SECONDS: f64 = 6.0;
/// A word boundary gap wider than this starts a new segment (§4.D).
const SILENCE_GAP_SECONDS: f64 = 0.6;
const SOFT_PUNCTUATION: &[char] = &['.', '!', '?', ';'];

/// Audio content types the Transcriber accepts, keyed off the blob's
/// declared content type — never derived by slicing the filename (§4.D).
const ACCEPTED_CONTENT_TYPES: &[&str] = &["audio/mpeg", "audio/wav", "audio/x-wav", "audio/mp4", "audio/m4a"];

pub struct TranscriberClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct TranscribeRequest {
    audio_base64: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    words: Vec<RawWord>,
}

#[derive(Debug, Deserialize)]
struct RawWord {
    word: String,
    start: f64,
    end: f64,
}

impl TranscriberClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_env() -> ClientResult<Self> {
        let base_url = std::env::var("STT_API_BASE_URL").map_err(|_| ClientError::BadInput {
            service: SERVICE,
            message: "STT_API_BASE_URL not set".to_string(),
        })?;
        let api_key = std::env::var("STT_API_KEY").map_err(|_| ClientError::BadInput {
            service: SERVICE,
            message: "STT_API_KEY not set".to_string(),
        })?;
        Ok(Self::new(base_url, api_key))
    }

    /// Validate the blob's declared content type is one the Transcriber accepts.
    pub fn validate_content_type(content_type: &str) -> ClientResult<()> {
        if ACCEPTED_CONTENT_TYPES.contains(&content_type) {
            Ok(())
        } else {
            Err(ClientError::BadInput {
                service: SERVICE,
                message: format!("unsupported audio content type: {content_type}"),
            })
        }
    }

    /// Transcribe `audio_bytes` and aggregate the result into phrase-level segments.
    pub async fn transcribe(&self, audio_bytes: &[u8], language: &str) -> ClientResult<Vec<SubtitleSegment>> {
        let request = TranscribeRequest {
            audio_base64: base64::engine::general_purpose::STANDARD.encode(audio_bytes),
            language: language.to_string(),
        };

        info!(language, bytes = audio_bytes.len(), "calling transcriber");

        let response = self
            .client
            .post(format!("{}/v1/transcribe", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(600))
            .json(&request)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::REQUEST_TIMEOUT {
            return Err(ClientError::Timeout { service: SERVICE });
        }
        if response.status().is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Unavailable { service: SERVICE, message: body });
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                service: SERVICE,
                message: format!("{status}: {body}"),
            });
        }

        let parsed: TranscribeResponse = response.json().await?;
        debug!(word_count = parsed.words.len(), "transcriber returned words");

        Ok(aggregate_into_segments(&parsed.words))
    }
}

/// Group word-level timing into phrase-level segments by silence gap or
/// soft punctuation, bounded to `MAX_SEGMENT_SECONDS` (§4.D).
fn aggregate_into_segments(words: &[RawWord]) -> Vec<SubtitleSegment> {
    let mut segments = Vec::new();
    let mut current_words: Vec<&RawWord> = Vec::new();

    let flush = |words: &mut Vec<&RawWord>, segments: &mut Vec<SubtitleSegment>| {
        if words.is_empty() {
            return;
        }
        let start = words.first().unwrap().start;
        let end = words.last().unwrap().end;
        let text = words.iter().map(|w| w.word.as_str()).collect::<Vec<_>>().join(" ");
        segments.push(SubtitleSegment {
            index: segments.len() as u32 + 1,
            start_seconds: start,
            end_seconds: end,
            text,
        });
        words.clear();
    };

    for word in words {
        if let Some(prev) = current_words.last() {
            let gap = word.start - prev.end;
            let duration_so_far = prev.end - current_words.first().unwrap().start;
            let ends_in_punctuation = prev.word.chars().last().is_some_and(|c| SOFT_PUNCTUATION.contains(&c));

            if gap > SILENCE_GAP_SECONDS
                || duration_so_far >= MAX_SEGMENT_SECONDS
                || (ends_in_punctuation && duration_so_far >= 2.0)
            {
                flush(&mut current_words, &mut segments);
            }
        }
        current_words.push(word);
    }
    flush(&mut current_words, &mut segments);

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64, end: f64) -> RawWord {
        RawWord { word: text.to_string(), start, end }
    }

    #[test]
    fn silence_gap_starts_a_new_segment() {
        let words = vec![word("Grace", 0.0, 0.5), word("and", 0.5, 1.0), word("Peace", 2.0, 2.5)];
        let segments = aggregate_into_segments(&words);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Grace and");
        assert_eq!(segments[1].text, "Peace");
    }

    #[test]
    fn long_runs_split_at_max_duration() {
        let mut words = Vec::new();
        let mut t = 0.0;
        for i in 0..20 {
            words.push(word(&format!("word{i}"), t, t + 0.3));
            t += 0.3;
        }
        let segments = aggregate_into_segments(&words);
        assert!(segments.len() > 1);
        for seg in &segments {
            assert!(seg.duration() <= MAX_SEGMENT_SECONDS + 0.3);
        }
    }

    #[test]
    fn rejects_unsupported_content_type() {
        assert!(TranscriberClient::validate_content_type("video/mp4").is_err());
        assert!(TranscriberClient::validate_content_type("audio/mpeg").is_ok());
    }
}
