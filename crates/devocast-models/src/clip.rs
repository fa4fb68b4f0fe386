//! Background-clip data model: slots, search candidates, dedup/blacklist rows,
//! and the NormalizedClip contract (§3, §4.F, §4.G, §4.I).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Container/codec/resolution/fps/pixfmt contract a clip must meet to be
/// eligible for the Composer's fast concat-demuxer path (§3, §4.J).
pub const NORMALIZED_WIDTH: u32 = 1920;
pub const NORMALIZED_HEIGHT: u32 = 1080;
pub const NORMALIZED_FPS: f64 = 30.0;
pub const NORMALIZED_VIDEO_CODEC: &str = "h264";
pub const NORMALIZED_PIXEL_FORMAT: &str = "yuv420p";

/// A fingerprint of a clip file's actual container/codec/resolution/fps,
/// produced by probing (devocast-media). Compared against the constants
/// above to decide fast vs. slow path (§4.J decision rule).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipFingerprint {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub pixel_format: String,
    pub has_audio: bool,
}

impl ClipFingerprint {
    /// True if this fingerprint exactly matches the NormalizedClip contract.
    pub fn conforms_to_contract(&self) -> bool {
        self.codec == NORMALIZED_VIDEO_CODEC
            && self.width == NORMALIZED_WIDTH
            && self.height == NORMALIZED_HEIGHT
            && (self.fps - NORMALIZED_FPS).abs() < 0.01
            && self.pixel_format == NORMALIZED_PIXEL_FORMAT
            && !self.has_audio
    }
}

/// A contiguous time window in the output video, filled by exactly one
/// background clip (§4.F, GLOSSARY "Slot").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Slot {
    pub index: u32,
    pub start_seconds: f64,
    pub duration_seconds: f64,
    pub query_string: String,
    pub semantic_tags: Vec<String>,
}

impl Slot {
    /// Drop the most specific noun (the last word) to broaden a stalled query (§4.G step 4).
    pub fn relax_query(&self) -> String {
        let mut words: Vec<&str> = self.query_string.split_whitespace().collect();
        if words.len() > 1 {
            words.pop();
        }
        words.join(" ")
    }
}

/// Static fallback tags used when the summarization LLM is unavailable;
/// a degraded success, not an error (§4.F).
pub const FALLBACK_QUERY_TAGS: &[&str] = &["nature", "sky", "ocean", "forest", "light"];

/// A search result returned by the Clip Source's external search dependency (§6).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Candidate {
    pub external_clip_id: String,
    pub download_url: String,
    pub thumbnail_url: String,
    pub duration_seconds: f64,
}

/// `ACCEPT`/`REJECT` verdict from the Vision Moderator (§4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationVerdict {
    Accept,
    Reject,
}

/// A clip that appeared in a *successfully completed* job's output (§3).
/// `(job_id, external_clip_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UsedClip {
    pub tenant_id: String,
    pub job_id: String,
    pub external_clip_id: String,
    pub used_at: chrono::DateTime<chrono::Utc>,
}

/// Number of a tenant's most-recent successful jobs consulted for dedup (GLOSSARY "Recency window").
pub const RECENCY_WINDOW_JOBS: usize = 10;

/// A globally forbidden clip id, manually curated to backstop the Vision
/// Moderator's false negatives (§3, §4.H).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BlacklistEntry {
    pub external_clip_id: String,
    pub reason: String,
}

/// Maximum candidates fetched per search call (§4.G step 3).
pub const SEARCH_PAGE_SIZE: u32 = 15;
/// Maximum query relaxation attempts before falling back to the local pool (§4.G step 4).
pub const MAX_QUERY_RELAXATIONS: u32 = 2;
/// Mean clip length bounds used to pick slot count (§4.F).
pub const MEAN_CLIP_LENGTH_RANGE: (f64, f64) = (8.0, 12.0);

/// Compute slot count: `ceil(total_duration / mean_clip_length)`, choosing the
/// `mean_clip_length` in `[8s, 12s]` that minimizes the remainder (§4.F).
pub fn plan_slot_count(total_duration_seconds: f64) -> u32 {
    if total_duration_seconds <= 0.0 {
        return 0;
    }
    let (lo, hi) = MEAN_CLIP_LENGTH_RANGE;
    let mut best_count = (total_duration_seconds / lo).ceil() as u32;
    let mut best_remainder = f64::MAX;
    let mut mean = lo;
    while mean <= hi + 1e-9 {
        let count = (total_duration_seconds / mean).ceil() as u32;
        let remainder = (count as f64 * mean) - total_duration_seconds;
        if remainder < best_remainder {
            best_remainder = remainder;
            best_count = count.max(1);
        }
        mean += 0.5;
    }
    best_count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_check_rejects_any_mismatch() {
        let good = ClipFingerprint {
            codec: NORMALIZED_VIDEO_CODEC.into(),
            width: NORMALIZED_WIDTH,
            height: NORMALIZED_HEIGHT,
            fps: NORMALIZED_FPS,
            pixel_format: NORMALIZED_PIXEL_FORMAT.into(),
            has_audio: false,
        };
        assert!(good.conforms_to_contract());

        let mut bad = good.clone();
        bad.has_audio = true;
        assert!(!bad.conforms_to_contract());

        let mut bad_res = good.clone();
        bad_res.width = 1280;
        assert!(!bad_res.conforms_to_contract());
    }

    #[test]
    fn relax_query_drops_last_word() {
        let slot = Slot {
            index: 0,
            start_seconds: 0.0,
            duration_seconds: 10.0,
            query_string: "quiet mountain sunrise".into(),
            semantic_tags: vec![],
        };
        assert_eq!(slot.relax_query(), "quiet mountain");
    }

    #[test]
    fn slot_count_is_never_zero_for_positive_duration() {
        assert!(plan_slot_count(1.0) >= 1);
        assert!(plan_slot_count(180.0) >= 1);
    }

    #[test]
    fn slot_count_roughly_matches_mean_clip_length() {
        // 180s / 10s mean ~= 18 slots (matches the happy-path scenario, §8.1)
        let count = plan_slot_count(180.0);
        assert!((15..=23).contains(&count), "got {count}");
    }
}
