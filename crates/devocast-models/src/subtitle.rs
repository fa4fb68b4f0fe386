//! Subtitle segments, the tenant replacement dictionary, and SRT serialization (§3, §6).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::format_srt_timestamp;

/// A single phrase-level caption (§3). Invariants enforced by callers:
/// `start < end`; within a job, segments do not overlap; `text` is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleSegment {
    pub index: u32,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

impl SubtitleSegment {
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    pub fn is_valid(&self) -> bool {
        self.start_seconds < self.end_seconds && !self.text.trim().is_empty()
    }
}

/// Verify the no-overlap, in-range invariant for a finalized segment list (§8).
pub fn segments_are_well_ordered(segments: &[SubtitleSegment], audio_duration: f64) -> bool {
    for seg in segments {
        if seg.start_seconds < 0.0 || seg.end_seconds > audio_duration + 0.001 {
            return false;
        }
        if !seg.is_valid() {
            return false;
        }
    }
    segments.windows(2).all(|w| w[0].end_seconds <= w[1].start_seconds + 1e-6)
}

/// Serialize a finalized segment list as a standard SRT file: UTF-8, LF line
/// endings, index starting at 1, times as `HH:MM:SS,mmm` (§6).
pub fn to_srt(segments: &[SubtitleSegment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        out.push_str(&(i as u32 + 1).to_string());
        out.push('\n');
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(seg.start_seconds),
            format_srt_timestamp(seg.end_seconds)
        ));
        out.push_str(&seg.text);
        out.push('\n');
        if i + 1 != segments.len() {
            out.push('\n');
        }
    }
    out
}

/// Per-tenant word substitution (§3). `(tenant_id, original_token)` is unique;
/// matching is whole-token and case-sensitive.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReplacementEntry {
    pub tenant_id: String,
    pub original_token: String,
    pub replacement_token: String,
    pub use_count: u64,
}

impl ReplacementEntry {
    pub fn new(tenant_id: impl Into<String>, original_token: impl Into<String>, replacement_token: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            original_token: original_token.into(),
            replacement_token: replacement_token.into(),
            use_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(index: u32, start: f64, end: f64, text: &str) -> SubtitleSegment {
        SubtitleSegment {
            index,
            start_seconds: start,
            end_seconds: end,
            text: text.to_string(),
        }
    }

    #[test]
    fn srt_format_matches_spec() {
        let segments = vec![seg(1, 0.0, 2.5, "Grace and peace"), seg(2, 2.5, 5.0, "to you")];
        let srt = to_srt(&segments);
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,500\nGrace and peace\n\n2\n"));
        assert!(!srt.ends_with('\n'));
    }

    #[test]
    fn overlap_detection() {
        let ok = vec![seg(1, 0.0, 2.0, "a"), seg(2, 2.0, 4.0, "b")];
        assert!(segments_are_well_ordered(&ok, 10.0));

        let overlapping = vec![seg(1, 0.0, 3.0, "a"), seg(2, 2.0, 4.0, "b")];
        assert!(!segments_are_well_ordered(&overlapping, 10.0));
    }

    #[test]
    fn out_of_range_segment_is_invalid() {
        let segments = vec![seg(1, 0.0, 12.0, "a")];
        assert!(!segments_are_well_ordered(&segments, 10.0));
    }
}
