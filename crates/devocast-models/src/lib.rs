//! Shared data models for the devocast video-assembly pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, job submissions, and the stage/status state machine
//! - The cross-crate error taxonomy (`ErrorKind`)
//! - Subtitle segments, SRT serialization, and the replacement dictionary
//! - Background-clip slots, search candidates, and dedup/blacklist rows
//! - Thumbnail layouts and intro/outro settings
//! - Timestamp parsing and formatting
//! - Output encoding configuration
//! - Weekly quota records

pub mod clip;
pub mod encoding;
pub mod error;
pub mod job;
pub mod layout;
pub mod quota;
pub mod subtitle;
pub mod timestamp;

pub use clip::{
    BlacklistEntry, Candidate, ClipFingerprint, ModerationVerdict, Slot, UsedClip,
    FALLBACK_QUERY_TAGS, MAX_QUERY_RELAXATIONS, MEAN_CLIP_LENGTH_RANGE, NORMALIZED_FPS,
    NORMALIZED_HEIGHT, NORMALIZED_PIXEL_FORMAT, NORMALIZED_VIDEO_CODEC, NORMALIZED_WIDTH,
    RECENCY_WINDOW_JOBS, SEARCH_PAGE_SIZE, plan_slot_count,
};
pub use encoding::EncodingConfig;
pub use error::ErrorKind;
pub use job::{Job, JobId, JobStatus, JobSubmission, RegenerationOverrides, StageName};
pub use layout::{IntroOutroSettings, TextBox, ThumbnailLayout};
pub use quota::{Hold, QuotaRecord};
pub use subtitle::{ReplacementEntry, SubtitleSegment, segments_are_well_ordered, to_srt};
