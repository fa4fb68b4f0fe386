//! The Job record: identity, inputs, lifecycle state, and outputs.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ErrorKind;

/// Opaque job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct JobId(String);

impl JobId {
    /// Generate a new random job id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an existing id string (e.g. read back from the Job Store).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Overall lifecycle status (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses are write-once (§3 invariant).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stage names, in pipeline order (§4.L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    ValidateInput,
    Transcribe,
    PostProcessSubtitles,
    PlanQueries,
    AcquireClips,
    ComposeBody,
    ApplyIntroOutro,
    PersistArtifacts,
    Finalize,
}

impl StageName {
    pub const ORDER: [StageName; 9] = [
        Self::ValidateInput,
        Self::Transcribe,
        Self::PostProcessSubtitles,
        Self::PlanQueries,
        Self::AcquireClips,
        Self::ComposeBody,
        Self::ApplyIntroOutro,
        Self::PersistArtifacts,
        Self::Finalize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidateInput => "validate_input",
            Self::Transcribe => "transcribe",
            Self::PostProcessSubtitles => "post_process_subtitles",
            Self::PlanQueries => "plan_queries",
            Self::AcquireClips => "acquire_clips",
            Self::ComposeBody => "compose_body",
            Self::ApplyIntroOutro => "apply_intro_outro",
            Self::PersistArtifacts => "persist_artifacts",
            Self::Finalize => "finalize",
        }
    }

    /// The `[lo, hi]` progress band this stage may advance within (§4.L).
    pub fn progress_band(&self) -> (u8, u8) {
        match self {
            Self::ValidateInput => (0, 5),
            Self::Transcribe => (5, 20),
            Self::PostProcessSubtitles => (20, 25),
            Self::PlanQueries => (25, 30),
            Self::AcquireClips => (30, 55),
            Self::ComposeBody => (55, 80),
            Self::ApplyIntroOutro => (80, 90),
            Self::PersistArtifacts => (90, 98),
            Self::Finalize => (98, 100),
        }
    }

    /// Maximum stage attempts before a retryable error is promoted to fatal (§4.L).
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::Transcribe => 2,
            Self::AcquireClips => 4,
            _ => 3,
        }
    }

    /// Per-stage wall-clock timeout (§5).
    pub fn timeout(&self) -> std::time::Duration {
        use std::time::Duration;
        match self {
            Self::Transcribe => Duration::from_secs(10 * 60),
            Self::AcquireClips => Duration::from_secs(15 * 60),
            Self::ComposeBody => Duration::from_secs(20 * 60),
            _ => Duration::from_secs(2 * 60),
        }
    }

    pub fn next(&self) -> Option<StageName> {
        let idx = Self::ORDER.iter().position(|s| s == self)?;
        Self::ORDER.get(idx + 1).copied()
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strongly-typed, validated submission payload (§9 "dynamic typing at API boundaries").
///
/// Inbound options are parsed once into this struct; unknown fields are rejected
/// by `serde(deny_unknown_fields)` at the boundary, and downstream code never
/// inspects a raw map again.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct JobSubmission {
    #[validate(length(min = 1))]
    pub audio_blob_url: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub layout_id: Option<String>,
    pub clip_overrides: Option<Vec<String>>,
    pub bgm_blob_url: Option<String>,
    #[validate(range(min = 0.0, max = 0.5))]
    #[serde(default)]
    pub bgm_gain: f32,
}

/// Overrides accepted by `regenerate_job` (§6); anything left `None` is copied
/// verbatim from the source job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RegenerationOverrides {
    pub title: Option<String>,
    pub layout_id: Option<String>,
    pub bgm_blob_url: Option<String>,
    pub bgm_gain: Option<f32>,
}

/// The unit of work (§3).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub job_id: JobId,
    pub tenant_id: String,
    pub user_id: String,

    pub audio_blob_url: String,
    pub title: String,
    pub layout_id: Option<String>,
    pub clip_overrides: Option<Vec<String>>,
    pub bgm_blob_url: Option<String>,
    pub bgm_gain: f32,

    pub status: JobStatus,
    pub stage: Option<StageName>,
    pub progress: u8,
    pub error_kind: Option<ErrorKind>,
    pub error_detail: Option<String>,
    pub attempts: u32,
    /// Set by `cancel_job`; polled cooperatively by the orchestrator (§4.L).
    pub cancel_requested: bool,

    pub video_blob_url: Option<String>,
    pub subtitle_blob_url: Option<String>,
    pub thumbnail_blob_url: Option<String>,
    pub duration_seconds: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// `regenerate_job` threads this through so a derived job's `UsedClip`
    /// history is still distinct from its source (§8 scenario 6).
    pub regenerated_from: Option<JobId>,
}

impl Job {
    /// Create a fresh job in `queued` from a validated submission.
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>, submission: JobSubmission) -> Self {
        Self {
            job_id: JobId::new(),
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            audio_blob_url: submission.audio_blob_url,
            title: submission.title,
            layout_id: submission.layout_id,
            clip_overrides: submission.clip_overrides,
            bgm_blob_url: submission.bgm_blob_url,
            bgm_gain: submission.bgm_gain,
            status: JobStatus::Queued,
            stage: None,
            progress: 0,
            error_kind: None,
            error_detail: None,
            attempts: 0,
            cancel_requested: false,
            video_blob_url: None,
            subtitle_blob_url: None,
            thumbnail_blob_url: None,
            duration_seconds: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            regenerated_from: None,
        }
    }

    /// Build a regeneration job that copies the source audio and layout (§6).
    pub fn regenerate_from(source: &Job, overrides: RegenerationOverrides) -> Self {
        let mut submission = JobSubmission {
            audio_blob_url: source.audio_blob_url.clone(),
            title: overrides.title.unwrap_or_else(|| source.title.clone()),
            layout_id: overrides.layout_id.or_else(|| source.layout_id.clone()),
            clip_overrides: source.clip_overrides.clone(),
            bgm_blob_url: overrides.bgm_blob_url.or_else(|| source.bgm_blob_url.clone()),
            bgm_gain: overrides.bgm_gain.unwrap_or(source.bgm_gain),
        };
        submission.bgm_gain = submission.bgm_gain.clamp(0.0, 0.5);
        let mut job = Self::new(source.tenant_id.clone(), source.user_id.clone(), submission);
        job.regenerated_from = Some(source.job_id.clone());
        job
    }

    /// `queued → running` transition. Callers must guard this with the Job
    /// Store's compare-and-set on `status` (§4.L); this method only mutates
    /// the in-memory record once that CAS has won.
    pub fn start(mut self) -> Self {
        self.status = JobStatus::Running;
        self.stage = Some(StageName::ValidateInput);
        self.started_at = Some(Utc::now());
        self.attempts += 1;
        self
    }

    /// Apply a monotonic progress update; writes that would roll back progress
    /// are silently clamped to the current value (§4.L "progress writes never
    /// roll back").
    pub fn with_progress(mut self, stage: StageName, progress: u8) -> Self {
        self.stage = Some(stage);
        self.progress = self.progress.max(progress.min(100));
        self
    }

    pub fn complete(mut self, video_blob_url: String, subtitle_blob_url: String, thumbnail_blob_url: String, duration_seconds: f64) -> Self {
        self.status = JobStatus::Succeeded;
        self.stage = Some(StageName::Finalize);
        self.progress = 100;
        self.video_blob_url = Some(video_blob_url);
        self.subtitle_blob_url = Some(subtitle_blob_url);
        self.thumbnail_blob_url = Some(thumbnail_blob_url);
        self.duration_seconds = Some(duration_seconds);
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn fail(mut self, kind: ErrorKind, detail: impl Into<String>) -> Self {
        self.status = JobStatus::Failed;
        self.error_kind = Some(kind);
        self.error_detail = Some(detail.into());
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn cancel(mut self) -> Self {
        self.status = JobStatus::Cancelled;
        self.error_kind = Some(ErrorKind::Cancelled);
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn request_cancel(mut self) -> Self {
        self.cancel_requested = true;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> JobSubmission {
        JobSubmission {
            audio_blob_url: "https://blob/tenant/audio.m4a".into(),
            title: "Sunday sermon".into(),
            layout_id: None,
            clip_overrides: None,
            bgm_blob_url: None,
            bgm_gain: 0.2,
        }
    }

    #[test]
    fn new_job_starts_queued_with_zero_progress() {
        let job = Job::new("tenant-1", "user-1", submission());
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(!job.is_terminal());
    }

    #[test]
    fn progress_is_monotonic() {
        let job = Job::new("tenant-1", "user-1", submission())
            .start()
            .with_progress(StageName::Transcribe, 15)
            .with_progress(StageName::Transcribe, 10);
        assert_eq!(job.progress, 15);
    }

    #[test]
    fn stage_order_and_bands_cover_0_to_100() {
        let mut stage = Some(StageName::ValidateInput);
        let mut lo_prev = 0;
        while let Some(s) = stage {
            let (lo, hi) = s.progress_band();
            assert_eq!(lo, lo_prev);
            assert!(hi > lo);
            lo_prev = hi;
            stage = s.next();
        }
        assert_eq!(lo_prev, 100);
    }

    #[test]
    fn regenerate_copies_audio_and_layout_but_not_identity() {
        let source = Job::new("tenant-1", "user-1", submission())
            .start()
            .complete("v".into(), "s".into(), "t".into(), 90.0);
        let regen = Job::regenerate_from(&source, RegenerationOverrides::default());
        assert_ne!(regen.job_id, source.job_id);
        assert_eq!(regen.audio_blob_url, source.audio_blob_url);
        assert_eq!(regen.status, JobStatus::Queued);
        assert_eq!(regen.regenerated_from, Some(source.job_id));
    }

    #[test]
    fn terminal_status_is_write_once_by_convention() {
        let job = Job::new("tenant-1", "user-1", submission())
            .start()
            .complete("v".into(), "s".into(), "t".into(), 90.0);
        assert!(job.is_terminal());
    }
}
