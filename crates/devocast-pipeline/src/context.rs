//! The state a stage is handed: the job row, a scratch directory, and every
//! collaborator it might need to call (§4.L).

use std::path::PathBuf;
use std::sync::Arc;

use devocast_clients::{ClipSearchClient, QueryPlannerClient, TranscriberClient, VisionModeratorClient};
use devocast_media::ClipInput;
use devocast_models::{Job, Slot, SubtitleSegment, ThumbnailLayout};
use devocast_quota::QuotaRepository;
use devocast_queue::ProgressChannel;
use devocast_storage::BlobStoreClient;
use devocast_store::{BlacklistRepository, JobRepository, LayoutRepository, ReplacementDictionaryRepository, SubtitleRepository, UsedClipRepository};

/// Everything a stage might call out to. Built once per worker process and
/// shared (via `Arc`) across every job it runs.
pub struct Collaborators {
    pub job_repo: JobRepository,
    pub blacklist_repo: BlacklistRepository,
    pub used_clip_repo: UsedClipRepository,
    pub layout_repo: LayoutRepository,
    pub subtitle_repo: SubtitleRepository,
    pub replacement_repo: ReplacementDictionaryRepository,
    pub quota_repo: QuotaRepository,
    pub blob_store: BlobStoreClient,
    pub transcriber: TranscriberClient,
    pub query_planner: QueryPlannerClient,
    pub clip_search: ClipSearchClient,
    pub vision_moderator: VisionModeratorClient,
    pub progress: ProgressChannel,
    /// Local pool of pre-normalized clips available with zero re-encode
    /// (§4.G step 1). A directory of files already meeting the
    /// NormalizedClip contract; empty in deployments with no seeded pool.
    pub clip_pool_dir: PathBuf,
    /// Content-addressed cache of previously-downloaded-and-normalized
    /// external clips, keyed by `external_clip_id` (§4.G step 2).
    pub clip_cache_dir: PathBuf,
}

/// Per-job mutable state threaded through the stage sequence. A stage reads
/// and writes `job` and `work_dir`; it never talks to the Job Store directly
/// except through the orchestrator's post-stage persistence (§4.L).
pub struct JobContext {
    pub job: Job,
    /// Firestore `update_time` the orchestrator's last successful write
    /// observed, round-tripped into the next `save_with_precondition` call.
    pub update_time: Option<String>,
    /// Scratch directory for this job run's intermediate files; removed by
    /// the worker once the job reaches a terminal state.
    pub work_dir: PathBuf,
    pub collaborators: Arc<Collaborators>,
    pub scratch: Scratch,
}

/// In-process working state handed from one stage to the next. None of this
/// is persisted directly — only the `Job` fields a stage derives from it are
/// (§4.L: stages mutate the Job Store only through their result envelope).
#[derive(Default)]
pub struct Scratch {
    pub source_audio_path: Option<PathBuf>,
    pub audio_duration_seconds: Option<f64>,
    pub raw_segments: Vec<SubtitleSegment>,
    pub final_segments: Vec<SubtitleSegment>,
    pub slots: Vec<Slot>,
    /// One resolved clip per slot, in slot order.
    pub selected_clips: Vec<ClipInput>,
    /// External clip ids accepted this run, persisted to `UsedClip` only at
    /// `finalize` so a failed job never poisons the dedup window (§4.G).
    pub pending_used_clip_ids: Vec<String>,
    pub layout: Option<ThumbnailLayout>,
    pub body_video_path: Option<PathBuf>,
    pub final_video_path: Option<PathBuf>,
    pub srt_path: Option<PathBuf>,
    pub thumbnail_path: Option<PathBuf>,
}

impl JobContext {
    pub fn new(job: Job, update_time: Option<String>, work_dir: PathBuf, collaborators: Arc<Collaborators>) -> Self {
        Self { job, update_time, work_dir, collaborators, scratch: Scratch::default() }
    }

    pub fn scratch_path(&self, file_name: &str) -> PathBuf {
        self.work_dir.join(file_name)
    }

    /// Re-fetch `cancel_requested` from the Job Store. Stages poll this at
    /// natural break points rather than the orchestrator preempting them
    /// mid-ffmpeg-call (§4.L "cooperative cancellation").
    pub async fn cancel_requested(&self) -> devocast_store::StoreResult<bool> {
        Ok(self
            .collaborators
            .job_repo
            .get(&self.job.job_id)
            .await?
            .map(|j| j.cancel_requested)
            .unwrap_or(self.job.cancel_requested))
    }
}
