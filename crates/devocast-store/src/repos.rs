//! Typed repositories backing the Job Store: jobs, subtitle segments, thumbnail
//! layouts, clip-dedup history, the global blacklist, and per-tenant word
//! replacement dictionaries (§3, §6 "Persisted state layout").

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use devocast_models::{
    BlacklistEntry, ErrorKind, Job, JobId, JobStatus, ReplacementEntry, StageName, SubtitleSegment,
    ThumbnailLayout, UsedClip,
};

use crate::client::FirestoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{ArrayValue, Document, FromFirestoreValue, MapValue, ToFirestoreValue, Value};

const JOBS_COLLECTION: &str = "jobs";
const LAYOUTS_COLLECTION: &str = "layouts";
const BLACKLIST_COLLECTION: &str = "blacklist";

fn field_string(fields: &HashMap<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(String::from_firestore_value)
}

fn field_opt_string(fields: &HashMap<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::NullValue(())) | None => None,
        Some(v) => String::from_firestore_value(v),
    }
}

fn field_timestamp(fields: &HashMap<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    match fields.get(key) {
        Some(Value::NullValue(())) | None => None,
        Some(v) => DateTime::<Utc>::from_firestore_value(v),
    }
}

fn parse_status(s: &str) -> StoreResult<JobStatus> {
    match s {
        "queued" => Ok(JobStatus::Queued),
        "running" => Ok(JobStatus::Running),
        "succeeded" => Ok(JobStatus::Succeeded),
        "failed" => Ok(JobStatus::Failed),
        "cancelled" => Ok(JobStatus::Cancelled),
        other => Err(StoreError::request_failed(format!("unknown job status: {other}"))),
    }
}

fn parse_stage(s: &str) -> Option<StageName> {
    StageName::ORDER.iter().find(|st| st.as_str() == s).copied()
}

fn parse_error_kind(s: &str) -> Option<ErrorKind> {
    match s {
        "quota_exceeded" => Some(ErrorKind::QuotaExceeded),
        "bad_input" => Some(ErrorKind::BadInput),
        "upstream_timeout" => Some(ErrorKind::UpstreamTimeout),
        "upstream_unavailable" => Some(ErrorKind::UpstreamUnavailable),
        "upstream_rejected" => Some(ErrorKind::UpstreamRejected),
        "content_filtered" => Some(ErrorKind::ContentFiltered),
        "internal_media_error" => Some(ErrorKind::InternalMediaError),
        "storage_error" => Some(ErrorKind::StorageError),
        "cancelled" => Some(ErrorKind::Cancelled),
        _ => None,
    }
}

fn job_to_fields(job: &Job) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("tenant_id".into(), job.tenant_id.to_firestore_value());
    fields.insert("user_id".into(), job.user_id.to_firestore_value());
    fields.insert("audio_blob_url".into(), job.audio_blob_url.to_firestore_value());
    fields.insert("title".into(), job.title.to_firestore_value());
    fields.insert("layout_id".into(), job.layout_id.to_firestore_value());
    fields.insert("clip_overrides".into(), job.clip_overrides.to_firestore_value());
    fields.insert("bgm_blob_url".into(), job.bgm_blob_url.to_firestore_value());
    fields.insert("bgm_gain".into(), job.bgm_gain.to_firestore_value());
    fields.insert("status".into(), job.status.as_str().to_firestore_value());
    fields.insert(
        "stage".into(),
        job.stage.map(|s| s.as_str().to_string()).to_firestore_value(),
    );
    fields.insert("progress".into(), (job.progress as u32).to_firestore_value());
    fields.insert(
        "error_kind".into(),
        job.error_kind.map(|k| k.as_str().to_string()).to_firestore_value(),
    );
    fields.insert("error_detail".into(), job.error_detail.clone().to_firestore_value());
    fields.insert("attempts".into(), job.attempts.to_firestore_value());
    fields.insert("cancel_requested".into(), job.cancel_requested.to_firestore_value());
    fields.insert("video_blob_url".into(), job.video_blob_url.clone().to_firestore_value());
    fields.insert("subtitle_blob_url".into(), job.subtitle_blob_url.clone().to_firestore_value());
    fields.insert("thumbnail_blob_url".into(), job.thumbnail_blob_url.clone().to_firestore_value());
    fields.insert("duration_seconds".into(), job.duration_seconds.to_firestore_value());
    fields.insert("created_at".into(), job.created_at.to_firestore_value());
    fields.insert("started_at".into(), job.started_at.to_firestore_value());
    fields.insert("completed_at".into(), job.completed_at.to_firestore_value());
    fields.insert(
        "regenerated_from".into(),
        job.regenerated_from.as_ref().map(|id| id.as_str().to_string()).to_firestore_value(),
    );
    fields
}

fn document_to_job(doc: &Document, job_id: &JobId) -> StoreResult<Job> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| StoreError::request_failed("job document missing fields"))?;

    let status_str = field_string(fields, "status")
        .ok_or_else(|| StoreError::request_failed("job document missing status"))?;

    Ok(Job {
        job_id: job_id.clone(),
        tenant_id: field_string(fields, "tenant_id").unwrap_or_default(),
        user_id: field_string(fields, "user_id").unwrap_or_default(),
        audio_blob_url: field_string(fields, "audio_blob_url").unwrap_or_default(),
        title: field_string(fields, "title").unwrap_or_default(),
        layout_id: field_opt_string(fields, "layout_id"),
        clip_overrides: fields.get("clip_overrides").and_then(|v| match v {
            Value::ArrayValue(arr) => Some(
                arr.values
                    .clone()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(String::from_firestore_value)
                    .collect(),
            ),
            _ => None,
        }),
        bgm_blob_url: field_opt_string(fields, "bgm_blob_url"),
        bgm_gain: fields.get("bgm_gain").and_then(f32::from_firestore_value).unwrap_or(0.0),
        status: parse_status(&status_str)?,
        stage: field_opt_string(fields, "stage").and_then(|s| parse_stage(&s)),
        progress: fields.get("progress").and_then(u32::from_firestore_value).unwrap_or(0) as u8,
        error_kind: field_opt_string(fields, "error_kind").and_then(|s| parse_error_kind(&s)),
        error_detail: field_opt_string(fields, "error_detail"),
        attempts: fields.get("attempts").and_then(u32::from_firestore_value).unwrap_or(0),
        cancel_requested: fields.get("cancel_requested").and_then(bool::from_firestore_value).unwrap_or(false),
        video_blob_url: field_opt_string(fields, "video_blob_url"),
        subtitle_blob_url: field_opt_string(fields, "subtitle_blob_url"),
        thumbnail_blob_url: field_opt_string(fields, "thumbnail_blob_url"),
        duration_seconds: fields.get("duration_seconds").and_then(f64::from_firestore_value),
        created_at: field_timestamp(fields, "created_at").unwrap_or_else(Utc::now),
        started_at: field_timestamp(fields, "started_at"),
        completed_at: field_timestamp(fields, "completed_at"),
        regenerated_from: field_opt_string(fields, "regenerated_from").map(JobId::from_string),
    })
}

/// Repository for the `jobs` collection: the durable record behind every
/// status poll and the compare-and-set target for stage transitions (§5).
#[derive(Clone)]
pub struct JobRepository {
    client: FirestoreClient,
}

impl JobRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, job: &Job) -> StoreResult<()> {
        self.client
            .create_document(JOBS_COLLECTION, job.job_id.as_str(), job_to_fields(job))
            .await?;
        info!(job_id = %job.job_id, "created job record");
        Ok(())
    }

    pub async fn get(&self, job_id: &JobId) -> StoreResult<Option<Job>> {
        match self.client.get_document(JOBS_COLLECTION, job_id.as_str()).await? {
            Some(doc) => Ok(Some(document_to_job(&doc, job_id)?)),
            None => Ok(None),
        }
    }

    /// Persist `job` in full, requiring the stored `update_time` to still
    /// match `expected_update_time` — the CAS primitive every stage transition
    /// and progress write is built on (§4.L, §5).
    pub async fn save_with_precondition(
        &self,
        job: &Job,
        expected_update_time: Option<&str>,
    ) -> StoreResult<Document> {
        self.client
            .update_document_with_precondition(
                JOBS_COLLECTION,
                job.job_id.as_str(),
                job_to_fields(job),
                None,
                expected_update_time,
            )
            .await
    }

    /// Fetch the job together with its Firestore `update_time`, for callers
    /// that will round-trip it back into `save_with_precondition`.
    pub async fn get_with_update_time(&self, job_id: &JobId) -> StoreResult<Option<(Job, Option<String>)>> {
        match self.client.get_document(JOBS_COLLECTION, job_id.as_str()).await? {
            Some(doc) => {
                let update_time = doc.update_time.clone();
                Ok(Some((document_to_job(&doc, job_id)?, update_time)))
            }
            None => Ok(None),
        }
    }

    pub async fn request_cancel(&self, job_id: &JobId) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("cancel_requested".into(), true.to_firestore_value());
        self.client
            .update_document(JOBS_COLLECTION, job_id.as_str(), fields, Some(vec!["cancel_requested".into()]))
            .await?;
        Ok(())
    }

    pub async fn list_recent_for_tenant(&self, tenant_id: &str, limit: u32) -> StoreResult<Vec<Job>> {
        let response = self.client.list_documents(JOBS_COLLECTION, Some(limit.max(50)), None).await?;
        let mut jobs = Vec::new();
        if let Some(docs) = response.documents {
            for doc in docs {
                let Some(name) = &doc.name else { continue };
                let id = name.rsplit('/').next().unwrap_or("").to_string();
                if let Ok(job) = document_to_job(&doc, &JobId::from_string(id)) {
                    if job.tenant_id == tenant_id {
                        jobs.push(job);
                    }
                }
            }
        }
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit as usize);
        Ok(jobs)
    }
}

/// Repository for the global clip blacklist (§3, §4.H).
#[derive(Clone)]
pub struct BlacklistRepository {
    client: FirestoreClient,
}

impl BlacklistRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn contains(&self, external_clip_id: &str) -> StoreResult<bool> {
        Ok(self.client.get_document(BLACKLIST_COLLECTION, external_clip_id).await?.is_some())
    }

    pub async fn add(&self, entry: &BlacklistEntry) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("reason".into(), entry.reason.to_firestore_value());
        fields.insert("added_at".into(), Utc::now().to_firestore_value());
        match self
            .client
            .create_document(BLACKLIST_COLLECTION, &entry.external_clip_id, fields)
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn list_all(&self) -> StoreResult<Vec<BlacklistEntry>> {
        let response = self.client.list_documents(BLACKLIST_COLLECTION, Some(500), None).await?;
        let mut out = Vec::new();
        if let Some(docs) = response.documents {
            for doc in docs {
                let Some(name) = &doc.name else { continue };
                let id = name.rsplit('/').next().unwrap_or("").to_string();
                let reason = doc
                    .fields
                    .as_ref()
                    .and_then(|f| field_string(f, "reason"))
                    .unwrap_or_default();
                out.push(BlacklistEntry { external_clip_id: id, reason });
            }
        }
        Ok(out)
    }
}

/// Repository for a tenant's dedup history: clips used by that tenant's
/// recently-completed jobs (§3, §4.G step 2, GLOSSARY "Recency window").
#[derive(Clone)]
pub struct UsedClipRepository {
    client: FirestoreClient,
}

impl UsedClipRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn collection(&self, tenant_id: &str) -> String {
        format!("tenants/{tenant_id}/used_clips")
    }

    pub async fn record(&self, used: &UsedClip) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("job_id".into(), used.job_id.to_firestore_value());
        fields.insert("external_clip_id".into(), used.external_clip_id.to_firestore_value());
        fields.insert("used_at".into(), used.used_at.to_firestore_value());

        let doc_id = format!("{}__{}", used.job_id, used.external_clip_id);
        match self.client.create_document(&self.collection(&used.tenant_id), &doc_id, fields).await {
            Ok(_) => Ok(()),
            Err(StoreError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// All clip ids used across the tenant's most recent `RECENCY_WINDOW_JOBS`
    /// distinct jobs, most recent first.
    pub async fn recent_clip_ids(&self, tenant_id: &str, recency_window_jobs: usize) -> StoreResult<Vec<String>> {
        let response = self.client.list_documents(&self.collection(tenant_id), Some(1000), None).await?;
        let mut rows: Vec<UsedClip> = Vec::new();
        if let Some(docs) = response.documents {
            for doc in docs {
                let Some(fields) = doc.fields.as_ref() else { continue };
                let Some(job_id) = field_string(fields, "job_id") else { continue };
                let Some(external_clip_id) = field_string(fields, "external_clip_id") else { continue };
                let used_at = field_timestamp(fields, "used_at").unwrap_or_else(Utc::now);
                rows.push(UsedClip { tenant_id: tenant_id.to_string(), job_id, external_clip_id, used_at });
            }
        }
        rows.sort_by(|a, b| b.used_at.cmp(&a.used_at));

        let mut seen_jobs = Vec::new();
        let mut clip_ids = Vec::new();
        for row in rows {
            if !seen_jobs.contains(&row.job_id) {
                if seen_jobs.len() >= recency_window_jobs {
                    break;
                }
                seen_jobs.push(row.job_id.clone());
            }
            clip_ids.push(row.external_clip_id);
        }
        Ok(clip_ids)
    }
}

/// Repository for saved thumbnail/intro-outro layouts (§3, template generation mode).
#[derive(Clone)]
pub struct LayoutRepository {
    client: FirestoreClient,
}

impl LayoutRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, layout_id: &str) -> StoreResult<Option<ThumbnailLayout>> {
        match self.client.get_document(LAYOUTS_COLLECTION, layout_id).await? {
            Some(doc) => Ok(Some(document_to_layout(&doc)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, layout_id: &str, layout: &ThumbnailLayout) -> StoreResult<()> {
        let fields = layout_to_fields(layout);
        match self.client.create_document(LAYOUTS_COLLECTION, layout_id, fields.clone()).await {
            Ok(_) => Ok(()),
            Err(StoreError::AlreadyExists(_)) => {
                self.client
                    .update_document(LAYOUTS_COLLECTION, layout_id, fields, None)
                    .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn layout_to_fields(layout: &ThumbnailLayout) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("background_image_url".into(), layout.background_image_url.to_firestore_value());
    fields.insert(
        "text_boxes".into(),
        Value::ArrayValue(ArrayValue {
            values: Some(
                layout
                    .text_boxes
                    .iter()
                    .map(|tb| {
                        let mut m = HashMap::new();
                        m.insert("id".into(), tb.id.to_firestore_value());
                        m.insert("text".into(), tb.text.to_firestore_value());
                        m.insert("x_percent".into(), (tb.x_percent as f64).to_firestore_value());
                        m.insert("y_percent".into(), (tb.y_percent as f64).to_firestore_value());
                        m.insert("font_size_px".into(), (tb.font_size_px as u32).to_firestore_value());
                        m.insert("font_family".into(), tb.font_family.to_firestore_value());
                        m.insert("color".into(), tb.color.to_firestore_value());
                        m.insert("visible".into(), tb.visible.to_firestore_value());
                        Value::MapValue(MapValue { fields: Some(m) })
                    })
                    .collect(),
            ),
        }),
    );
    fields.insert("intro_enabled".into(), layout.intro_settings.enabled.to_firestore_value());
    fields.insert("intro_duration_seconds".into(), layout.intro_settings.duration_seconds.to_firestore_value());
    fields.insert("outro_enabled".into(), layout.outro_settings.enabled.to_firestore_value());
    fields.insert("outro_duration_seconds".into(), layout.outro_settings.duration_seconds.to_firestore_value());
    fields
}

fn document_to_layout(doc: &Document) -> StoreResult<ThumbnailLayout> {
    use devocast_models::{IntroOutroSettings, TextBox};

    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| StoreError::request_failed("layout document missing fields"))?;

    let text_boxes = match fields.get("text_boxes") {
        Some(Value::ArrayValue(arr)) => arr
            .values
            .clone()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| match v {
                Value::MapValue(m) => {
                    let f = m.fields.unwrap_or_default();
                    Some(TextBox {
                        id: field_string(&f, "id").unwrap_or_default(),
                        text: field_string(&f, "text").unwrap_or_default(),
                        x_percent: f.get("x_percent").and_then(f64::from_firestore_value).unwrap_or(0.0) as f32,
                        y_percent: f.get("y_percent").and_then(f64::from_firestore_value).unwrap_or(0.0) as f32,
                        font_size_px: f.get("font_size_px").and_then(u32::from_firestore_value).unwrap_or(24),
                        font_family: field_string(&f, "font_family").unwrap_or_default(),
                        color: field_string(&f, "color").unwrap_or_default(),
                        visible: f.get("visible").and_then(bool::from_firestore_value).unwrap_or(true),
                    })
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(ThumbnailLayout {
        background_image_url: field_string(fields, "background_image_url").unwrap_or_default(),
        text_boxes,
        intro_settings: IntroOutroSettings::clamped(
            fields.get("intro_enabled").and_then(bool::from_firestore_value).unwrap_or(false),
            fields.get("intro_duration_seconds").and_then(f64::from_firestore_value).unwrap_or(3.0),
        ),
        outro_settings: IntroOutroSettings::clamped(
            fields.get("outro_enabled").and_then(bool::from_firestore_value).unwrap_or(false),
            fields.get("outro_duration_seconds").and_then(f64::from_firestore_value).unwrap_or(3.0),
        ),
    })
}

/// Repository for subtitle segments, keyed by job (§3, §6).
#[derive(Clone)]
pub struct SubtitleRepository {
    client: FirestoreClient,
}

impl SubtitleRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn collection() -> &'static str {
        "subtitle_sets"
    }

    pub async fn save(&self, job_id: &JobId, segments: &[SubtitleSegment]) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(
            "segments".into(),
            Value::ArrayValue(ArrayValue {
                values: Some(
                    segments
                        .iter()
                        .map(|s| {
                            let mut m = HashMap::new();
                            m.insert("index".into(), s.index.to_firestore_value());
                            m.insert("start_seconds".into(), s.start_seconds.to_firestore_value());
                            m.insert("end_seconds".into(), s.end_seconds.to_firestore_value());
                            m.insert("text".into(), s.text.to_firestore_value());
                            Value::MapValue(MapValue { fields: Some(m) })
                        })
                        .collect(),
                ),
            }),
        );

        match self.client.create_document(Self::collection(), job_id.as_str(), fields.clone()).await {
            Ok(_) => Ok(()),
            Err(StoreError::AlreadyExists(_)) => {
                self.client
                    .update_document(Self::collection(), job_id.as_str(), fields, None)
                    .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, job_id: &JobId) -> StoreResult<Option<Vec<SubtitleSegment>>> {
        let Some(doc) = self.client.get_document(Self::collection(), job_id.as_str()).await? else {
            return Ok(None);
        };
        let Some(fields) = doc.fields.as_ref() else {
            return Ok(Some(Vec::new()));
        };
        let segments = match fields.get("segments") {
            Some(Value::ArrayValue(arr)) => arr
                .values
                .clone()
                .unwrap_or_default()
                .into_iter()
                .filter_map(|v| match v {
                    Value::MapValue(m) => {
                        let f = m.fields.unwrap_or_default();
                        Some(SubtitleSegment {
                            index: f.get("index").and_then(u32::from_firestore_value).unwrap_or(0),
                            start_seconds: f.get("start_seconds").and_then(f64::from_firestore_value).unwrap_or(0.0),
                            end_seconds: f.get("end_seconds").and_then(f64::from_firestore_value).unwrap_or(0.0),
                            text: field_string(&f, "text").unwrap_or_default(),
                        })
                    }
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Ok(Some(segments))
    }
}

/// Repository for per-tenant word replacement dictionaries (§3).
#[derive(Clone)]
pub struct ReplacementDictionaryRepository {
    client: FirestoreClient,
}

impl ReplacementDictionaryRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn collection(&self, tenant_id: &str) -> String {
        format!("tenants/{tenant_id}/replacement_dictionary")
    }

    pub async fn list(&self, tenant_id: &str) -> StoreResult<Vec<ReplacementEntry>> {
        let response = self.client.list_documents(&self.collection(tenant_id), Some(1000), None).await?;
        let mut out = Vec::new();
        if let Some(docs) = response.documents {
            for doc in docs {
                let Some(name) = &doc.name else { continue };
                let original_token = name.rsplit('/').next().unwrap_or("").to_string();
                let Some(fields) = doc.fields.as_ref() else { continue };
                out.push(ReplacementEntry {
                    tenant_id: tenant_id.to_string(),
                    original_token,
                    replacement_token: field_string(fields, "replacement_token").unwrap_or_default(),
                    use_count: fields.get("use_count").and_then(u64::from_firestore_value).unwrap_or(0),
                });
            }
        }
        Ok(out)
    }

    pub async fn upsert(&self, entry: &ReplacementEntry) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("replacement_token".into(), entry.replacement_token.to_firestore_value());
        fields.insert("use_count".into(), entry.use_count.to_firestore_value());

        match self
            .client
            .create_document(&self.collection(&entry.tenant_id), &entry.original_token, fields.clone())
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::AlreadyExists(_)) => {
                self.client
                    .update_document(&self.collection(&entry.tenant_id), &entry.original_token, fields, None)
                    .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devocast_models::JobSubmission;

    fn sample_job() -> Job {
        Job::new(
            "tenant-1",
            "user-1",
            JobSubmission {
                audio_blob_url: "https://blob/tenant-1/j/source.m4a".into(),
                title: "Sunday sermon".into(),
                layout_id: None,
                clip_overrides: None,
                bgm_blob_url: None,
                bgm_gain: 0.2,
            },
        )
    }

    #[test]
    fn job_round_trips_through_firestore_fields() {
        let job = sample_job().start().with_progress(StageName::Transcribe, 10);
        let fields = job_to_fields(&job);
        let doc = Document {
            name: Some(format!("projects/p/databases/(default)/documents/jobs/{}", job.job_id)),
            fields: Some(fields),
            create_time: None,
            update_time: None,
        };
        let restored = document_to_job(&doc, &job.job_id).unwrap();
        assert_eq!(restored.tenant_id, job.tenant_id);
        assert_eq!(restored.status, job.status);
        assert_eq!(restored.stage, job.stage);
        assert_eq!(restored.progress, job.progress);
        assert_eq!(restored.bgm_gain, job.bgm_gain);
    }

    #[test]
    fn layout_round_trips_through_firestore_fields() {
        use devocast_models::{IntroOutroSettings, TextBox, ThumbnailLayout};

        let layout = ThumbnailLayout {
            background_image_url: "https://blob/bg.jpg".into(),
            text_boxes: vec![TextBox {
                id: "title".into(),
                text: "Grace".into(),
                x_percent: 10.0,
                y_percent: 20.0,
                font_size_px: 48,
                font_family: "Inter".into(),
                color: "#ffffff".into(),
                visible: true,
            }],
            intro_settings: IntroOutroSettings::clamped(true, 3.0),
            outro_settings: IntroOutroSettings::disabled(),
        };

        let fields = layout_to_fields(&layout);
        let doc = Document { name: None, fields: Some(fields), create_time: None, update_time: None };
        let restored = document_to_layout(&doc).unwrap();
        assert_eq!(restored.text_boxes.len(), 1);
        assert_eq!(restored.text_boxes[0].id, "title");
        assert!(restored.intro_settings.enabled);
        assert!(!restored.outro_settings.enabled);
    }
}
