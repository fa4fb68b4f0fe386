//! Job handlers: the four operations the Inbound Surface exposes (§6).
//!
//! There is no session/auth middleware here — the caller supplies
//! `tenant_id` and `user_id` directly via the `X-Tenant-Id`/`X-User-Id`
//! headers, and every handler trusts them as given.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use devocast_models::{Job, JobId, JobSubmission, RegenerationOverrides};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn caller_ids(headers: &HeaderMap) -> ApiResult<(String, String)> {
    let tenant_id = headers
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing X-Tenant-Id header"))?
        .to_string();
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing X-User-Id header"))?
        .to_string();
    Ok((tenant_id, user_id))
}

/// Validate job ID format to prevent injection attacks.
///
/// Valid format: alphanumeric characters and hyphens only, 8-64 chars.
fn is_valid_job_id(id: &str) -> bool {
    if id.is_empty() || id.len() > 64 || id.len() < 8 {
        return false;
    }
    id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn parse_job_id(id: &str) -> ApiResult<JobId> {
    if !is_valid_job_id(id) {
        return Err(ApiError::bad_request("invalid job id format"));
    }
    Ok(JobId::from_string(id))
}

/// Response shape for a job, whatever its lifecycle state.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub title: String,
    pub status: String,
    pub stage: Option<String>,
    pub progress: u8,
    pub error_kind: Option<String>,
    pub error_detail: Option<String>,
    pub video_blob_url: Option<String>,
    pub subtitle_blob_url: Option<String>,
    pub thumbnail_blob_url: Option<String>,
    pub duration_seconds: Option<f64>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub regenerated_from: Option<String>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.job_id.as_str().to_string(),
            tenant_id: job.tenant_id,
            user_id: job.user_id,
            title: job.title,
            status: job.status.as_str().to_string(),
            stage: job.stage.map(|s| s.as_str().to_string()),
            progress: job.progress,
            error_kind: job.error_kind.map(|k| k.as_str().to_string()),
            error_detail: job.error_detail,
            video_blob_url: job.video_blob_url,
            subtitle_blob_url: job.subtitle_blob_url,
            thumbnail_blob_url: job.thumbnail_blob_url,
            duration_seconds: job.duration_seconds,
            created_at: job.created_at.to_rfc3339(),
            started_at: job.started_at.map(|t| t.to_rfc3339()),
            completed_at: job.completed_at.map(|t| t.to_rfc3339()),
            regenerated_from: job.regenerated_from.map(|id| id.as_str().to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
}

/// POST /api/jobs
///
/// Places a non-mutating quota pre-check (reject fast if the tenant is
/// clearly out of credits) and enqueues the job. The authoritative,
/// race-safe hold still happens inside the pipeline's validate_input
/// stage when a worker picks the job up — this pre-check exists only to
/// avoid queuing work that is certain to be rejected.
pub async fn submit_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(submission): Json<JobSubmission>,
) -> ApiResult<Json<SubmitJobResponse>> {
    use validator::Validate;

    let (tenant_id, user_id) = caller_ids(&headers)?;
    submission
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    if let Some(record) = state.quota_repo.get_record(&tenant_id).await? {
        if !record.has_capacity_for(devocast_pipeline::JOB_COST) {
            return Err(ApiError::QuotaExceeded(format!(
                "tenant {} has {} credits available",
                tenant_id,
                record.available()
            )));
        }
    }

    let job = Job::new(tenant_id, user_id, submission);
    state.job_repo.create(&job).await?;
    state.queue.enqueue(&job.job_id).await?;

    crate::metrics::record_job_submitted();
    info!(job_id = %job.job_id, "job submitted");

    Ok(Json(SubmitJobResponse {
        job_id: job.job_id.as_str().to_string(),
    }))
}

/// GET /api/jobs/:job_id
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let job_id = parse_job_id(&job_id)?;
    let job = state
        .job_repo
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    Ok(Json(job.into()))
}

#[derive(Debug, Serialize)]
pub struct CancelJobResponse {
    pub job_id: String,
    pub cancel_requested: bool,
}

/// POST /api/jobs/:job_id/cancel
///
/// Idempotent: cancelling a job that has already finished or already has
/// a cancellation pending simply confirms the existing state.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<CancelJobResponse>> {
    let job_id = parse_job_id(&job_id)?;

    // Confirm the job exists before flipping the flag so callers get a 404
    // instead of a silent no-op for a typo'd id.
    state
        .job_repo
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    state.job_repo.request_cancel(&job_id).await?;
    crate::metrics::record_job_cancelled();
    info!(job_id = %job_id, "job cancel requested");

    Ok(Json(CancelJobResponse {
        job_id: job_id.as_str().to_string(),
        cancel_requested: true,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RegenerateJobRequest {
    #[serde(default)]
    pub overrides: RegenerationOverrides,
}

/// POST /api/jobs/:job_id/regenerate
pub async fn regenerate_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    Json(request): Json<RegenerateJobRequest>,
) -> ApiResult<Json<SubmitJobResponse>> {
    let (tenant_id, _user_id) = caller_ids(&headers)?;
    let source_id = parse_job_id(&job_id)?;

    let source = state
        .job_repo
        .get(&source_id)
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    if source.tenant_id != tenant_id {
        return Err(ApiError::not_found("job not found"));
    }

    if let Some(record) = state.quota_repo.get_record(&tenant_id).await? {
        if !record.has_capacity_for(devocast_pipeline::JOB_COST) {
            return Err(ApiError::QuotaExceeded(format!(
                "tenant {} has {} credits available",
                tenant_id,
                record.available()
            )));
        }
    }

    let new_job = Job::regenerate_from(&source, request.overrides);
    state.job_repo.create(&new_job).await?;
    state.queue.enqueue(&new_job.job_id).await?;

    crate::metrics::record_job_regenerated();
    info!(job_id = %new_job.job_id, source_job_id = %source_id, "job regenerated");

    Ok(Json(SubmitJobResponse {
        job_id: new_job.job_id.as_str().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_job_ids() {
        assert!(is_valid_job_id("12345678"));
        assert!(is_valid_job_id("abc12345"));
        assert!(is_valid_job_id("abc-1234-def"));
        assert!(is_valid_job_id("a1b2c3d4-e5f6-g7h8"));
    }

    #[test]
    fn test_invalid_job_ids() {
        assert!(!is_valid_job_id(""));
        assert!(!is_valid_job_id("short"));
        assert!(!is_valid_job_id("has space"));
        assert!(!is_valid_job_id("has_underscore"));
        assert!(!is_valid_job_id("has.dot"));
        assert!(!is_valid_job_id(&"a".repeat(65)));
    }
}
