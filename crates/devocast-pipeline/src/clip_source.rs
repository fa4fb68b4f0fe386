//! Clip Source resolution (§3, §4.G): an explicit per-slot override takes
//! precedence when present, otherwise local pool → content-addressed cache →
//! external search with query relaxation → pool fallback.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use devocast_models::{Candidate, ModerationVerdict, Slot, MAX_QUERY_RELAXATIONS, RECENCY_WINDOW_JOBS};
use rand::prelude::IndexedRandom;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::context::Collaborators;
use crate::download::fetch_bytes;
use crate::error::{PipelineError, PipelineResult};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// A resolved background clip ready to hand to the Composer.
pub struct ResolvedClip {
    pub path: PathBuf,
    pub external_clip_id: String,
}

async fn list_pool_entries(pool_dir: &Path) -> Vec<PathBuf> {
    let Ok(mut entries) = tokio::fs::read_dir(pool_dir).await else {
        return Vec::new();
    };
    let mut files = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files
}

/// Random pick from the pre-normalized local pool; zero re-encode (§4.G step 1).
async fn pick_from_pool(pool_dir: &Path) -> Option<PathBuf> {
    let files = list_pool_entries(pool_dir).await;
    files.choose(&mut rand::rng()).cloned()
}

async fn is_filtered(
    collaborators: &Collaborators,
    tenant_id: &str,
    recent_clip_ids: &[String],
    candidate: &Candidate,
) -> PipelineResult<bool> {
    if collaborators.blacklist_repo.contains(&candidate.external_clip_id).await? {
        debug!(clip_id = %candidate.external_clip_id, "candidate blacklisted");
        return Ok(true);
    }
    if recent_clip_ids.contains(&candidate.external_clip_id) {
        debug!(clip_id = %candidate.external_clip_id, tenant_id, "candidate in recency window");
        return Ok(true);
    }
    Ok(false)
}

fn cache_path(cache_dir: &Path, external_clip_id: &str) -> PathBuf {
    cache_dir.join(format!("{external_clip_id}.mp4"))
}

/// Evaluate one slot's candidate list against the filter pipeline, downloading
/// and normalizing the first accepted candidate (§4.G, §4.H, §4.I).
async fn try_candidates(
    collaborators: &Collaborators,
    tenant_id: &str,
    recent_clip_ids: &[String],
    candidates: Vec<Candidate>,
    work_dir: &Path,
    slot_index: u32,
) -> PipelineResult<Option<ResolvedClip>> {
    for candidate in candidates {
        if is_filtered(collaborators, tenant_id, recent_clip_ids, &candidate).await? {
            continue;
        }

        let cached = cache_path(&collaborators.clip_cache_dir, &candidate.external_clip_id);
        if tokio::fs::try_exists(&cached).await.unwrap_or(false) {
            info!(clip_id = %candidate.external_clip_id, slot_index, "using cached normalized clip");
            return Ok(Some(ResolvedClip { path: cached, external_clip_id: candidate.external_clip_id }));
        }

        let thumbnail_bytes = fetch_bytes(&candidate.thumbnail_url, DOWNLOAD_TIMEOUT).await?;
        let verdict = collaborators.vision_moderator.classify(&thumbnail_bytes).await?;
        if verdict == ModerationVerdict::Reject {
            debug!(clip_id = %candidate.external_clip_id, "candidate rejected by vision moderator");
            continue;
        }

        let raw_path = work_dir.join(format!("raw_{}.mp4", candidate.external_clip_id));
        crate::download::fetch_to_file(&candidate.download_url, &raw_path, DOWNLOAD_TIMEOUT).await?;

        tokio::fs::create_dir_all(&collaborators.clip_cache_dir).await.map_err(devocast_media::MediaError::Io)?;
        devocast_media::normalize_clip(&raw_path, &cached).await?;
        let _ = tokio::fs::remove_file(&raw_path).await;

        info!(clip_id = %candidate.external_clip_id, slot_index, "accepted and normalized new clip");
        return Ok(Some(ResolvedClip { path: cached, external_clip_id: candidate.external_clip_id }));
    }
    Ok(None)
}

/// A caller-supplied clip for a slot, bypassing search entirely (§3 "explicit
/// clip-list override"). Downloaded once and normalized to the NormalizedClip
/// contract, then cached under its own content-addressed id so a regenerated
/// job reusing the same override doesn't re-fetch it.
async fn resolve_override(
    collaborators: &Collaborators,
    override_url: &str,
    work_dir: &Path,
    slot_index: u32,
) -> PipelineResult<ResolvedClip> {
    let mut hasher = Sha256::new();
    hasher.update(override_url.as_bytes());
    let digest = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize());
    let external_clip_id = format!("override:{digest}");
    let cached = cache_path(&collaborators.clip_cache_dir, &external_clip_id);
    if tokio::fs::try_exists(&cached).await.unwrap_or(false) {
        info!(slot_index, "using cached normalized override clip");
        return Ok(ResolvedClip { path: cached, external_clip_id });
    }

    let raw_path = work_dir.join(format!("raw_override_{slot_index}.mp4"));
    crate::download::fetch_to_file(override_url, &raw_path, DOWNLOAD_TIMEOUT).await?;

    tokio::fs::create_dir_all(&collaborators.clip_cache_dir).await.map_err(devocast_media::MediaError::Io)?;
    devocast_media::normalize_clip(&raw_path, &cached).await?;
    let _ = tokio::fs::remove_file(&raw_path).await;

    info!(slot_index, "normalized clip override");
    Ok(ResolvedClip { path: cached, external_clip_id })
}

/// Resolve one slot to a local clip file. An explicit override at this slot's
/// index (§3) takes precedence over the pool/cache/search order in §4.G.
pub async fn resolve_clip(
    collaborators: &Collaborators,
    tenant_id: &str,
    slot: &Slot,
    clip_overrides: Option<&[String]>,
    work_dir: &Path,
) -> PipelineResult<ResolvedClip> {
    if let Some(override_url) = clip_overrides.and_then(|overrides| overrides.get(slot.index as usize)) {
        return resolve_override(collaborators, override_url, work_dir, slot.index).await;
    }

    if let Some(pool_pick) = pick_from_pool(&collaborators.clip_pool_dir).await {
        let id = format!("pool:{}", pool_pick.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown"));
        return Ok(ResolvedClip { path: pool_pick, external_clip_id: id });
    }

    let recent_clip_ids = collaborators.used_clip_repo.recent_clip_ids(tenant_id, RECENCY_WINDOW_JOBS).await?;

    let mut query = slot.query_string.clone();
    let mut attempts = 0u32;
    loop {
        let candidates = collaborators.clip_search.search(&query).await?;
        if let Some(resolved) =
            try_candidates(collaborators, tenant_id, &recent_clip_ids, candidates, work_dir, slot.index).await?
        {
            return Ok(resolved);
        }

        if attempts >= MAX_QUERY_RELAXATIONS {
            break;
        }
        attempts += 1;
        let relaxed = Slot { query_string: query, ..slot.clone() }.relax_query();
        warn!(slot_index = slot.index, relaxed_query = %relaxed, attempt = attempts, "relaxing query after filtered candidates");
        query = relaxed;
    }

    if let Some(pool_pick) = pick_from_pool(&collaborators.clip_pool_dir).await {
        let id = format!("pool:{}", pool_pick.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown"));
        return Ok(ResolvedClip { path: pool_pick, external_clip_id: id });
    }

    Err(PipelineError::TooFewClips { slot_index: slot.index })
}
