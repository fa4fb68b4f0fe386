//! The Quota Ledger: hold/commit/release on a tenant's weekly credit
//! counter, backed by the Job Store's `quota` collection (§4.N).
//!
//! Grounded on the teacher's `UserCreditsRepository::charge_credits` —
//! fetch-document, mutate, write-with-`updateTime`-precondition, retry with
//! backoff on a lost race — generalized from a single monthly counter to a
//! two-phase hold/commit/release lifecycle per job.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use devocast_models::QuotaRecord;
use devocast_store::{Document, FirestoreClient, FromFirestoreValue, ToFirestoreValue, Value};
use tracing::{debug, info, warn};

use crate::error::{QuotaError, QuotaResult};

const COLLECTION: &str = "quota";
const MAX_RETRIES: u32 = 5;
const RETRY_BASE_DELAY_MS: u64 = 50;
const WEEKLY_WINDOW_DAYS: i64 = 7;

struct TenantQuota {
    tenant_id: String,
    weekly_credits: u32,
    committed_this_period: u32,
    holds: HashMap<String, u32>,
    next_reset_at: DateTime<Utc>,
}

impl TenantQuota {
    fn total_held(&self) -> u32 {
        self.holds.values().sum()
    }

    fn available(&self) -> u32 {
        self.weekly_credits
            .saturating_sub(self.committed_this_period + self.total_held())
    }

    /// Roll the weekly window over if it has elapsed; returns whether it did.
    fn reset_if_needed(&mut self, now: DateTime<Utc>) -> bool {
        if now < self.next_reset_at {
            return false;
        }
        self.committed_this_period = 0;
        self.holds.clear();
        self.next_reset_at = now + ChronoDuration::days(WEEKLY_WINDOW_DAYS);
        true
    }

    fn to_record(&self) -> QuotaRecord {
        QuotaRecord {
            tenant_id: self.tenant_id.clone(),
            weekly_limit: self.weekly_credits,
            used: self.committed_this_period,
            held: self.total_held(),
            window_started_at: self.next_reset_at - ChronoDuration::days(WEEKLY_WINDOW_DAYS),
            update_time: None,
        }
    }

    fn to_fields(&self) -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        fields.insert("tenant_id".to_string(), self.tenant_id.to_firestore_value());
        fields.insert("weekly_credits".to_string(), self.weekly_credits.to_firestore_value());
        fields.insert(
            "committed_this_period".to_string(),
            self.committed_this_period.to_firestore_value(),
        );
        fields.insert(
            "holds_json".to_string(),
            serde_json::to_string(&self.holds).unwrap_or_default().to_firestore_value(),
        );
        fields.insert("next_reset_at".to_string(), self.next_reset_at.to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        fields
    }

    fn from_document(doc: &Document, tenant_id: &str) -> Self {
        let fields = doc.fields.as_ref();
        let weekly_credits = fields
            .and_then(|f| f.get("weekly_credits"))
            .and_then(u32::from_firestore_value)
            .unwrap_or(0);
        let committed_this_period = fields
            .and_then(|f| f.get("committed_this_period"))
            .and_then(u32::from_firestore_value)
            .unwrap_or(0);
        let holds: HashMap<String, u32> = fields
            .and_then(|f| f.get("holds_json"))
            .and_then(String::from_firestore_value)
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        let next_reset_at = fields
            .and_then(|f| f.get("next_reset_at"))
            .and_then(DateTime::<Utc>::from_firestore_value)
            .unwrap_or_else(|| Utc::now() + ChronoDuration::days(WEEKLY_WINDOW_DAYS));

        Self {
            tenant_id: tenant_id.to_string(),
            weekly_credits,
            committed_this_period,
            holds,
            next_reset_at,
        }
    }
}

/// Transactional ledger operations on a tenant's weekly credit counter.
#[derive(Clone)]
pub struct QuotaRepository {
    client: FirestoreClient,
}

impl QuotaRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Provision a tenant's quota document. Idempotent — a tenant that
    /// already has a record is left untouched.
    pub async fn initialize(&self, tenant_id: &str, weekly_credits: u32) -> QuotaResult<()> {
        let quota = TenantQuota {
            tenant_id: tenant_id.to_string(),
            weekly_credits,
            committed_this_period: 0,
            holds: HashMap::new(),
            next_reset_at: Utc::now() + ChronoDuration::days(WEEKLY_WINDOW_DAYS),
        };
        match self.client.create_document(COLLECTION, tenant_id, quota.to_fields()).await {
            Ok(_) => Ok(()),
            Err(devocast_store::StoreError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_record(&self, tenant_id: &str) -> QuotaResult<Option<QuotaRecord>> {
        match self.client.get_document(COLLECTION, tenant_id).await? {
            Some(doc) => Ok(Some(TenantQuota::from_document(&doc, tenant_id).to_record())),
            None => Ok(None),
        }
    }

    /// `check_and_hold`: verify `Σholds + committed + cost ≤ weekly_credits`
    /// and record a hold for `job_id`. Idempotent if the hold already exists.
    pub async fn check_and_hold(&self, tenant_id: &str, job_id: &str, cost: u32) -> QuotaResult<()> {
        self.cas_loop(tenant_id, |quota| {
            if quota.holds.contains_key(job_id) {
                return Ok(false);
            }
            if quota.available() < cost {
                return Err(QuotaError::Exceeded {
                    tenant_id: tenant_id.to_string(),
                    requested: cost,
                    available: quota.available(),
                });
            }
            quota.holds.insert(job_id.to_string(), cost);
            Ok(true)
        })
        .await
    }

    /// `commit`: remove the hold and add its amount to `committed_this_period`.
    /// A no-op (not an error) if there is no outstanding hold for `job_id`.
    pub async fn commit(&self, tenant_id: &str, job_id: &str) -> QuotaResult<()> {
        self.cas_loop(tenant_id, |quota| {
            match quota.holds.remove(job_id) {
                Some(cost) => {
                    quota.committed_this_period = quota.committed_this_period.saturating_add(cost);
                    Ok(true)
                }
                None => {
                    warn!(tenant_id, job_id, "commit with no outstanding hold");
                    Ok(false)
                }
            }
        })
        .await
    }

    /// `release`: drop the hold without touching `committed_this_period`.
    /// Idempotent — releasing an already-released or unknown hold is a no-op.
    pub async fn release(&self, tenant_id: &str, job_id: &str) -> QuotaResult<()> {
        self.cas_loop(tenant_id, |quota| Ok(quota.holds.remove(job_id).is_some())).await
    }

    /// Read-modify-write-with-precondition loop shared by hold/commit/release.
    /// `mutate` returns `Ok(true)` if it changed state (a write is needed),
    /// `Ok(false)` for an already-satisfied no-op, or `Err` to abort.
    async fn cas_loop(
        &self,
        tenant_id: &str,
        mutate: impl Fn(&mut TenantQuota) -> QuotaResult<bool>,
    ) -> QuotaResult<()> {
        for attempt in 0..MAX_RETRIES {
            let doc = self
                .client
                .get_document(COLLECTION, tenant_id)
                .await?
                .ok_or_else(|| QuotaError::TenantNotFound {
                    tenant_id: tenant_id.to_string(),
                })?;
            let update_time = doc.update_time.clone();
            let mut quota = TenantQuota::from_document(&doc, tenant_id);
            quota.reset_if_needed(Utc::now());

            if !mutate(&mut quota)? {
                return Ok(());
            }

            match self
                .client
                .update_document_with_precondition(
                    COLLECTION,
                    tenant_id,
                    quota.to_fields(),
                    None,
                    update_time.as_deref(),
                )
                .await
            {
                Ok(_) => {
                    info!(tenant_id, attempt = attempt + 1, "quota ledger write committed");
                    return Ok(());
                }
                Err(e) if e.is_precondition_failed() => {
                    debug!(tenant_id, attempt = attempt + 1, "quota CAS lost the race, retrying");
                    tokio::time::sleep(Duration::from_millis(RETRY_BASE_DELAY_MS * (attempt as u64 + 1))).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(QuotaError::RetriesExhausted { retries: MAX_RETRIES })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(weekly: u32, committed: u32, holds: &[(&str, u32)]) -> TenantQuota {
        TenantQuota {
            tenant_id: "tenant-1".to_string(),
            weekly_credits: weekly,
            committed_this_period: committed,
            holds: holds.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            next_reset_at: Utc::now() + ChronoDuration::days(WEEKLY_WINDOW_DAYS),
        }
    }

    #[test]
    fn available_excludes_committed_and_held() {
        let q = quota(10, 3, &[("job-a", 2)]);
        assert_eq!(q.available(), 5);
    }

    #[test]
    fn reset_clears_holds_and_committed_past_window() {
        let mut q = quota(10, 5, &[("job-a", 2)]);
        q.next_reset_at = Utc::now() - ChronoDuration::seconds(1);
        assert!(q.reset_if_needed(Utc::now()));
        assert_eq!(q.committed_this_period, 0);
        assert!(q.holds.is_empty());
    }

    #[test]
    fn reset_is_a_noop_within_the_window() {
        let mut q = quota(10, 5, &[]);
        assert!(!q.reset_if_needed(Utc::now()));
        assert_eq!(q.committed_this_period, 5);
    }
}
