//! Weekly quota records and holds (§3 "Ambient: Quota record", §4.N).
//!
//! The record itself lives here because both `devocast-api` (reads remaining
//! balance for a 402 response) and `devocast-pipeline` (drives the hold/
//! commit/release lifecycle) need the shape; the transactional logic that
//! mutates it through Firestore lives in `devocast-quota`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A tenant's quota record for the current week (§4.N).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuotaRecord {
    pub tenant_id: String,
    pub weekly_limit: u32,
    pub used: u32,
    pub held: u32,
    /// Start of the current weekly window (UTC).
    pub window_started_at: DateTime<Utc>,
    /// Firestore `update_time` echoed back for optimistic-concurrency writes.
    pub update_time: Option<String>,
}

impl QuotaRecord {
    pub fn new(tenant_id: impl Into<String>, weekly_limit: u32, window_started_at: DateTime<Utc>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            weekly_limit,
            used: 0,
            held: 0,
            window_started_at,
            update_time: None,
        }
    }

    /// Credits neither used nor already held against this window.
    pub fn available(&self) -> u32 {
        self.weekly_limit.saturating_sub(self.used + self.held)
    }

    pub fn has_capacity_for(&self, amount: u32) -> bool {
        self.available() >= amount
    }
}

/// A single job's outstanding hold against a tenant's quota (§4.N).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Hold {
    pub tenant_id: String,
    pub job_id: String,
    pub amount: u32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_excludes_used_and_held() {
        let mut record = QuotaRecord::new("tenant-1", 10, Utc::now());
        record.used = 3;
        record.held = 2;
        assert_eq!(record.available(), 5);
        assert!(record.has_capacity_for(5));
        assert!(!record.has_capacity_for(6));
    }

    #[test]
    fn available_never_underflows() {
        let mut record = QuotaRecord::new("tenant-1", 5, Utc::now());
        record.used = 4;
        record.held = 4;
        assert_eq!(record.available(), 0);
    }
}
