//! Registry record entity module
//!
//! Persistent per-resource record (C6, §3): last observed binding plus, for
//! ASGs, the last-applied configuration fingerprint. Ported from the
//! registry rows read/written throughout `instance_scheduler.py` and
//! `asg_service.py`'s `RegistryInfo`/`last_configured` handling. Resolves
//! the source's legacy-table-vs-registry overlap by making the registry the
//! *only* persisted per-resource state; `ResourceRegistry::prune_stale`
//! (domain::repositories) replaces the legacy table's two-tick purge sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{AsgSize, StoredState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastConfigured {
    pub asg_size: AsgSize,
    pub schedule_hash: u64,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub account: String,
    pub region: String,
    pub service: String,
    pub resource_id: String,
    pub arn: String,
    pub name: Option<String>,
    pub schedule_name: String,
    pub stored_state: StoredState,
    pub last_configured: Option<LastConfigured>,
    pub last_seen_tick: u64,
}

impl RegistryRecord {
    /// A record as it exists the first time a resource is observed: bound
    /// to a schedule but not yet scheduled once.
    pub fn first_sight(
        account: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
        resource_id: impl Into<String>,
        arn: impl Into<String>,
        schedule_name: impl Into<String>,
        tick: u64,
    ) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            service: service.into(),
            resource_id: resource_id.into(),
            arn: arn.into(),
            name: None,
            schedule_name: schedule_name.into(),
            stored_state: StoredState::Unknown,
            last_configured: None,
            last_seen_tick: tick,
        }
    }

    pub fn key(&self) -> (String, String, String, String) {
        (
            self.account.clone(),
            self.region.clone(),
            self.service.clone(),
            self.resource_id.clone(),
        )
    }
}
