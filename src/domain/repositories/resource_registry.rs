//! Resource registry port (C6)
//!
//! Keyed by `(account, region, service, resource_id)`, with a range scan by
//! `(account, region, service)` to warm a per-target cache, ported from
//! `instance_scheduler.py`'s registry reads and `asg_service.py`'s
//! `RegistryInfo`. Replaces the source's separate legacy desired-state
//! table: `prune_stale` absorbs that table's two-tick purge sweep directly
//! into the registry.

use crate::domain::entities::RegistryRecord;
use crate::domain::error::SchedulerError;

#[async_trait::async_trait]
pub trait ResourceRegistry: Send + Sync {
    async fn get(
        &self,
        account: &str,
        region: &str,
        service: &str,
        resource_id: &str,
    ) -> Result<Option<RegistryRecord>, SchedulerError>;

    async fn scan_target(
        &self,
        account: &str,
        region: &str,
        service: &str,
    ) -> Result<Vec<RegistryRecord>, SchedulerError>;

    async fn put(&self, record: RegistryRecord) -> Result<(), SchedulerError>;

    async fn delete(
        &self,
        account: &str,
        region: &str,
        service: &str,
        resource_id: &str,
    ) -> Result<(), SchedulerError>;

    /// Removes records for a target whose `last_seen_tick` is more than two
    /// ticks behind `current_tick`, mirroring the legacy table's
    /// purge-candidate sweep. Returns the deleted resource ids.
    async fn prune_stale(
        &self,
        account: &str,
        region: &str,
        service: &str,
        current_tick: u64,
    ) -> Result<Vec<String>, SchedulerError> {
        let stale: Vec<String> = self
            .scan_target(account, region, service)
            .await?
            .into_iter()
            .filter(|r| current_tick.saturating_sub(r.last_seen_tick) >= 2)
            .map(|r| r.resource_id)
            .collect();
        for resource_id in &stale {
            self.delete(account, region, service, resource_id).await?;
        }
        Ok(stale)
    }
}
