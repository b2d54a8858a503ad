//! Definition store port (C5)
//!
//! Schedule/period library keyed by `(type, name)`, ported from the
//! `ConfigDynamodbStore`/`scheduler_config_store.py` behavior: `put` with an
//! overwrite flag, `delete` refusing a period still referenced by a
//! schedule, and stack-managed rows that reject mutation.

use std::collections::BTreeMap;

use crate::domain::entities::{Period, Schedule};
use crate::domain::error::SchedulerError;

#[async_trait::async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn list_periods(&self) -> Result<BTreeMap<String, Period>, SchedulerError>;
    async fn list_schedules(&self) -> Result<BTreeMap<String, Schedule>, SchedulerError>;

    async fn get_period(&self, name: &str) -> Result<Option<Period>, SchedulerError>;
    async fn get_schedule(&self, name: &str) -> Result<Option<Schedule>, SchedulerError>;

    /// Fails with `SchedulerError::AlreadyExists` when `overwrite` is false
    /// and a row with this name already exists.
    async fn put_period(&self, period: Period, overwrite: bool) -> Result<(), SchedulerError>;
    async fn put_schedule(&self, schedule: Schedule, overwrite: bool) -> Result<(), SchedulerError>;

    /// Fails with `SchedulerError::InUse` when a schedule still references
    /// this period.
    async fn delete_period(&self, name: &str) -> Result<(), SchedulerError>;
    async fn delete_schedule(&self, name: &str) -> Result<(), SchedulerError>;
}

/// Drops schedules that reference a missing period from the in-memory view,
/// per the orchestrator's prefetch step (§4.6 step 1). Returns the surviving
/// schedules plus the names of the ones dropped (for `DefinitionInvalid`
/// reporting).
pub fn prefetch_valid_schedules(
    schedules: BTreeMap<String, Schedule>,
    periods: &BTreeMap<String, Period>,
) -> (BTreeMap<String, Schedule>, Vec<String>) {
    let mut valid = BTreeMap::new();
    let mut dropped = Vec::new();
    for (name, schedule) in schedules {
        let missing = schedule
            .period_refs
            .iter()
            .find(|r| !periods.contains_key(&r.period_name));
        if let Some(bad_ref) = missing {
            tracing::warn!(
                schedule = %name,
                period = %bad_ref.period_name,
                "schedule references missing period, dropping from in-memory view"
            );
            dropped.push(name);
        } else {
            valid.insert(name, schedule);
        }
    }
    (valid, dropped)
}
