//! Scheduler error module
//!
//! Closed error taxonomy for the scheduling engine (§7). The source raises
//! ad-hoc exceptions per service module; this type unifies them into tagged
//! variants so call sites can match on `SchedulerError` instead of
//! string-sniffing an exception message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("resource {resource_id} references unknown schedule")]
    UnknownSchedule { resource_id: String },

    #[error("resource {resource_id} is not a schedulable resource: {reason}")]
    UnsupportedResource { resource_id: String, reason: String },

    #[error("resource {resource_id} is in a transitional state ({observed}) and cannot be acted on this tick")]
    UnschedulableState { resource_id: String, observed: String },

    #[error("cloud API call failed for {resource_id}: {source}")]
    ClientException { resource_id: String, source: String },

    #[error("batch operation reported {} sub-failures", failed_ids.len())]
    BatchPartialFailure { failed_ids: Vec<String> },

    #[error("definition {name} is managed by a stack and cannot be edited directly")]
    ManagedByStack { name: String },

    #[error("caller version {got} is not compatible with supported range starting at {min}")]
    VersionUnsupported { min: String, got: String },

    #[error("reconfigure of {resource_id} failed ({original}) and rollback also failed ({rollback})")]
    RollbackFailed {
        resource_id: String,
        original: String,
        rollback: String,
    },

    #[error("schedule or period row already exists")]
    AlreadyExists,

    #[error("period {name} is still referenced by one or more schedules")]
    InUse { name: String },

    #[error("unknown or unresolvable IANA time zone: {0}")]
    InvalidTimeZone(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
