//! Error code value module
//!
//! Tag value written to `IS-Error` when a per-resource action fails (§6).
//! Distinct from `SchedulerError` (the Rust error type propagated through
//! `Result`): this is the bit-exact string the resource gets tagged with so
//! an operator can `describe-tags` and see why a resource was skipped.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnknownSchedule,
    UnsupportedResource,
    UnschedulableState,
    ClientException,
    BatchPartialFailure,
    HibernationNotConfigured,
    AsgZeroMdm,
    RollbackFailed,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
