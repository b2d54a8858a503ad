//! Desired-state value module
//!
//! `ScheduleState` is the output of period and schedule evaluation: whether a
//! resource should be running or stopped at a given instant. Kept distinct
//! from `StoredState`, which additionally tracks the registry-level bookkeeping
//! states (`Unknown`, `RetainRunning`, `Configured`, `Error`) that only make
//! sense once a decision has actually been recorded for a resource.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two states a period or schedule can resolve to at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScheduleState {
    Running,
    Stopped,
}

impl ScheduleState {
    pub fn is_running(self) -> bool {
        matches!(self, ScheduleState::Running)
    }
}

impl fmt::Display for ScheduleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleState::Running => write!(f, "running"),
            ScheduleState::Stopped => write!(f, "stopped"),
        }
    }
}
