//! Requested-action value module

use serde::{Deserialize, Serialize};

/// The action a worker should take against a resource after the decision
/// procedure (§4.4) or the ASG reconfigure check (§4.5) has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedAction {
    Start,
    Stop,
    Hibernate,
    Configure,
    DoNothing,
}
