//! Registry stored-state value module
//!
//! `StoredState` is the closed sum type the registry persists per resource,
//! replacing the source implementation's string literals per the "dynamic
//! typing -> tagged variants" design note.

use serde::{Deserialize, Serialize};

/// Last desired state recorded for a resource in the registry.
///
/// `Unknown` means the resource has not been scheduled once yet (first
/// sight); it is the state a freshly created `RegistryRecord` starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredState {
    Unknown,
    Running,
    Stopped,
    RetainRunning,
    Configured,
    Error,
}

impl StoredState {
    pub fn is_unknown(self) -> bool {
        matches!(self, StoredState::Unknown)
    }

    pub fn is_retain_running(self) -> bool {
        matches!(self, StoredState::RetainRunning)
    }
}

impl Default for StoredState {
    fn default() -> Self {
        StoredState::Unknown
    }
}
