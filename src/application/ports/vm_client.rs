//! VM service port (§6)
//!
//! `describe_tagged`, `start`, `stop`, `modify_type`, `create_tags` /
//! `delete_tags`, ported from the EC2 surface of `InstanceScheduler`'s
//! `EC2Service`. Per-id batch results use `PerIdResult` so bisect-retry
//! (`application::services::bisect_retry`) can isolate poisoned ids.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::entities::ResourceRuntimeInfo;
use crate::domain::error::SchedulerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerIdResult {
    pub resource_id: String,
    pub error: Option<String>,
}

impl PerIdResult {
    pub fn ok(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            error: None,
        }
    }

    pub fn failed(resource_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[async_trait]
pub trait VmClient: Send + Sync {
    async fn describe_tagged(&self, tag_key: &str) -> Result<Vec<ResourceRuntimeInfo>, SchedulerError>;

    async fn start(&self, ids: &[String]) -> Result<Vec<PerIdResult>, SchedulerError>;

    async fn stop(&self, ids: &[String], hibernate: bool) -> Result<Vec<PerIdResult>, SchedulerError>;

    async fn modify_type(&self, id: &str, new_type: &str) -> Result<(), SchedulerError>;

    async fn create_tags(&self, id: &str, tags: &BTreeMap<String, String>) -> Result<(), SchedulerError>;

    async fn delete_tags(&self, id: &str, keys: &[String]) -> Result<(), SchedulerError>;
}
