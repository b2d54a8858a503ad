//! ASG service port (§6)
//!
//! `describe_tagged`, scheduled-action CRUD, and tag maintenance, ported
//! from `AsgService`'s use of the auto-scaling control plane in
//! `asg_service.py`.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::entities::ResourceRuntimeInfo;
use crate::domain::error::SchedulerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAction {
    pub name: String,
    pub recurrence_cron: String,
    pub min_size: Option<i32>,
    pub desired_size: Option<i32>,
    pub max_size: Option<i32>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AsgClient: Send + Sync {
    async fn describe_tagged(&self, tag_key: &str) -> Result<Vec<ResourceRuntimeInfo>, SchedulerError>;

    async fn describe_scheduled_actions(&self, group_name: &str) -> Result<Vec<ScheduledAction>, SchedulerError>;

    async fn batch_put_scheduled_update_group_action(
        &self,
        group_name: &str,
        actions: &[ScheduledAction],
    ) -> Result<(), SchedulerError>;

    async fn batch_delete_scheduled_action(
        &self,
        group_name: &str,
        action_names: &[String],
    ) -> Result<(), SchedulerError>;

    async fn create_or_update_tags(
        &self,
        group_name: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), SchedulerError>;
}
