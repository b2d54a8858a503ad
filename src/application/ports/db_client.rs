//! DB service port (§6)
//!
//! RDS instance/cluster surface, ported from `RdsService`/`RdsClusterService`
//! in the source: describe by tag, describe by arn, start/stop (optionally
//! with a pre-stop snapshot), and tag maintenance.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::entities::ResourceRuntimeInfo;
use crate::domain::error::SchedulerError;

use super::vm_client::PerIdResult;

#[async_trait]
pub trait DbClient: Send + Sync {
    async fn describe_tagged_arns(&self, tag_key: &str) -> Result<Vec<String>, SchedulerError>;

    async fn describe_instances(&self, arns: &[String]) -> Result<Vec<ResourceRuntimeInfo>, SchedulerError>;

    async fn describe_clusters(&self, arns: &[String]) -> Result<Vec<ResourceRuntimeInfo>, SchedulerError>;

    async fn start_db_instance(&self, arns: &[String]) -> Result<Vec<PerIdResult>, SchedulerError>;

    async fn stop_db_instance(
        &self,
        arns: &[String],
        snapshot_name_prefix: Option<&str>,
    ) -> Result<Vec<PerIdResult>, SchedulerError>;

    async fn start_db_cluster(&self, arns: &[String]) -> Result<Vec<PerIdResult>, SchedulerError>;

    async fn stop_db_cluster(&self, arns: &[String]) -> Result<Vec<PerIdResult>, SchedulerError>;

    async fn add_tags(&self, arn: &str, tags: &BTreeMap<String, String>) -> Result<(), SchedulerError>;

    async fn remove_tags(&self, arn: &str, keys: &[String]) -> Result<(), SchedulerError>;
}
