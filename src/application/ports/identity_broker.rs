//! Identity broker port (§6)
//!
//! Given an account id, returns a typed-client bundle bound to that account
//! and region, standing in for the source's assumed-role session factory.
//! The scheduling core never sees credentials, only the resulting clients.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::error::SchedulerError;

use super::asg_client::AsgClient;
use super::db_client::DbClient;
use super::vm_client::VmClient;

pub struct AssumedRoleHandle {
    pub vm: Arc<dyn VmClient>,
    pub db: Arc<dyn DbClient>,
    pub asg: Arc<dyn AsgClient>,
}

#[async_trait]
pub trait IdentityBroker: Send + Sync {
    async fn assume(&self, account: &str, region: &str) -> Result<AssumedRoleHandle, SchedulerError>;
}
