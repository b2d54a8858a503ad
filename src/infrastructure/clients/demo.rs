//! Demo cloud fixture (§6 external collaborators, kept out of scope for a
//! real AWS integration but required for the `tick` CLI path to run without
//! credentials)
//!
//! Holds EC2/RDS/ASG resources in memory and implements [`VmClient`],
//! [`DbClient`], [`AsgClient`] and [`IdentityBroker`] directly against that
//! state, standing in for a real datastore the way an in-memory repository
//! stands in for one in a demo/test path. One account, one region: `assume`
//! always hands back clients bound to the same shared state regardless of
//! the account/region arguments, since there is no real STS to model.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::application::ports::asg_client::{AsgClient, ScheduledAction};
use crate::application::ports::db_client::DbClient;
use crate::application::ports::identity_broker::{AssumedRoleHandle, IdentityBroker};
use crate::application::ports::vm_client::{PerIdResult, VmClient};
use crate::domain::entities::{ObservedState, ResourceDetails, ResourceKind, ResourceRuntimeInfo};
use crate::domain::error::SchedulerError;

#[derive(Default)]
struct DemoCloudState {
    ec2: Mutex<BTreeMap<String, ResourceRuntimeInfo>>,
    rds_instances: Mutex<BTreeMap<String, ResourceRuntimeInfo>>,
    rds_clusters: Mutex<BTreeMap<String, ResourceRuntimeInfo>>,
    asgs: Mutex<BTreeMap<String, ResourceRuntimeInfo>>,
    scheduled_actions: Mutex<BTreeMap<String, Vec<ScheduledAction>>>,
}

/// Owns the fixture's shared state and seeds it with resources before the
/// `IdentityBroker` handed out by [`DemoCloud::broker`] is wired into an
/// orchestrator run.
#[derive(Clone, Default)]
pub struct DemoCloud {
    state: Arc<DemoCloudState>,
}

impl DemoCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broker(&self) -> DemoIdentityBroker {
        DemoIdentityBroker { state: self.state.clone() }
    }

    pub fn seed_ec2(
        &self,
        resource_id: impl Into<String>,
        account: impl Into<String>,
        region: impl Into<String>,
        instance_type: impl Into<String>,
        running: bool,
        tags: BTreeMap<String, String>,
    ) {
        let resource_id = resource_id.into();
        let info = ResourceRuntimeInfo {
            arn: format!("arn:aws:ec2:demo:instance/{resource_id}"),
            account: account.into(),
            region: region.into(),
            kind: ResourceKind::Ec2Instance,
            state: if running { ObservedState::Running } else { ObservedState::Stopped },
            tags,
            details: ResourceDetails::Ec2 {
                instance_type: instance_type.into(),
                preferred_instance_types: None,
            },
            resource_id: resource_id.clone(),
        };
        self.state.ec2.lock().unwrap().insert(resource_id, info);
    }

    pub fn seed_rds_instance(
        &self,
        arn: impl Into<String>,
        account: impl Into<String>,
        region: impl Into<String>,
        instance_class: impl Into<String>,
        running: bool,
        tags: BTreeMap<String, String>,
    ) {
        let arn = arn.into();
        let info = ResourceRuntimeInfo {
            resource_id: arn.clone(),
            account: account.into(),
            region: region.into(),
            kind: ResourceKind::RdsInstance,
            state: if running { ObservedState::Running } else { ObservedState::Stopped },
            tags,
            details: ResourceDetails::RdsInstance {
                instance_class: instance_class.into(),
                is_read_replica: false,
                is_aurora_member: false,
                preferred_maintenance_window: None,
            },
            arn: arn.clone(),
        };
        self.state.rds_instances.lock().unwrap().insert(arn, info);
    }

    pub fn seed_asg(
        &self,
        group_name: impl Into<String>,
        account: impl Into<String>,
        region: impl Into<String>,
        min_size: i32,
        desired_size: i32,
        max_size: i32,
        tags: BTreeMap<String, String>,
    ) {
        let group_name = group_name.into();
        let info = ResourceRuntimeInfo {
            arn: format!("arn:aws:autoscaling:demo:group/{group_name}"),
            account: account.into(),
            region: region.into(),
            kind: ResourceKind::AutoScalingGroup,
            state: ObservedState::Running,
            tags,
            details: ResourceDetails::AutoScalingGroup { min_size, desired_size, max_size },
            resource_id: group_name.clone(),
        };
        self.state.asgs.lock().unwrap().insert(group_name, info);
    }
}

fn has_tag(info: &ResourceRuntimeInfo, tag_key: &str) -> bool {
    info.tags.contains_key(tag_key)
}

pub struct DemoVmClient {
    state: Arc<DemoCloudState>,
}

#[async_trait]
impl VmClient for DemoVmClient {
    async fn describe_tagged(&self, tag_key: &str) -> Result<Vec<ResourceRuntimeInfo>, SchedulerError> {
        Ok(self.state.ec2.lock().unwrap().values().filter(|r| has_tag(r, tag_key)).cloned().collect())
    }

    async fn start(&self, ids: &[String]) -> Result<Vec<PerIdResult>, SchedulerError> {
        let mut ec2 = self.state.ec2.lock().unwrap();
        Ok(ids
            .iter()
            .map(|id| match ec2.get_mut(id) {
                Some(r) => {
                    r.state = ObservedState::Running;
                    PerIdResult::ok(id.clone())
                }
                None => PerIdResult::failed(id.clone(), "no such instance"),
            })
            .collect())
    }

    async fn stop(&self, ids: &[String], _hibernate: bool) -> Result<Vec<PerIdResult>, SchedulerError> {
        let mut ec2 = self.state.ec2.lock().unwrap();
        Ok(ids
            .iter()
            .map(|id| match ec2.get_mut(id) {
                Some(r) => {
                    r.state = ObservedState::Stopped;
                    PerIdResult::ok(id.clone())
                }
                None => PerIdResult::failed(id.clone(), "no such instance"),
            })
            .collect())
    }

    async fn modify_type(&self, id: &str, new_type: &str) -> Result<(), SchedulerError> {
        let mut ec2 = self.state.ec2.lock().unwrap();
        if let Some(r) = ec2.get_mut(id) {
            if let ResourceDetails::Ec2 { instance_type, .. } = &mut r.details {
                *instance_type = new_type.to_string();
            }
        }
        Ok(())
    }

    async fn create_tags(&self, id: &str, tags: &BTreeMap<String, String>) -> Result<(), SchedulerError> {
        let mut ec2 = self.state.ec2.lock().unwrap();
        if let Some(r) = ec2.get_mut(id) {
            r.tags.extend(tags.clone());
        }
        Ok(())
    }

    async fn delete_tags(&self, id: &str, keys: &[String]) -> Result<(), SchedulerError> {
        let mut ec2 = self.state.ec2.lock().unwrap();
        if let Some(r) = ec2.get_mut(id) {
            for key in keys {
                r.tags.remove(key);
            }
        }
        Ok(())
    }
}

pub struct DemoDbClient {
    state: Arc<DemoCloudState>,
}

#[async_trait]
impl DbClient for DemoDbClient {
    async fn describe_tagged_arns(&self, tag_key: &str) -> Result<Vec<String>, SchedulerError> {
        let instances = self.state.rds_instances.lock().unwrap();
        let clusters = self.state.rds_clusters.lock().unwrap();
        Ok(instances
            .values()
            .chain(clusters.values())
            .filter(|r| has_tag(r, tag_key))
            .map(|r| r.arn.clone())
            .collect())
    }

    async fn describe_instances(&self, arns: &[String]) -> Result<Vec<ResourceRuntimeInfo>, SchedulerError> {
        let instances = self.state.rds_instances.lock().unwrap();
        Ok(arns.iter().filter_map(|a| instances.get(a).cloned()).collect())
    }

    async fn describe_clusters(&self, arns: &[String]) -> Result<Vec<ResourceRuntimeInfo>, SchedulerError> {
        let clusters = self.state.rds_clusters.lock().unwrap();
        Ok(arns.iter().filter_map(|a| clusters.get(a).cloned()).collect())
    }

    async fn start_db_instance(&self, arns: &[String]) -> Result<Vec<PerIdResult>, SchedulerError> {
        let mut instances = self.state.rds_instances.lock().unwrap();
        Ok(arns
            .iter()
            .map(|a| match instances.get_mut(a) {
                Some(r) => {
                    r.state = ObservedState::Running;
                    PerIdResult::ok(a.clone())
                }
                None => PerIdResult::failed(a.clone(), "no such db instance"),
            })
            .collect())
    }

    async fn stop_db_instance(&self, arns: &[String], _snapshot_name_prefix: Option<&str>) -> Result<Vec<PerIdResult>, SchedulerError> {
        let mut instances = self.state.rds_instances.lock().unwrap();
        Ok(arns
            .iter()
            .map(|a| match instances.get_mut(a) {
                Some(r) => {
                    r.state = ObservedState::Stopped;
                    PerIdResult::ok(a.clone())
                }
                None => PerIdResult::failed(a.clone(), "no such db instance"),
            })
            .collect())
    }

    async fn start_db_cluster(&self, arns: &[String]) -> Result<Vec<PerIdResult>, SchedulerError> {
        let mut clusters = self.state.rds_clusters.lock().unwrap();
        Ok(arns
            .iter()
            .map(|a| match clusters.get_mut(a) {
                Some(r) => {
                    r.state = ObservedState::Running;
                    PerIdResult::ok(a.clone())
                }
                None => PerIdResult::failed(a.clone(), "no such db cluster"),
            })
            .collect())
    }

    async fn stop_db_cluster(&self, arns: &[String]) -> Result<Vec<PerIdResult>, SchedulerError> {
        let mut clusters = self.state.rds_clusters.lock().unwrap();
        Ok(arns
            .iter()
            .map(|a| match clusters.get_mut(a) {
                Some(r) => {
                    r.state = ObservedState::Stopped;
                    PerIdResult::ok(a.clone())
                }
                None => PerIdResult::failed(a.clone(), "no such db cluster"),
            })
            .collect())
    }

    async fn add_tags(&self, arn: &str, tags: &BTreeMap<String, String>) -> Result<(), SchedulerError> {
        let mut instances = self.state.rds_instances.lock().unwrap();
        let mut clusters = self.state.rds_clusters.lock().unwrap();
        if let Some(r) = instances.get_mut(arn).or_else(|| clusters.get_mut(arn)) {
            r.tags.extend(tags.clone());
        }
        Ok(())
    }

    async fn remove_tags(&self, arn: &str, keys: &[String]) -> Result<(), SchedulerError> {
        let mut instances = self.state.rds_instances.lock().unwrap();
        let mut clusters = self.state.rds_clusters.lock().unwrap();
        if let Some(r) = instances.get_mut(arn).or_else(|| clusters.get_mut(arn)) {
            for key in keys {
                r.tags.remove(key);
            }
        }
        Ok(())
    }
}

pub struct DemoAsgClient {
    state: Arc<DemoCloudState>,
}

#[async_trait]
impl AsgClient for DemoAsgClient {
    async fn describe_tagged(&self, tag_key: &str) -> Result<Vec<ResourceRuntimeInfo>, SchedulerError> {
        Ok(self.state.asgs.lock().unwrap().values().filter(|r| has_tag(r, tag_key)).cloned().collect())
    }

    async fn describe_scheduled_actions(&self, group_name: &str) -> Result<Vec<ScheduledAction>, SchedulerError> {
        Ok(self.state.scheduled_actions.lock().unwrap().get(group_name).cloned().unwrap_or_default())
    }

    async fn batch_put_scheduled_update_group_action(&self, group_name: &str, actions: &[ScheduledAction]) -> Result<(), SchedulerError> {
        let mut scheduled = self.state.scheduled_actions.lock().unwrap();
        let entry = scheduled.entry(group_name.to_string()).or_default();
        for action in actions {
            entry.retain(|a| a.name != action.name);
            entry.push(action.clone());
        }
        Ok(())
    }

    async fn batch_delete_scheduled_action(&self, group_name: &str, action_names: &[String]) -> Result<(), SchedulerError> {
        if let Some(entry) = self.state.scheduled_actions.lock().unwrap().get_mut(group_name) {
            entry.retain(|a| !action_names.contains(&a.name));
        }
        Ok(())
    }

    async fn create_or_update_tags(&self, group_name: &str, tags: &BTreeMap<String, String>) -> Result<(), SchedulerError> {
        if let Some(r) = self.state.asgs.lock().unwrap().get_mut(group_name) {
            r.tags.extend(tags.clone());
        }
        Ok(())
    }
}

pub struct DemoIdentityBroker {
    state: Arc<DemoCloudState>,
}

#[async_trait]
impl IdentityBroker for DemoIdentityBroker {
    async fn assume(&self, _account: &str, _region: &str) -> Result<AssumedRoleHandle, SchedulerError> {
        Ok(AssumedRoleHandle {
            vm: Arc::new(DemoVmClient { state: self.state.clone() }),
            db: Arc::new(DemoDbClient { state: self.state.clone() }),
            asg: Arc::new(DemoAsgClient { state: self.state.clone() }),
        })
    }
}
