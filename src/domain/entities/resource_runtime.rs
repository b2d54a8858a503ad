//! Resource runtime-info entity module
//!
//! Cloud-normalized snapshot consumed by the decision procedure (§4.4, C7).
//! One variant of `ResourceDetails` per service, mirroring the "inheritance
//! of service strategies -> interface abstraction" design note: EC2/RDS
//! share the `{enumerate, start, stop, hibernate?, resize?, tag}` capability
//! while ASGs get a distinct `{configure, inspect}` one (§9).

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Ec2Instance,
    RdsInstance,
    RdsCluster,
    AutoScalingGroup,
}

impl ResourceKind {
    pub fn supports_hibernate(self) -> bool {
        matches!(self, ResourceKind::Ec2Instance)
    }

    pub fn supports_resize(self) -> bool {
        matches!(
            self,
            ResourceKind::Ec2Instance | ResourceKind::RdsInstance | ResourceKind::RdsCluster
        )
    }
}

/// Cloud-observed state, normalized across services into a small closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedState {
    Running,
    Stopped,
    Transitional,
    Terminated,
}

impl ObservedState {
    pub fn is_running(self) -> bool {
        matches!(self, ObservedState::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceDetails {
    Ec2 {
        instance_type: String,
        preferred_instance_types: Option<Vec<String>>,
    },
    RdsInstance {
        instance_class: String,
        is_read_replica: bool,
        is_aurora_member: bool,
        preferred_maintenance_window: Option<String>,
    },
    RdsCluster {
        preferred_maintenance_window: Option<String>,
    },
    AutoScalingGroup {
        min_size: i32,
        desired_size: i32,
        max_size: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRuntimeInfo {
    pub resource_id: String,
    pub arn: String,
    pub account: String,
    pub region: String,
    pub kind: ResourceKind,
    pub state: ObservedState,
    pub tags: BTreeMap<String, String>,
    pub details: ResourceDetails,
}

impl ResourceRuntimeInfo {
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn schedule_name(&self, tag_key: &str) -> Option<&str> {
        self.tags.get(tag_key).map(String::as_str)
    }

    /// The current instance/instance-class type, where the resource kind
    /// has one, used to decide whether a resize precedes a start (§4.4).
    pub fn current_type(&self) -> Option<&str> {
        match &self.details {
            ResourceDetails::Ec2 { instance_type, .. } => Some(instance_type.as_str()),
            ResourceDetails::RdsInstance { instance_class, .. } => Some(instance_class.as_str()),
            _ => None,
        }
    }

    /// RDS read replicas and Aurora cluster members cannot be independently
    /// started/stopped; the scheduler reports `UnsupportedResource` for them.
    pub fn is_schedulable(&self) -> Result<(), String> {
        match &self.details {
            ResourceDetails::RdsInstance {
                is_read_replica,
                is_aurora_member,
                ..
            } if *is_read_replica => {
                let _ = is_aurora_member;
                Err("read replica instances cannot be scheduled independently".to_string())
            }
            ResourceDetails::RdsInstance {
                is_aurora_member, ..
            } if *is_aurora_member => {
                Err("aurora cluster members cannot be scheduled independently".to_string())
            }
            _ => Ok(()),
        }
    }
}
