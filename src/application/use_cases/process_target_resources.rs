//! Per-target scheduler (C7, §4.4)
//!
//! The per-resource decision procedure ported 1:1 from
//! `_process_new_desired_state` in `schedulers/instance_scheduler.py`, plus
//! the EC2/RDS worker loops (`process_ec2_resources`/`process_rds_resources`)
//! that enumerate tagged resources for a single `(account, region, service)`
//! target, consult the decision procedure per resource, dispatch
//! start/stop/hibernate batches through bisect-retry, and reconcile the
//! resource registry and tags. RDS read replicas and Aurora cluster members
//! are rejected up front as `UnsupportedResource` (§7), matching the
//! source's `is_schedulable` check in `RdsService`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::application::ports::{DbClient, PerIdResult, VmClient};
use crate::application::services::bisect_retry::bisect_retry;
use crate::application::services::desired_state_evaluator;
use crate::application::services::tag_reconciler;
use crate::domain::entities::{ObservedState, Period, RegistryRecord, ResourceRuntimeInfo, Schedule};
use crate::domain::error::SchedulerError;
use crate::domain::repositories::ResourceRegistry;
use crate::domain::value_objects::{RequestedAction, ScheduleState, StoredState};
use crate::infrastructure::retry::{with_backoff, BackoffPolicy};

/// Outcome of the decision procedure for a single resource, before any
/// cloud call has been issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The resource has been observed as terminated; its registry record
    /// is removed and no further action is taken.
    Delete,
    /// No cloud call is warranted; `new_stored_state`, if present, is
    /// written back to the registry to keep bookkeeping current.
    RecordOnly { new_stored_state: StoredState },
    /// Nothing changes, not even the registry (property 3, idempotent
    /// no-op).
    NoOp,
    /// A cloud call is warranted.
    Act {
        action: RequestedAction,
        resize_to: Option<String>,
        new_stored_state: StoredState,
    },
}

fn last_matches_desired(last: StoredState, desired: ScheduleState) -> bool {
    match desired {
        ScheduleState::Running => last == StoredState::Running,
        ScheduleState::Stopped => last == StoredState::Stopped,
    }
}

fn apply(resource: &ResourceRuntimeInfo, schedule: &Schedule, desired_state: ScheduleState, desired_type: Option<&str>, last: StoredState) -> Decision {
    match desired_state {
        ScheduleState::Running => {
            if !resource.is_running() {
                let resize_to = desired_type
                    .filter(|t| resource.current_type() != Some(*t) && resource.kind.supports_resize())
                    .map(|t| t.to_string());
                Decision::Act {
                    action: RequestedAction::Start,
                    resize_to,
                    new_stored_state: StoredState::Running,
                }
            } else if last == StoredState::Stopped && schedule.retain_running {
                Decision::RecordOnly {
                    new_stored_state: StoredState::RetainRunning,
                }
            } else {
                Decision::RecordOnly {
                    new_stored_state: StoredState::Running,
                }
            }
        }
        ScheduleState::Stopped => {
            if resource.is_running() {
                let action = if schedule.hibernate {
                    RequestedAction::Hibernate
                } else {
                    RequestedAction::Stop
                };
                Decision::Act {
                    action,
                    resize_to: None,
                    new_stored_state: StoredState::Stopped,
                }
            } else {
                Decision::RecordOnly {
                    new_stored_state: StoredState::Stopped,
                }
            }
        }
    }
}

/// The decision procedure (§4.4 steps 1-4), pure and side-effect free: given
/// the observed resource, its bound schedule, the last recorded state, and
/// the already-evaluated desired triple, decides what (if anything) a
/// worker should do.
pub fn decide(
    resource: &ResourceRuntimeInfo,
    schedule: &Schedule,
    last: StoredState,
    desired_state: ScheduleState,
    desired_type: Option<&str>,
) -> Decision {
    if matches!(resource.state, ObservedState::Terminated) {
        return Decision::Delete;
    }

    match last {
        StoredState::Unknown => {
            if resource.is_running() && desired_state == ScheduleState::Stopped && !schedule.stop_new_instances {
                return Decision::RecordOnly {
                    new_stored_state: StoredState::Stopped,
                };
            }
            apply(resource, schedule, desired_state, desired_type, last)
        }
        StoredState::RetainRunning => {
            if desired_state == ScheduleState::Running {
                Decision::NoOp
            } else {
                Decision::RecordOnly {
                    new_stored_state: StoredState::Stopped,
                }
            }
        }
        _ if schedule.enforced => {
            let observed_matches_desired = resource.is_running() == (desired_state == ScheduleState::Running);
            if observed_matches_desired {
                Decision::NoOp
            } else {
                apply(resource, schedule, desired_state, desired_type, last)
            }
        }
        _ => {
            if last_matches_desired(last, desired_state) {
                Decision::NoOp
            } else {
                apply(resource, schedule, desired_state, desired_type, last)
            }
        }
    }
}

pub struct TargetResult {
    pub started: Vec<PerIdResult>,
    pub stopped: Vec<PerIdResult>,
    pub errors: Vec<SchedulerError>,
}

impl TargetResult {
    fn empty() -> Self {
        Self {
            started: Vec::new(),
            stopped: Vec::new(),
            errors: Vec::new(),
        }
    }
}

struct Batches {
    start_ids: Vec<String>,
    resizes: Vec<(String, String)>,
    stop_ids: Vec<String>,
    hibernate_ids: Vec<String>,
}

impl Batches {
    fn new() -> Self {
        Self {
            start_ids: Vec::new(),
            resizes: Vec::new(),
            stop_ids: Vec::new(),
            hibernate_ids: Vec::new(),
        }
    }
}

/// Runs the decision procedure over every resource tagged for `service` in
/// one EC2 `(account, region)` target and dispatches the resulting batches.
/// Registry writes happen per resource as decisions are made, keeping them
/// serialized within the worker per §5(a).
#[allow(clippy::too_many_arguments)]
pub async fn process_ec2_resources(
    vm_client: &dyn VmClient,
    registry: &dyn ResourceRegistry,
    account: &str,
    region: &str,
    schedule_tag_key: &str,
    schedules: &BTreeMap<String, Schedule>,
    periods: &BTreeMap<String, Period>,
    now: DateTime<Utc>,
    current_tick: u64,
    start_tags: &BTreeMap<String, String>,
    stop_tags: &BTreeMap<String, String>,
) -> Result<TargetResult, SchedulerError> {
    let resources = vm_client.describe_tagged(schedule_tag_key).await?;
    let mut result = TargetResult::empty();
    let mut batches = Batches::new();
    let mut seen_ids = Vec::new();

    for resource in &resources {
        seen_ids.push(resource.resource_id.clone());
        let Some(schedule_name) = resource.schedule_name(schedule_tag_key) else {
            continue;
        };
        let Some(schedule) = schedules.get(schedule_name) else {
            result.errors.push(SchedulerError::UnknownSchedule {
                resource_id: resource.resource_id.clone(),
            });
            continue;
        };

        let existing = registry
            .get(account, region, "ec2", &resource.resource_id)
            .await?;
        let last = existing.as_ref().map(|r| r.stored_state).unwrap_or(StoredState::Unknown);

        let desired = desired_state_evaluator::evaluate(schedule, periods, now, None);
        let decision = decide(resource, schedule, last, desired.state, desired.target_type.as_deref());

        match decision {
            Decision::Delete => {
                registry.delete(account, region, "ec2", &resource.resource_id).await?;
            }
            Decision::NoOp => {}
            Decision::RecordOnly { new_stored_state } => {
                write_registry(registry, existing, account, region, "ec2", resource, schedule_name, new_stored_state, current_tick).await?;
            }
            Decision::Act {
                action,
                resize_to,
                new_stored_state,
            } => {
                if let Some(target_type) = &resize_to {
                    batches.resizes.push((resource.resource_id.clone(), target_type.clone()));
                }
                match action {
                    RequestedAction::Start => batches.start_ids.push(resource.resource_id.clone()),
                    RequestedAction::Stop => batches.stop_ids.push(resource.resource_id.clone()),
                    RequestedAction::Hibernate => batches.hibernate_ids.push(resource.resource_id.clone()),
                    RequestedAction::Configure | RequestedAction::DoNothing => {}
                }
                write_registry(registry, existing, account, region, "ec2", resource, schedule_name, new_stored_state, current_tick).await?;
            }
        }
    }

    // Resize is best-effort and precedes the start batch; a resize failure
    // aborts the start for that one resource only (§4.4 step 5).
    let mut aborted_starts = Vec::new();
    for (resource_id, target_type) in &batches.resizes {
        if let Err(err) = vm_client.modify_type(resource_id, target_type).await {
            result.errors.push(err);
            aborted_starts.push(resource_id.clone());
        }
    }
    batches.start_ids.retain(|id| !aborted_starts.contains(id));

    let backoff = BackoffPolicy::default();

    if !batches.start_ids.is_empty() {
        let ids = batches.start_ids.clone();
        let started = bisect_retry(&ids, &|batch: Vec<String>| async {
            with_backoff(&backoff, || vm_client.start(&batch)).await
        })
        .await;
        result.started = started;
    }

    if !batches.stop_ids.is_empty() {
        let ids = batches.stop_ids.clone();
        let stopped = bisect_retry(&ids, &|batch: Vec<String>| async {
            with_backoff(&backoff, || vm_client.stop(&batch, false)).await
        })
        .await;
        result.stopped = stopped;
    }

    if !batches.hibernate_ids.is_empty() {
        let ids = batches.hibernate_ids.clone();
        let hibernated = bisect_retry(&ids, &|batch: Vec<String>| async {
            with_backoff(&backoff, || vm_client.stop(&batch, true)).await
        })
        .await;
        // Hibernation-unsupported fallback (S6): any id whose hibernate call
        // failed with "not configured" falls back to a plain stop and is
        // reported with action_taken = Stop; other failures propagate as-is.
        let mut fallback_ids = Vec::new();
        for r in hibernated {
            if r.is_ok() {
                result.stopped.push(r);
            } else if r
                .error
                .as_deref()
                .map(|e| e.contains("hibernation"))
                .unwrap_or(false)
            {
                fallback_ids.push(r.resource_id);
            } else {
                result.errors.push(SchedulerError::ClientException {
                    resource_id: r.resource_id.clone(),
                    source: r.error.unwrap_or_default(),
                });
            }
        }
        if !fallback_ids.is_empty() {
            let plain_stopped = bisect_retry(&fallback_ids, &|batch: Vec<String>| async {
                with_backoff(&backoff, || vm_client.stop(&batch, false)).await
            })
            .await;
            result.stopped.extend(plain_stopped);
        }
    }

    // Tag reconciliation: succeed-or-log, never undoes the state change
    // already recorded (§5(c)).
    for r in result.started.iter().filter(|r| r.is_ok()) {
        let _ = reconcile_and_tag(vm_client, &r.resource_id, RequestedAction::Start, start_tags, stop_tags).await;
    }
    for r in result.stopped.iter().filter(|r| r.is_ok()) {
        let _ = reconcile_and_tag(vm_client, &r.resource_id, RequestedAction::Stop, start_tags, stop_tags).await;
    }

    registry.prune_stale(account, region, "ec2", current_tick).await?;

    Ok(result)
}

async fn reconcile_and_tag(
    vm_client: &dyn VmClient,
    resource_id: &str,
    action: RequestedAction,
    start_tags: &BTreeMap<String, String>,
    stop_tags: &BTreeMap<String, String>,
) -> Result<(), SchedulerError> {
    let plan = tag_reconciler::reconcile(action, start_tags, stop_tags);
    if !plan.keys_to_remove.is_empty() {
        if let Err(err) = vm_client.delete_tags(resource_id, &plan.keys_to_remove).await {
            tracing::warn!(resource_id, error = %err, "tag removal failed after state change, ignoring");
        }
    }
    if !plan.tags_to_set.is_empty() {
        if let Err(err) = vm_client.create_tags(resource_id, &plan.tags_to_set).await {
            tracing::warn!(resource_id, error = %err, "tag update failed after state change, ignoring");
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn write_registry(
    registry: &dyn ResourceRegistry,
    existing: Option<RegistryRecord>,
    account: &str,
    region: &str,
    service: &str,
    resource: &ResourceRuntimeInfo,
    schedule_name: &str,
    new_stored_state: StoredState,
    tick: u64,
) -> Result<(), SchedulerError> {
    let mut record = existing.unwrap_or_else(|| {
        RegistryRecord::first_sight(
            account,
            region,
            service,
            resource.resource_id.clone(),
            resource.arn.clone(),
            schedule_name,
            tick,
        )
    });
    record.stored_state = new_stored_state;
    record.last_seen_tick = tick;
    registry.put(record).await
}

/// RDS variant of the per-target loop. Read replicas and Aurora cluster
/// members are rejected up front as `UnsupportedResource` (§7) since they
/// cannot be independently started/stopped.
pub async fn process_rds_resources(
    db_client: &dyn DbClient,
    registry: &dyn ResourceRegistry,
    account: &str,
    region: &str,
    schedule_tag_key: &str,
    schedules: &BTreeMap<String, Schedule>,
    periods: &BTreeMap<String, Period>,
    now: DateTime<Utc>,
    current_tick: u64,
) -> Result<TargetResult, SchedulerError> {
    let arns = db_client.describe_tagged_arns(schedule_tag_key).await?;
    let instances = db_client.describe_instances(&arns).await?;
    let clusters = db_client.describe_clusters(&arns).await?;

    let mut result = TargetResult::empty();
    let mut start_ids = Vec::new();
    let mut stop_ids = Vec::new();

    for resource in instances.iter().chain(clusters.iter()) {
        if let Err(reason) = resource.is_schedulable() {
            result.errors.push(SchedulerError::UnsupportedResource {
                resource_id: resource.resource_id.clone(),
                reason,
            });
            continue;
        }
        let Some(schedule_name) = resource.schedule_name(schedule_tag_key) else {
            continue;
        };
        let Some(schedule) = schedules.get(schedule_name) else {
            result.errors.push(SchedulerError::UnknownSchedule {
                resource_id: resource.resource_id.clone(),
            });
            continue;
        };

        let service = if matches!(resource.kind, crate::domain::entities::ResourceKind::RdsCluster) {
            "rds-cluster"
        } else {
            "rds"
        };
        let existing = registry.get(account, region, service, &resource.resource_id).await?;
        let last = existing.as_ref().map(|r| r.stored_state).unwrap_or(StoredState::Unknown);
        let desired = desired_state_evaluator::evaluate(schedule, periods, now, None);
        let decision = decide(resource, schedule, last, desired.state, desired.target_type.as_deref());

        match decision {
            Decision::Delete => {
                registry.delete(account, region, service, &resource.resource_id).await?;
            }
            Decision::NoOp => {}
            Decision::RecordOnly { new_stored_state } => {
                write_registry(registry, existing, account, region, service, resource, schedule_name, new_stored_state, current_tick).await?;
            }
            Decision::Act { action, new_stored_state, .. } => {
                match action {
                    RequestedAction::Start => start_ids.push((resource.resource_id.clone(), matches!(resource.kind, crate::domain::entities::ResourceKind::RdsCluster))),
                    RequestedAction::Stop | RequestedAction::Hibernate => {
                        stop_ids.push((resource.resource_id.clone(), matches!(resource.kind, crate::domain::entities::ResourceKind::RdsCluster)))
                    }
                    RequestedAction::Configure | RequestedAction::DoNothing => {}
                }
                write_registry(registry, existing, account, region, service, resource, schedule_name, new_stored_state, current_tick).await?;
            }
        }
    }

    let instance_starts: Vec<String> = start_ids.iter().filter(|(_, cluster)| !cluster).map(|(id, _)| id.clone()).collect();
    let cluster_starts: Vec<String> = start_ids.iter().filter(|(_, cluster)| *cluster).map(|(id, _)| id.clone()).collect();
    let instance_stops: Vec<String> = stop_ids.iter().filter(|(_, cluster)| !cluster).map(|(id, _)| id.clone()).collect();
    let cluster_stops: Vec<String> = stop_ids.iter().filter(|(_, cluster)| *cluster).map(|(id, _)| id.clone()).collect();

    if !instance_starts.is_empty() {
        result.started.extend(bisect_retry(&instance_starts, &|batch: Vec<String>| async move { db_client.start_db_instance(&batch).await }).await);
    }
    if !cluster_starts.is_empty() {
        result.started.extend(bisect_retry(&cluster_starts, &|batch: Vec<String>| async move { db_client.start_db_cluster(&batch).await }).await);
    }
    if !instance_stops.is_empty() {
        result.stopped.extend(bisect_retry(&instance_stops, &|batch: Vec<String>| async move { db_client.stop_db_instance(&batch, None).await }).await);
    }
    if !cluster_stops.is_empty() {
        result.stopped.extend(bisect_retry(&cluster_stops, &|batch: Vec<String>| async move { db_client.stop_db_cluster(&batch).await }).await);
    }

    registry.prune_stale(account, region, "rds", current_tick).await?;
    registry.prune_stale(account, region, "rds-cluster", current_tick).await?;

    Ok(result)
}
