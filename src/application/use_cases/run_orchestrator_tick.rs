//! Orchestrator (C9, §4.6)
//!
//! Ports `SchedulingOrchestratorHandler.handle_request`: prefetch
//! schedules/periods with structured error collection, enumerate the
//! (service x account x region) cross product, build one snapshot per
//! target (progressively stripped if it would exceed the transport
//! threshold), and fan workers out as `tokio::spawn`ed tasks. Workers are
//! independent; a failed task is folded into the aggregate result without
//! failing the tick (§4.6 step 5, §7 "Infrastructure-level errors").

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::application::ports::{Clock, IdentityBroker};
use crate::application::use_cases::configure_asg_schedule::schedule_asg;
use crate::application::use_cases::process_target_resources::{process_ec2_resources, process_rds_resources, TargetResult};
use crate::domain::entities::{Period, Schedule};
use crate::domain::error::SchedulerError;
use crate::domain::repositories::{prefetch_valid_schedules, DefinitionStore, ResourceRegistry};
use crate::infrastructure::config::OrchestratorConfig;

#[derive(Debug, Clone)]
enum SnapshotPayload {
    Full {
        schedules: BTreeMap<String, Schedule>,
        periods: BTreeMap<String, Period>,
    },
    PeriodsStripped {
        schedules: BTreeMap<String, Schedule>,
    },
    FullyStripped,
}

fn estimated_size(schedules: &BTreeMap<String, Schedule>, periods: &BTreeMap<String, Period>) -> usize {
    serde_json::to_vec(&(schedules, periods)).map(|v| v.len()).unwrap_or(usize::MAX)
}

/// Builds the worker payload for one target, stripping periods and then
/// schedules if the full snapshot would exceed the transport threshold;
/// a stripped worker reloads the missing half directly from the store.
fn build_payload(schedules: &BTreeMap<String, Schedule>, periods: &BTreeMap<String, Period>, threshold_bytes: usize) -> SnapshotPayload {
    if estimated_size(schedules, periods) <= threshold_bytes {
        return SnapshotPayload::Full {
            schedules: schedules.clone(),
            periods: periods.clone(),
        };
    }
    let empty_periods = BTreeMap::new();
    if estimated_size(schedules, &empty_periods) <= threshold_bytes {
        return SnapshotPayload::PeriodsStripped {
            schedules: schedules.clone(),
        };
    }
    SnapshotPayload::FullyStripped
}

async fn resolve_payload(
    payload: SnapshotPayload,
    definition_store: &dyn DefinitionStore,
) -> Result<(BTreeMap<String, Schedule>, BTreeMap<String, Period>), SchedulerError> {
    match payload {
        SnapshotPayload::Full { schedules, periods } => Ok((schedules, periods)),
        SnapshotPayload::PeriodsStripped { schedules } => {
            let periods = definition_store.list_periods().await?;
            Ok((schedules, periods))
        }
        SnapshotPayload::FullyStripped => {
            let periods = definition_store.list_periods().await?;
            let schedules = definition_store.list_schedules().await?;
            let (schedules, _dropped) = prefetch_valid_schedules(schedules, &periods);
            Ok((schedules, periods))
        }
    }
}

#[derive(Debug, Default, serde::Serialize)]
pub struct TickSummary {
    pub definition_errors: Vec<String>,
    pub targets_processed: usize,
    pub worker_errors: Vec<String>,
    pub resources_started: usize,
    pub resources_stopped: usize,
    pub resources_configured: usize,
    pub per_resource_errors: Vec<String>,
}

async fn run_target(
    service: String,
    account: String,
    region: String,
    payload: SnapshotPayload,
    definition_store: Arc<dyn DefinitionStore>,
    registry: Arc<dyn ResourceRegistry>,
    identity_broker: Arc<dyn IdentityBroker>,
    schedule_tag_key: String,
    asg_action_prefix: String,
    start_tags: BTreeMap<String, String>,
    stop_tags: BTreeMap<String, String>,
    now: DateTime<Utc>,
    current_tick: u64,
) -> Result<TargetResult, SchedulerError> {
    let (schedules, periods) = resolve_payload(payload, definition_store.as_ref()).await?;
    let handle = identity_broker.assume(&account, &region).await?;

    match service.as_str() {
        "ec2" => {
            process_ec2_resources(
                handle.vm.as_ref(),
                registry.as_ref(),
                &account,
                &region,
                &schedule_tag_key,
                &schedules,
                &periods,
                now,
                current_tick,
                &start_tags,
                &stop_tags,
            )
            .await
        }
        "rds" => {
            process_rds_resources(
                handle.db.as_ref(),
                registry.as_ref(),
                &account,
                &region,
                &schedule_tag_key,
                &schedules,
                &periods,
                now,
                current_tick,
            )
            .await
        }
        "autoscaling" => {
            let groups = handle.asg.describe_tagged(&schedule_tag_key).await?;
            let mut result = TargetResult {
                started: Vec::new(),
                stopped: Vec::new(),
                errors: Vec::new(),
            };
            for group in &groups {
                let Some(schedule_name) = group.schedule_name(&schedule_tag_key) else {
                    continue;
                };
                let Some(schedule) = schedules.get(schedule_name) else {
                    result.errors.push(SchedulerError::UnknownSchedule {
                        resource_id: group.resource_id.clone(),
                    });
                    continue;
                };
                if let Err(err) = schedule_asg(
                    handle.asg.as_ref(),
                    registry.as_ref(),
                    &account,
                    &region,
                    group,
                    schedule,
                    &periods,
                    &asg_action_prefix,
                    now,
                )
                .await
                {
                    result.errors.push(err);
                }
            }
            Ok(result)
        }
        other => Err(SchedulerError::UnsupportedResource {
            resource_id: other.to_string(),
            reason: "unknown service".to_string(),
        }),
    }
}

/// Runs one orchestrator tick end to end (§4.6).
pub async fn run(
    definition_store: Arc<dyn DefinitionStore>,
    registry: Arc<dyn ResourceRegistry>,
    identity_broker: Arc<dyn IdentityBroker>,
    clock: Arc<dyn Clock>,
    config: OrchestratorConfig,
    current_tick: u64,
) -> TickSummary {
    let mut summary = TickSummary::default();

    let periods = match definition_store.list_periods().await {
        Ok(p) => p,
        Err(err) => {
            summary.worker_errors.push(format!("failed to load period library: {err}"));
            return summary;
        }
    };
    let schedules_raw = match definition_store.list_schedules().await {
        Ok(s) => s,
        Err(err) => {
            summary.worker_errors.push(format!("failed to load schedule library: {err}"));
            return summary;
        }
    };
    let (schedules, dropped) = prefetch_valid_schedules(schedules_raw, &periods);
    summary.definition_errors = dropped
        .into_iter()
        .map(|name| format!("schedule '{name}' references a missing period and was dropped"))
        .collect();

    let now = clock.now_utc();
    let deadline = Duration::from_secs(config.worker_deadline_secs);
    let mut handles = Vec::new();

    for (service, account, region) in config.targets() {
        let payload = build_payload(&schedules, &periods, config.transport_threshold_bytes);
        let definition_store = definition_store.clone();
        let registry = registry.clone();
        let identity_broker = identity_broker.clone();
        let schedule_tag_key = config.schedule_tag_key.clone();
        let asg_action_prefix = config.asg_action_name_prefix.clone();
        let start_tags = config.start_tags.clone();
        let stop_tags = config.stop_tags.clone();

        let task_service = service.clone();
        let task_account = account.clone();
        let task_region = region.clone();

        let handle = tokio::spawn(async move {
            tokio::time::timeout(
                deadline,
                run_target(
                    task_service,
                    task_account,
                    task_region,
                    payload,
                    definition_store,
                    registry,
                    identity_broker,
                    schedule_tag_key,
                    asg_action_prefix,
                    start_tags,
                    stop_tags,
                    now,
                    current_tick,
                ),
            )
            .await
        });
        handles.push((service, account, region, handle));
    }

    for (service, account, region, handle) in handles {
        summary.targets_processed += 1;
        match handle.await {
            Ok(Ok(Ok(result))) => {
                summary.resources_started += result.started.iter().filter(|r| r.is_ok()).count();
                summary.resources_stopped += result.stopped.iter().filter(|r| r.is_ok()).count();
                summary
                    .per_resource_errors
                    .extend(result.errors.iter().map(|e| e.to_string()));
            }
            Ok(Ok(Err(err))) => {
                tracing::error!(service, account, region, error = %err, "worker failed, tick continues");
                summary.worker_errors.push(format!("{service}/{account}/{region}: {err}"));
            }
            Ok(Err(_elapsed)) => {
                tracing::warn!(service, account, region, "worker deadline exceeded, in-flight batches finish, next tick reconciles");
                summary
                    .worker_errors
                    .push(format!("{service}/{account}/{region}: deadline exceeded"));
            }
            Err(join_err) => {
                tracing::error!(service, account, region, error = %join_err, "worker task panicked");
                summary
                    .worker_errors
                    .push(format!("{service}/{account}/{region}: worker task panicked"));
            }
        }
    }

    summary
}
