//! ASG scheduler (C8, §4.5)
//!
//! Translates a schedule into a set of scheduled scaling actions and
//! installs them on the group, ported from `AsgService.schedule_asg` in
//! `scheduling/asg/asg_service.py`: MDM tag bootstrap, configuration
//! fingerprint comparison, reconfigure-with-rollback, and the
//! `is_compatible_schedule` check exposed for the external admin surface.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::application::ports::AsgClient;
use crate::domain::entities::{Period, RegistryRecord, ResourceDetails, ResourceRuntimeInfo, Schedule};
use crate::domain::error::SchedulerError;
use crate::domain::repositories::ResourceRegistry;
use crate::domain::value_objects::{AsgSize, ErrorCode, RequestedAction};
use crate::infrastructure::cron::schedule_to_actions;

const MDM_TAG_KEY: &str = "IS-MinDesiredMax";
const ERROR_TAG_KEY: &str = "IS-Error";
const ERROR_MESSAGE_TAG_KEY: &str = "IS-ErrorMessage";
const VALID_FOR: Duration = Duration::days(30);
const REFRESH_LOOKAHEAD: Duration = Duration::days(1);

fn running_size_from(resource: &ResourceRuntimeInfo) -> Option<AsgSize> {
    match &resource.details {
        ResourceDetails::AutoScalingGroup {
            min_size,
            desired_size,
            max_size,
        } => Some(AsgSize::new(*min_size, *desired_size, *max_size)),
        _ => None,
    }
}

async fn bootstrap_mdm(asg_client: &dyn AsgClient, resource: &ResourceRuntimeInfo) -> Result<Option<AsgSize>, SchedulerError> {
    if let Some(tag_value) = resource.tags.get(MDM_TAG_KEY) {
        return match AsgSize::from_mdm_str(tag_value) {
            Ok(size) => Ok(Some(size)),
            Err(_) => Err(SchedulerError::ClientException {
                resource_id: resource.resource_id.clone(),
                source: format!("malformed {} tag value '{}'", MDM_TAG_KEY, tag_value),
            }),
        };
    }

    let current = running_size_from(resource).ok_or_else(|| SchedulerError::UnsupportedResource {
        resource_id: resource.resource_id.clone(),
        reason: "not an auto-scaling group".to_string(),
    })?;

    let mut tags = BTreeMap::new();
    tags.insert(MDM_TAG_KEY.to_string(), current.to_mdm_str());
    asg_client.create_or_update_tags(&resource.resource_id, &tags).await?;
    Ok(Some(current))
}

/// Returns `(supported, reason)` for a schedule without installing it,
/// exposed to the external admin surface exactly as
/// `AsgService.is_compatibile_schedule`.
pub fn is_compatible_schedule(schedule: &Schedule, periods: &BTreeMap<String, Period>) -> (bool, Option<String>) {
    let dummy = AsgSize::new(1, 1, 1);
    for period_ref in &schedule.period_refs {
        match periods.get(&period_ref.period_name) {
            Some(period) => {
                let actions = schedule_to_actions("IS-", period, dummy);
                if actions.is_empty() {
                    return (
                        false,
                        Some(format!("period '{}' has neither a begin nor an end time", period.name)),
                    );
                }
            }
            None => {
                return (
                    false,
                    Some(format!("schedule references unknown period '{}'", period_ref.period_name)),
                )
            }
        }
    }
    (true, None)
}

/// Runs the ASG reconfigure check for one group and, if warranted,
/// installs the new scheduled actions. Returns the action actually taken.
pub async fn schedule_asg(
    asg_client: &dyn AsgClient,
    registry: &dyn ResourceRegistry,
    account: &str,
    region: &str,
    resource: &ResourceRuntimeInfo,
    schedule: &Schedule,
    periods: &BTreeMap<String, Period>,
    action_name_prefix: &str,
    now: DateTime<Utc>,
) -> Result<RequestedAction, SchedulerError> {
    let Some(mdm) = bootstrap_mdm(asg_client, resource).await? else {
        return Ok(RequestedAction::DoNothing);
    };

    if mdm.is_zero() {
        let mut tags = BTreeMap::new();
        tags.insert(ERROR_TAG_KEY.to_string(), ErrorCode::AsgZeroMdm.to_string());
        tags.insert(
            ERROR_MESSAGE_TAG_KEY.to_string(),
            "min-desired-max is 0-0-0; set a nonzero running target before scheduling".to_string(),
        );
        asg_client.create_or_update_tags(&resource.resource_id, &tags).await?;
        return Ok(RequestedAction::DoNothing);
    }

    let existing_record = registry.get(account, region, "autoscaling", &resource.resource_id).await?;
    let fingerprint = schedule.to_hash(periods);

    let needs_reconfigure = match &existing_record {
        None => true,
        Some(record) => match &record.last_configured {
            None => true,
            Some(last) => {
                last.asg_size != mdm || last.schedule_hash != fingerprint || now >= last.valid_until - REFRESH_LOOKAHEAD
            }
        },
    };

    if !needs_reconfigure {
        return Ok(RequestedAction::DoNothing);
    }

    let new_actions: Vec<_> = schedule
        .period_refs
        .iter()
        .filter_map(|period_ref| periods.get(&period_ref.period_name))
        .flat_map(|period| schedule_to_actions(action_name_prefix, period, mdm))
        .collect();

    let remembered = asg_client
        .describe_scheduled_actions(&resource.resource_id)
        .await?
        .into_iter()
        .filter(|a| a.name.starts_with(action_name_prefix))
        .collect::<Vec<_>>();
    let remembered_names: Vec<String> = remembered.iter().map(|a| a.name.clone()).collect();

    if !remembered_names.is_empty() {
        asg_client
            .batch_delete_scheduled_action(&resource.resource_id, &remembered_names)
            .await?;
    }

    if let Err(put_err) = asg_client
        .batch_put_scheduled_update_group_action(&resource.resource_id, &new_actions)
        .await
    {
        if !remembered.is_empty() {
            if let Err(rollback_err) = asg_client
                .batch_put_scheduled_update_group_action(&resource.resource_id, &remembered)
                .await
            {
                return Err(SchedulerError::RollbackFailed {
                    resource_id: resource.resource_id.clone(),
                    original: put_err.to_string(),
                    rollback: rollback_err.to_string(),
                });
            }
        }
        return Err(put_err);
    }

    let mut record = existing_record.unwrap_or_else(|| {
        RegistryRecord::first_sight(
            account,
            region,
            "autoscaling",
            resource.resource_id.clone(),
            resource.arn.clone(),
            schedule.name.clone(),
            0,
        )
    });
    record.stored_state = crate::domain::value_objects::StoredState::Configured;
    record.last_configured = Some(crate::domain::entities::LastConfigured {
        asg_size: mdm,
        schedule_hash: fingerprint,
        valid_until: now + VALID_FOR,
    });
    registry.put(record).await?;

    Ok(RequestedAction::Configure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ScheduledAction;
    use crate::domain::entities::PeriodRef;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeAsgClient {
        existing_actions: Mutex<Vec<ScheduledAction>>,
        put_calls: Mutex<u32>,
        tag_calls: Mutex<Vec<(String, BTreeMap<String, String>)>>,
    }

    #[async_trait]
    impl AsgClient for FakeAsgClient {
        async fn describe_tagged(&self, _tag_key: &str) -> Result<Vec<ResourceRuntimeInfo>, SchedulerError> {
            Ok(Vec::new())
        }
        async fn describe_scheduled_actions(&self, _group_name: &str) -> Result<Vec<ScheduledAction>, SchedulerError> {
            Ok(self.existing_actions.lock().unwrap().clone())
        }
        async fn batch_put_scheduled_update_group_action(&self, _group_name: &str, actions: &[ScheduledAction]) -> Result<(), SchedulerError> {
            *self.put_calls.lock().unwrap() += 1;
            *self.existing_actions.lock().unwrap() = actions.to_vec();
            Ok(())
        }
        async fn batch_delete_scheduled_action(&self, _group_name: &str, _action_names: &[String]) -> Result<(), SchedulerError> {
            self.existing_actions.lock().unwrap().clear();
            Ok(())
        }
        async fn create_or_update_tags(&self, group_name: &str, tags: &BTreeMap<String, String>) -> Result<(), SchedulerError> {
            self.tag_calls.lock().unwrap().push((group_name.to_string(), tags.clone()));
            Ok(())
        }
    }

    fn asg_resource(mdm_tag: Option<&str>) -> ResourceRuntimeInfo {
        let mut tags = BTreeMap::new();
        if let Some(v) = mdm_tag {
            tags.insert(MDM_TAG_KEY.to_string(), v.to_string());
        }
        ResourceRuntimeInfo {
            resource_id: "my-asg".to_string(),
            arn: "arn:aws:autoscaling:my-asg".to_string(),
            account: "111".to_string(),
            region: "us-east-1".to_string(),
            kind: crate::domain::entities::ResourceKind::AutoScalingGroup,
            state: crate::domain::entities::ObservedState::Running,
            tags,
            details: ResourceDetails::AutoScalingGroup {
                min_size: 2,
                desired_size: 4,
                max_size: 6,
            },
        }
    }

    fn weekday_schedule() -> (Schedule, BTreeMap<String, Period>) {
        let tz: chrono_tz::Tz = "UTC".parse().unwrap();
        let period = Period::builder("business-hours")
            .begin_time(chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap())
            .end_time(chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap())
            .weekdays(std::collections::BTreeSet::from([0, 1, 2, 3, 4]))
            .build()
            .unwrap();
        let schedule = Schedule::builder("biz", tz)
            .period_ref(PeriodRef::new("business-hours"))
            .build()
            .unwrap();
        let mut periods = BTreeMap::new();
        periods.insert(period.name.clone(), period);
        (schedule, periods)
    }

    struct InMemoryRegistry(Mutex<BTreeMap<String, RegistryRecord>>);

    #[async_trait]
    impl ResourceRegistry for InMemoryRegistry {
        async fn get(&self, _account: &str, _region: &str, _service: &str, resource_id: &str) -> Result<Option<RegistryRecord>, SchedulerError> {
            Ok(self.0.lock().unwrap().get(resource_id).cloned())
        }
        async fn scan_target(&self, _account: &str, _region: &str, _service: &str) -> Result<Vec<RegistryRecord>, SchedulerError> {
            Ok(self.0.lock().unwrap().values().cloned().collect())
        }
        async fn put(&self, record: RegistryRecord) -> Result<(), SchedulerError> {
            self.0.lock().unwrap().insert(record.resource_id.clone(), record);
            Ok(())
        }
        async fn delete(&self, _account: &str, _region: &str, _service: &str, resource_id: &str) -> Result<(), SchedulerError> {
            self.0.lock().unwrap().remove(resource_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn first_tick_installs_start_and_stop_actions_scenario_s3() {
        let asg_client = FakeAsgClient {
            existing_actions: Mutex::new(Vec::new()),
            put_calls: Mutex::new(0),
            tag_calls: Mutex::new(Vec::new()),
        };
        let registry = InMemoryRegistry(Mutex::new(BTreeMap::new()));
        let resource = asg_resource(Some("2-4-6"));
        let (schedule, periods) = weekday_schedule();
        let now = Utc::now();

        let action = schedule_asg(&asg_client, &registry, "111", "us-east-1", &resource, &schedule, &periods, "IS-", now)
            .await
            .unwrap();
        assert_eq!(action, RequestedAction::Configure);
        assert_eq!(*asg_client.put_calls.lock().unwrap(), 1);
        assert_eq!(asg_client.existing_actions.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unchanged_second_tick_issues_no_put_call_property_8() {
        let asg_client = FakeAsgClient {
            existing_actions: Mutex::new(Vec::new()),
            put_calls: Mutex::new(0),
            tag_calls: Mutex::new(Vec::new()),
        };
        let registry = InMemoryRegistry(Mutex::new(BTreeMap::new()));
        let resource = asg_resource(Some("2-4-6"));
        let (schedule, periods) = weekday_schedule();
        let now = Utc::now();

        schedule_asg(&asg_client, &registry, "111", "us-east-1", &resource, &schedule, &periods, "IS-", now)
            .await
            .unwrap();
        assert_eq!(*asg_client.put_calls.lock().unwrap(), 1);

        let action = schedule_asg(&asg_client, &registry, "111", "us-east-1", &resource, &schedule, &periods, "IS-", now)
            .await
            .unwrap();
        assert_eq!(action, RequestedAction::DoNothing);
        assert_eq!(*asg_client.put_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn mdm_change_triggers_reconfigure() {
        let asg_client = FakeAsgClient {
            existing_actions: Mutex::new(Vec::new()),
            put_calls: Mutex::new(0),
            tag_calls: Mutex::new(Vec::new()),
        };
        let registry = InMemoryRegistry(Mutex::new(BTreeMap::new()));
        let (schedule, periods) = weekday_schedule();
        let now = Utc::now();

        schedule_asg(&asg_client, &registry, "111", "us-east-1", &asg_resource(Some("2-4-6")), &schedule, &periods, "IS-", now)
            .await
            .unwrap();
        assert_eq!(*asg_client.put_calls.lock().unwrap(), 1);

        let action = schedule_asg(&asg_client, &registry, "111", "us-east-1", &asg_resource(Some("3-5-7")), &schedule, &periods, "IS-", now)
            .await
            .unwrap();
        assert_eq!(action, RequestedAction::Configure);
        assert_eq!(*asg_client.put_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn zero_mdm_installs_no_actions() {
        let asg_client = FakeAsgClient {
            existing_actions: Mutex::new(Vec::new()),
            put_calls: Mutex::new(0),
            tag_calls: Mutex::new(Vec::new()),
        };
        let registry = InMemoryRegistry(Mutex::new(BTreeMap::new()));
        let (schedule, periods) = weekday_schedule();
        let action = schedule_asg(&asg_client, &registry, "111", "us-east-1", &asg_resource(Some("0-0-0")), &schedule, &periods, "IS-", Utc::now())
            .await
            .unwrap();
        assert_eq!(action, RequestedAction::DoNothing);
        assert_eq!(*asg_client.put_calls.lock().unwrap(), 0);
        assert!(!asg_client.tag_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unchanged_second_tick_issues_no_put_call_on_mock_property_8() {
        use crate::application::ports::asg_client::MockAsgClient;

        let mut first_tick_client = MockAsgClient::new();
        first_tick_client.expect_describe_scheduled_actions().returning(|_| Ok(Vec::new()));
        first_tick_client
            .expect_batch_put_scheduled_update_group_action()
            .times(1)
            .returning(|_, _| Ok(()));

        let registry = InMemoryRegistry(Mutex::new(BTreeMap::new()));
        let resource = asg_resource(Some("2-4-6"));
        let (schedule, periods) = weekday_schedule();
        let now = Utc::now();

        schedule_asg(&first_tick_client, &registry, "111", "us-east-1", &resource, &schedule, &periods, "IS-", now)
            .await
            .unwrap();

        // Second tick against the same inputs: the installed action's
        // fingerprint already matches, so no put call should occur at all.
        let mut second_tick_client = MockAsgClient::new();
        second_tick_client.expect_batch_put_scheduled_update_group_action().times(0);

        let action = schedule_asg(&second_tick_client, &registry, "111", "us-east-1", &resource, &schedule, &periods, "IS-", now)
            .await
            .unwrap();
        assert_eq!(action, RequestedAction::DoNothing);
    }

    #[test]
    fn compatible_schedule_check_reports_missing_period() {
        let tz: chrono_tz::Tz = "UTC".parse().unwrap();
        let schedule = Schedule::builder("broken", tz)
            .period_ref(PeriodRef::new("lunch"))
            .build()
            .unwrap();
        let (ok, reason) = is_compatible_schedule(&schedule, &BTreeMap::new());
        assert!(!ok);
        assert!(reason.unwrap().contains("lunch"));
    }
}
