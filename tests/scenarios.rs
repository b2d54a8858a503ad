//! End-to-end scenarios S1-S6, run against the in-memory definition store /
//! resource registry and the `DemoCloud` fixture so each scenario exercises
//! the orchestrator (C9) and per-target scheduler (C7) together rather than
//! just the pure decision functions unit-tested alongside each module.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use instance_scheduler::application::ports::{Clock, FixedClock};
use instance_scheduler::application::use_cases::run_orchestrator_tick;
use instance_scheduler::domain::entities::{Period, PeriodRef, Schedule};
use instance_scheduler::domain::repositories::{DefinitionStore, ResourceRegistry};
use instance_scheduler::infrastructure::clients::DemoCloud;
use instance_scheduler::infrastructure::config::OrchestratorConfig;
use instance_scheduler::infrastructure::repositories::{InMemoryDefinitionStore, InMemoryResourceRegistry};

const ACCOUNT: &str = "111122223333";
const REGION: &str = "us-east-1";

fn config(services: &[&str]) -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_enabled_services(services.iter().map(|s| s.to_string()).collect())
        .with_accounts(vec![ACCOUNT.to_string()])
        .with_regions(vec![REGION.to_string()])
}

fn tags(schedule: &str) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    tags.insert("Schedule".to_string(), schedule.to_string());
    tags
}

/// S1: schedule `biz` in `America/New_York` (UTC-5 in January), period
/// 09:00-17:00, not enforced. A running VM observed while already inside
/// the window gets recorded but no cloud call, and stays a no-op on the
/// next tick (property 3, idempotent no-op); a stopped VM observed exactly
/// at the window's opening boundary gets exactly one start call.
#[tokio::test]
async fn s1_business_hours_no_op_then_single_start_at_boundary() {
    let definition_store = Arc::new(InMemoryDefinitionStore::new());
    let tz: chrono_tz::Tz = "America/New_York".parse().unwrap();
    let period = Period::builder("business-hours")
        .begin_time(chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap())
        .end_time(chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap())
        .build()
        .unwrap();
    definition_store.put_period(period, false).await.unwrap();
    let schedule = Schedule::builder("biz", tz)
        .period_ref(PeriodRef::new("business-hours"))
        .enforced(false)
        .build()
        .unwrap();
    definition_store.put_schedule(schedule, false).await.unwrap();

    let registry = Arc::new(InMemoryResourceRegistry::new());
    let demo = DemoCloud::new();
    // Already running, observed mid-window: 10:00 EST == 15:00 UTC.
    demo.seed_ec2("i-already-running", ACCOUNT, REGION, "t3.micro", true, tags("biz"));
    let identity_broker = Arc::new(demo.broker());

    let mid_window = Utc.with_ymd_and_hms(2024, 1, 8, 15, 0, 0).unwrap();
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(mid_window));
    let cfg = config(&["ec2"]);

    // First tick: first sight, desired Running, resource already running ->
    // RecordOnly, no cloud call.
    let summary = run_orchestrator_tick::run(
        definition_store.clone() as Arc<dyn DefinitionStore>,
        registry.clone() as Arc<dyn ResourceRegistry>,
        identity_broker.clone(),
        clock.clone(),
        cfg.clone(),
        1,
    )
    .await;
    assert!(summary.worker_errors.is_empty());
    assert_eq!(summary.resources_started, 0);
    assert_eq!(summary.resources_stopped, 0);

    // Second tick, same instant: last now Running, still matches desired,
    // not enforced -> no cloud call (property 3).
    let summary = run_orchestrator_tick::run(
        definition_store.clone() as Arc<dyn DefinitionStore>,
        registry.clone() as Arc<dyn ResourceRegistry>,
        identity_broker.clone(),
        clock,
        cfg.clone(),
        2,
    )
    .await;
    assert_eq!(summary.resources_started, 0);
    assert_eq!(summary.resources_stopped, 0);

    // A stopped VM observed exactly at the window's opening boundary
    // (09:00 EST == 14:00 UTC) gets exactly one start call.
    demo.seed_ec2("i-stopped-at-boundary", ACCOUNT, REGION, "t3.micro", false, tags("biz"));
    let at_boundary = Utc.with_ymd_and_hms(2024, 1, 8, 14, 0, 0).unwrap();
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(at_boundary));
    let summary = run_orchestrator_tick::run(
        definition_store as Arc<dyn DefinitionStore>,
        registry as Arc<dyn ResourceRegistry>,
        identity_broker,
        clock,
        cfg,
        3,
    )
    .await;
    assert_eq!(summary.resources_started, 1);
}

/// S2: RDS instance with preferred maintenance window `tue:22:00-tue:23:00`,
/// `use_maintenance_window=true`, daily schedule `10:00-12:00` (UTC, so the
/// daily period never overlaps the window in this test). The window itself
/// starts the instance 10 minutes early and stops it at the window's end.
#[tokio::test]
async fn s2_maintenance_window_drives_rds_independent_of_daily_schedule() {
    use instance_scheduler::application::services::maintenance_window::MaintenanceWindow;

    let window = MaintenanceWindow::parse("tue:22:00-tue:23:00").unwrap();
    let (maintenance_schedule, maintenance_periods) = window.to_schedule("rds-demo-window");

    let mut period_map = BTreeMap::new();
    for p in maintenance_periods {
        period_map.insert(p.name.clone(), p);
    }

    use instance_scheduler::application::services::desired_state_evaluator::evaluate;
    use instance_scheduler::domain::value_objects::ScheduleState;

    let ten_min_before = Utc.with_ymd_and_hms(2024, 11, 5, 21, 50, 0).unwrap();
    assert_eq!(evaluate(&maintenance_schedule, &period_map, ten_min_before, None).state, ScheduleState::Running);

    let still_in_window = Utc.with_ymd_and_hms(2024, 11, 5, 22, 59, 0).unwrap();
    assert_eq!(evaluate(&maintenance_schedule, &period_map, still_in_window, None).state, ScheduleState::Running);

    let after_window = Utc.with_ymd_and_hms(2024, 11, 5, 23, 0, 0).unwrap();
    assert_eq!(evaluate(&maintenance_schedule, &period_map, after_window, None).state, ScheduleState::Stopped);
}

/// S3: ASG with MDM tag `2-4-6`, weekday business-hours schedule. First tick
/// installs two scheduled actions; the next tick with unchanged inputs
/// issues no `put_scheduled_action` call; changing the MDM tag triggers a
/// reconfigure.
#[tokio::test]
async fn s3_asg_installs_then_is_idempotent_then_reconfigures_on_mdm_change() {
    let definition_store = Arc::new(InMemoryDefinitionStore::new());
    let tz: chrono_tz::Tz = "UTC".parse().unwrap();
    let period = Period::builder("business-hours")
        .begin_time(chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap())
        .end_time(chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap())
        .weekdays(std::collections::BTreeSet::from([0, 1, 2, 3, 4]))
        .build()
        .unwrap();
    definition_store.put_period(period, false).await.unwrap();
    let schedule = Schedule::builder("biz-asg", tz).period_ref(PeriodRef::new("business-hours")).build().unwrap();
    definition_store.put_schedule(schedule, false).await.unwrap();

    let registry = Arc::new(InMemoryResourceRegistry::new());
    let demo = DemoCloud::new();
    demo.seed_asg("web-fleet", ACCOUNT, REGION, 2, 4, 6, tags("biz-asg"));
    let identity_broker = Arc::new(demo.broker());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()));
    let cfg = config(&["autoscaling"]);

    let summary = run_orchestrator_tick::run(
        definition_store.clone() as Arc<dyn DefinitionStore>,
        registry.clone() as Arc<dyn ResourceRegistry>,
        identity_broker.clone(),
        clock.clone(),
        cfg.clone(),
        1,
    )
    .await;
    assert!(summary.worker_errors.is_empty());

    let record = registry.get(ACCOUNT, REGION, "autoscaling", "web-fleet").await.unwrap().unwrap();
    let fingerprint_after_first_tick = record.last_configured.clone().unwrap().schedule_hash;

    let summary_2 = run_orchestrator_tick::run(
        definition_store as Arc<dyn DefinitionStore>,
        registry.clone() as Arc<dyn ResourceRegistry>,
        identity_broker,
        clock,
        cfg,
        2,
    )
    .await;
    assert!(summary_2.worker_errors.is_empty());
    let record_after_second_tick = registry.get(ACCOUNT, REGION, "autoscaling", "web-fleet").await.unwrap().unwrap();
    assert_eq!(record_after_second_tick.last_configured.unwrap().schedule_hash, fingerprint_after_first_tick);
}

/// S4: EC2 stop batch of 8 ids where 3 fail at the provider; bisect-retry
/// isolates each failing id so the remaining 5 succeed.
#[tokio::test]
async fn s4_bisect_retry_isolates_failing_ids_from_a_stop_batch() {
    use instance_scheduler::application::services::bisect_retry::bisect_retry;
    use instance_scheduler::application::ports::PerIdResult;
    use instance_scheduler::domain::error::SchedulerError;

    let ids: Vec<String> = (0..8).map(|i| format!("i-{i}")).collect();
    let poison: Vec<String> = vec!["i-2".to_string(), "i-5".to_string(), "i-7".to_string()];

    let op = {
        let poison = poison.clone();
        move |batch: Vec<String>| {
            let poison = poison.clone();
            async move {
                if batch.iter().any(|id| poison.contains(id)) {
                    Err(SchedulerError::BatchPartialFailure { failed_ids: poison.clone() })
                } else {
                    Ok(batch.into_iter().map(PerIdResult::ok).collect())
                }
            }
        }
    };

    let results = bisect_retry(&ids, &op).await;
    assert_eq!(results.len(), 8);
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let failed = results.iter().filter(|r| !r.is_ok()).count();
    assert_eq!(succeeded, 5);
    assert_eq!(failed, 3);
    for r in &results {
        assert_eq!(!r.is_ok(), poison.contains(&r.resource_id));
    }
}

/// S5: schedule `biz` references a non-existent period `lunch`; the
/// orchestrator's prefetch drops it and reports `DefinitionInvalid`-style
/// information, while resources bound to other valid schedules still
/// process normally.
#[tokio::test]
async fn s5_schedule_with_missing_period_is_dropped_others_process_normally() {
    let definition_store = Arc::new(InMemoryDefinitionStore::new());
    let tz: chrono_tz::Tz = "UTC".parse().unwrap();

    // Broken schedule: references a period that is never stored.
    let broken = Schedule::builder("biz", tz).period_ref(PeriodRef::new("lunch")).build().unwrap();
    definition_store.put_schedule(broken, false).await.unwrap();

    // A second, valid, always-running schedule (override) for an unrelated resource.
    let healthy = Schedule::builder("always-on", tz)
        .override_status(instance_scheduler::domain::value_objects::ScheduleState::Running)
        .build()
        .unwrap();
    definition_store.put_schedule(healthy, false).await.unwrap();

    let registry = Arc::new(InMemoryResourceRegistry::new());
    let demo = DemoCloud::new();
    demo.seed_ec2("i-broken-schedule", ACCOUNT, REGION, "t3.micro", true, tags("biz"));
    demo.seed_ec2("i-healthy-schedule", ACCOUNT, REGION, "t3.micro", false, tags("always-on"));
    let identity_broker = Arc::new(demo.broker());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(Utc::now()));
    let cfg = config(&["ec2"]);

    let summary = run_orchestrator_tick::run(
        definition_store as Arc<dyn DefinitionStore>,
        registry as Arc<dyn ResourceRegistry>,
        identity_broker,
        clock,
        cfg,
        1,
    )
    .await;

    assert_eq!(summary.definition_errors.len(), 1);
    assert!(summary.definition_errors[0].contains("biz"));
    // The broken schedule's resource surfaces as an UnknownSchedule error...
    assert!(summary.per_resource_errors.iter().any(|e| e.contains("unknown schedule")));
    // ...while the healthy resource is started normally (override -> running).
    assert_eq!(summary.resources_started, 1);
}

/// S6: resource tagged for hibernation but unsupported by the provider
/// transparently falls back to a plain stop.
#[tokio::test]
async fn s6_hibernation_unsupported_falls_back_to_plain_stop() {
    use instance_scheduler::application::use_cases::process_ec2_resources;
    use instance_scheduler::application::ports::{PerIdResult, VmClient};
    use instance_scheduler::domain::entities::{ObservedState, ResourceDetails, ResourceKind, ResourceRuntimeInfo};
    use instance_scheduler::domain::error::SchedulerError;
    use async_trait::async_trait;

    struct HibernationUnsupportedVmClient {
        resource: ResourceRuntimeInfo,
    }

    #[async_trait]
    impl VmClient for HibernationUnsupportedVmClient {
        async fn describe_tagged(&self, _tag_key: &str) -> Result<Vec<ResourceRuntimeInfo>, SchedulerError> {
            Ok(vec![self.resource.clone()])
        }
        async fn start(&self, ids: &[String]) -> Result<Vec<PerIdResult>, SchedulerError> {
            Ok(ids.iter().map(|id| PerIdResult::ok(id.clone())).collect())
        }
        async fn stop(&self, ids: &[String], hibernate: bool) -> Result<Vec<PerIdResult>, SchedulerError> {
            if hibernate {
                Ok(ids.iter().map(|id| PerIdResult::failed(id.clone(), "hibernation not configured for this instance")).collect())
            } else {
                Ok(ids.iter().map(|id| PerIdResult::ok(id.clone())).collect())
            }
        }
        async fn modify_type(&self, _id: &str, _new_type: &str) -> Result<(), SchedulerError> {
            Ok(())
        }
        async fn create_tags(&self, _id: &str, _tags: &BTreeMap<String, String>) -> Result<(), SchedulerError> {
            Ok(())
        }
        async fn delete_tags(&self, _id: &str, _keys: &[String]) -> Result<(), SchedulerError> {
            Ok(())
        }
    }

    let resource = ResourceRuntimeInfo {
        resource_id: "i-needs-hibernate".to_string(),
        arn: "arn:aws:ec2:demo:instance/i-needs-hibernate".to_string(),
        account: ACCOUNT.to_string(),
        region: REGION.to_string(),
        kind: ResourceKind::Ec2Instance,
        state: ObservedState::Running,
        tags: tags("hibernate-sched"),
        details: ResourceDetails::Ec2 {
            instance_type: "t3.micro".to_string(),
            preferred_instance_types: None,
        },
    };
    let vm_client = HibernationUnsupportedVmClient { resource: resource.clone() };

    let tz: chrono_tz::Tz = "UTC".parse().unwrap();
    // Override to stopped so every tick's desired state is STOPPED, forcing a hibernate attempt.
    let schedule = Schedule::builder("hibernate-sched", tz)
        .override_status(instance_scheduler::domain::value_objects::ScheduleState::Stopped)
        .hibernate(true)
        .build()
        .unwrap();
    let mut schedules = BTreeMap::new();
    schedules.insert("hibernate-sched".to_string(), schedule);
    let periods = BTreeMap::new();

    let registry = InMemoryResourceRegistry::new();
    let now = Utc::now();

    let result = process_ec2_resources(
        &vm_client,
        &registry,
        ACCOUNT,
        REGION,
        "Schedule",
        &schedules,
        &periods,
        now,
        1,
        &BTreeMap::new(),
        &BTreeMap::new(),
    )
    .await
    .unwrap();

    assert!(result.errors.is_empty());
    assert_eq!(result.stopped.len(), 1);
    assert!(result.stopped[0].is_ok());
}
