//! Desired-state evaluator (C4)
//!
//! Implements the six-step procedure from `get_desired_state_and_type` in
//! `instance_scheduler.py` verbatim (§4.3): override short-circuit, instant
//! conversion into the schedule's zone, period candidate collection with
//! insertion-order tie-break, and a maintenance-window override evaluated
//! against current UTC (not the schedule's local zone).

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::entities::{DesiredStateTriple, Period, Schedule};
use crate::domain::value_objects::ScheduleState;

/// Evaluates `schedule` against `periods` (by name) at instant `t` (UTC).
/// `maintenance_schedule`, when present, is evaluated against current UTC
/// and can force the result to RUNNING even if period evaluation said
/// STOPPED (step 6).
pub fn evaluate(
    schedule: &Schedule,
    periods: &BTreeMap<String, Period>,
    t: DateTime<Utc>,
    maintenance_schedule: Option<&Schedule>,
) -> DesiredStateTriple {
    if let Some(status) = schedule.override_status {
        return DesiredStateTriple::override_to(status);
    }

    let t_z = t.with_timezone(&schedule.timezone).naive_local();

    let mut candidate: Option<DesiredStateTriple> = None;
    for period_ref in &schedule.period_refs {
        if let Some(period) = periods.get(&period_ref.period_name) {
            if period.is_active_at(t_z) {
                candidate = Some(DesiredStateTriple::new(
                    ScheduleState::Running,
                    period_ref.target_instance_type.clone(),
                    Some(period.name.clone()),
                ));
                break;
            }
        }
    }

    let mut result = candidate.unwrap_or_else(DesiredStateTriple::stopped);

    if schedule.use_maintenance_window {
        if let Some(maintenance) = maintenance_schedule {
            let maintenance_desired = evaluate(maintenance, periods, t, None);
            if maintenance_desired.state == ScheduleState::Running {
                result = DesiredStateTriple::new(ScheduleState::Running, result.target_type, result.active_period_name);
            }
        }
    }

    result
}
