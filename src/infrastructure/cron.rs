//! Cron translation for ASG scheduled actions (C8, §4.5)
//!
//! Translates a period's calendar fields and begin/end time into the
//! provider-native cron string used by `batch_put_scheduled_update_group_action`,
//! ported from `CronExpressionBuilder`/`to_hour_and_minute` in
//! `scheduling/asg/asg_service.py`. Weekday sets are Monday-based (`0..6`)
//! internally per the data model; the provider's day-of-week field is
//! Sunday-based (`0..6`), so weekday values are shifted by one and wrapped
//! before formatting.

use chrono::Timelike;
use std::collections::BTreeSet;

use crate::application::ports::ScheduledAction;
use crate::domain::entities::Period;
use crate::domain::value_objects::AsgSize;

fn field(set: &Option<BTreeSet<u32>>) -> String {
    match set {
        None => "*".to_string(),
        Some(values) if values.is_empty() => "*".to_string(),
        Some(values) => values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(","),
    }
}

fn weekday_field(weekdays: &Option<BTreeSet<u32>>) -> String {
    match weekdays {
        None => "*".to_string(),
        Some(values) if values.is_empty() => "*".to_string(),
        Some(values) => values
            .iter()
            .map(|monday_based| ((monday_based + 1) % 7).to_string())
            .collect::<Vec<_>>()
            .join(","),
    }
}

fn cron_at(period: &Period, hour: u32, minute: u32) -> String {
    format!(
        "{} {} {} {} {}",
        minute,
        hour,
        field(&period.monthdays),
        field(&period.months),
        weekday_field(&period.weekdays)
    )
}

/// One-sided schedules (only `begin` or only `end`) generate only the
/// corresponding action, per §4.5's cron translation rules.
pub fn schedule_to_actions(
    action_name_prefix: &str,
    period: &Period,
    running_size: AsgSize,
) -> Vec<ScheduledAction> {
    let mut actions = Vec::new();
    if let Some(begin) = period.begin_time {
        actions.push(ScheduledAction {
            name: format!("{}{}Start", action_name_prefix, period.name),
            recurrence_cron: cron_at(period, begin.hour(), begin.minute()),
            min_size: Some(running_size.min_size),
            desired_size: Some(running_size.desired_size),
            max_size: Some(running_size.max_size),
        });
    }
    if let Some(end) = period.end_time {
        actions.push(ScheduledAction {
            name: format!("{}{}Stop", action_name_prefix, period.name),
            recurrence_cron: cron_at(period, end.hour(), end.minute()),
            min_size: Some(0),
            desired_size: Some(0),
            max_size: Some(0),
        });
    }
    actions
}
