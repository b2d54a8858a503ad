//! Usage/accounting (C11, §4.8)
//!
//! For a schedule and an inclusive local date range, walks the sorted set
//! of per-day "event instants" (00:00, every period begin/end landing on
//! that day, 23:59), evaluates the schedule at each, and emits a running
//! interval on every RUNNING -> STOPPED transition, closing an
//! still-running day at 23:59 + 1 minute. Ported from
//! `ScheduleUsage`/`get_schedule_usage` in the source's
//! `handler/cli/schedule_usage.py`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::application::services::desired_state_evaluator;
use crate::domain::entities::{Period, Schedule};
use crate::domain::value_objects::ScheduleState;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RunningInterval {
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
    pub billing_seconds: i64,
    pub billing_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DayUsage {
    pub date: NaiveDate,
    pub billing_seconds: i64,
    pub billing_hours: i64,
    pub intervals: Vec<RunningInterval>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UsageReport {
    pub schedule_name: String,
    pub days: Vec<DayUsage>,
}

fn billing_seconds(begin: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - begin).num_seconds().max(60)
}

fn billing_hours(seconds: i64) -> i64 {
    (seconds + 3599) / 3600
}

/// Event instants for a single day: midnight, every period begin/end that
/// lands on this day, and 23:59.
fn event_instants(day: NaiveDate, periods: &BTreeMap<String, Period>, schedule: &Schedule) -> BTreeSet<NaiveTime> {
    let mut instants = BTreeSet::new();
    instants.insert(NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    instants.insert(NaiveTime::from_hms_opt(23, 59, 0).unwrap());

    for period_ref in &schedule.period_refs {
        if let Some(period) = periods.get(&period_ref.period_name) {
            let dt = day.and_hms_opt(0, 0, 0).unwrap();
            let calendar_matches = period
                .weekdays
                .as_ref()
                .map(|s| s.contains(&{ use chrono::Datelike; dt.weekday().num_days_from_monday() }))
                .unwrap_or(true)
                && period
                    .monthdays
                    .as_ref()
                    .map(|s| { use chrono::Datelike; s.contains(&dt.day()) })
                    .unwrap_or(true)
                && period
                    .months
                    .as_ref()
                    .map(|s| { use chrono::Datelike; s.contains(&dt.month()) })
                    .unwrap_or(true);
            if calendar_matches {
                if let Some(begin) = period.begin_time {
                    instants.insert(begin);
                }
                if let Some(end) = period.end_time {
                    instants.insert(end);
                }
            }
        }
    }
    instants
}

/// Computes per-day running intervals and billing totals for `schedule`
/// over the inclusive local date range `[d0, d1]`.
pub fn compute(
    schedule: &Schedule,
    periods: &BTreeMap<String, Period>,
    d0: NaiveDate,
    d1: NaiveDate,
) -> UsageReport {
    let mut days = Vec::new();
    let mut day = d0;
    while day <= d1 {
        let instants = event_instants(day, periods, schedule);
        let mut intervals = Vec::new();
        let mut running_since: Option<NaiveDateTime> = None;

        for time in &instants {
            let local_dt = day.and_time(*time);
            // `local_dt` is a wall-clock instant in the schedule's own zone;
            // convert it to UTC through that zone rather than treating the
            // digits as UTC directly, or the evaluator would re-localize
            // them a second time and shift non-UTC schedules.
            let utc = match schedule.timezone.from_local_datetime(&local_dt) {
                LocalResult::Single(dt) => dt.with_timezone(&chrono::Utc),
                LocalResult::Ambiguous(dt, _) => dt.with_timezone(&chrono::Utc),
                LocalResult::None => continue,
            };
            let desired = desired_state_evaluator::evaluate(schedule, periods, utc, None);

            match (running_since, desired.state) {
                (None, ScheduleState::Running) => running_since = Some(local_dt),
                (Some(begin), ScheduleState::Stopped) => {
                    let seconds = billing_seconds(begin, local_dt);
                    intervals.push(RunningInterval {
                        begin,
                        end: local_dt,
                        billing_seconds: seconds,
                        billing_hours: billing_hours(seconds),
                    });
                    running_since = None;
                }
                _ => {}
            }
        }

        if let Some(begin) = running_since {
            let end = day.and_hms_opt(23, 59, 0).unwrap() + Duration::minutes(1);
            let seconds = billing_seconds(begin, end);
            intervals.push(RunningInterval {
                begin,
                end,
                billing_seconds: seconds,
                billing_hours: billing_hours(seconds),
            });
        }

        let total_seconds: i64 = intervals.iter().map(|i| i.billing_seconds).sum();
        days.push(DayUsage {
            date: day,
            billing_seconds: total_seconds,
            billing_hours: billing_hours(total_seconds),
            intervals,
        });

        day = day.succ_opt().expect("date range within chrono's representable span");
    }

    UsageReport {
        schedule_name: schedule.name.clone(),
        days,
    }
}
