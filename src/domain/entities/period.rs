//! Period entity module
//!
//! A recurring time window, optionally constrained by weekday/monthday/month
//! sets, as ported from the activation table in `instance_schedule.py`'s
//! period handling (§4.2). Weekdays follow `0..6, Mon=0`; monthdays `1..31`;
//! months `1..12`.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use std::collections::BTreeSet;

use crate::domain::error::SchedulerError;
use crate::domain::value_objects::ScheduleState;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Period {
    pub name: String,
    pub begin_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub weekdays: Option<BTreeSet<u32>>,
    pub monthdays: Option<BTreeSet<u32>>,
    pub months: Option<BTreeSet<u32>>,
    pub description: Option<String>,
    pub configured_in_stack: Option<String>,
}

impl Period {
    pub fn builder(name: impl Into<String>) -> PeriodBuilder {
        PeriodBuilder::new(name.into())
    }

    /// Whether `begin ≤ t.time < end + 1 minute`, `begin ≤ t.time`,
    /// `t.time < end + 1 minute`, or unconditional, per which of
    /// `begin_time`/`end_time` are present.
    fn time_window_active(&self, t: NaiveTime) -> bool {
        match (self.begin_time, self.end_time) {
            (Some(begin), Some(end)) => {
                let end_exclusive = end + chrono::Duration::minutes(1);
                if end_exclusive > end {
                    t >= begin && t < end_exclusive
                } else {
                    // end_time is 23:59, so end + 1 minute wraps past midnight;
                    // treat the window as open through the end of the day.
                    t >= begin
                }
            }
            (Some(begin), None) => t >= begin,
            (None, Some(end)) => {
                let end_exclusive = end + chrono::Duration::minutes(1);
                if end_exclusive > end {
                    t < end_exclusive
                } else {
                    true
                }
            }
            (None, None) => true,
        }
    }

    /// Active iff weekday/monthday/month sets (when present) contain `t`'s
    /// calendar fields and `t`'s minute-of-day falls in the time window.
    pub fn is_active_at(&self, t: NaiveDateTime) -> bool {
        let weekday_ok = self
            .weekdays
            .as_ref()
            .map(|set| set.contains(&t.weekday().num_days_from_monday()))
            .unwrap_or(true);
        let monthday_ok = self
            .monthdays
            .as_ref()
            .map(|set| set.contains(&t.day()))
            .unwrap_or(true);
        let month_ok = self
            .months
            .as_ref()
            .map(|set| set.contains(&t.month()))
            .unwrap_or(true);

        weekday_ok && monthday_ok && month_ok && self.time_window_active(t.time())
    }

    pub fn desired_state_at(&self, t: NaiveDateTime) -> ScheduleState {
        if self.is_active_at(t) {
            ScheduleState::Running
        } else {
            ScheduleState::Stopped
        }
    }
}

pub struct PeriodBuilder {
    name: String,
    begin_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    weekdays: Option<BTreeSet<u32>>,
    monthdays: Option<BTreeSet<u32>>,
    months: Option<BTreeSet<u32>>,
    description: Option<String>,
    configured_in_stack: Option<String>,
}

impl PeriodBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            begin_time: None,
            end_time: None,
            weekdays: None,
            monthdays: None,
            months: None,
            description: None,
            configured_in_stack: None,
        }
    }

    pub fn begin_time(mut self, t: NaiveTime) -> Self {
        self.begin_time = Some(t);
        self
    }

    pub fn end_time(mut self, t: NaiveTime) -> Self {
        self.end_time = Some(t);
        self
    }

    pub fn weekdays(mut self, set: BTreeSet<u32>) -> Self {
        self.weekdays = Some(set);
        self
    }

    pub fn monthdays(mut self, set: BTreeSet<u32>) -> Self {
        self.monthdays = Some(set);
        self
    }

    pub fn months(mut self, set: BTreeSet<u32>) -> Self {
        self.months = Some(set);
        self
    }

    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.description = Some(d.into());
        self
    }

    pub fn configured_in_stack(mut self, stack: impl Into<String>) -> Self {
        self.configured_in_stack = Some(stack.into());
        self
    }

    pub fn build(self) -> Result<Period, SchedulerError> {
        if self.begin_time.is_none()
            && self.end_time.is_none()
            && self.weekdays.is_none()
            && self.monthdays.is_none()
            && self.months.is_none()
        {
            return Err(SchedulerError::InvalidDefinition(format!(
                "period '{}' has no time fields and no calendar fields",
                self.name
            )));
        }
        if let (Some(b), Some(e)) = (self.begin_time, self.end_time) {
            if b > e {
                return Err(SchedulerError::InvalidDefinition(format!(
                    "period '{}': begin_time {} is after end_time {}",
                    self.name, b, e
                )));
            }
        }
        Ok(Period {
            name: self.name,
            begin_time: self.begin_time,
            end_time: self.end_time,
            weekdays: self.weekdays,
            monthdays: self.monthdays,
            months: self.months,
            description: self.description,
            configured_in_stack: self.configured_in_stack,
        })
    }
}
