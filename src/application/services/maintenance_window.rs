//! Maintenance-window context (C10)
//!
//! Converts an RDS-style preferred maintenance window string
//! (`ddd:HH:MM-ddd:HH:MM`) into a synthetic UTC schedule, ported from the
//! `RdsMaintenanceWindow`/`to_schedule` handling referenced by §4.3. The
//! begin time is shifted 10 minutes earlier to allow for startup, crossing
//! a day boundary (and wrapping to the previous weekday) if the shift would
//! go negative. One period is produced when start-day == end-day; otherwise
//! two periods spanning midnight.

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;

use crate::domain::entities::{Period, PeriodRef, Schedule};
use crate::domain::error::SchedulerError;

const WEEKDAY_NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceWindow {
    pub start_day: u32,
    pub start_time: NaiveTime,
    pub end_day: u32,
    pub end_time: NaiveTime,
}

fn weekday_index(s: &str) -> Option<u32> {
    WEEKDAY_NAMES.iter().position(|d| *d == s.to_lowercase()).map(|i| i as u32)
}

impl MaintenanceWindow {
    /// Parses `ddd:HH:MM-ddd:HH:MM`, e.g. `tue:22:00-tue:23:00`.
    pub fn parse(s: &str) -> Result<Self, SchedulerError> {
        let (start_str, end_str) = s
            .split_once('-')
            .ok_or_else(|| SchedulerError::InvalidDefinition(format!("malformed maintenance window '{}'", s)))?;
        let (start_day, start_time) = Self::parse_half(start_str)?;
        let (end_day, end_time) = Self::parse_half(end_str)?;
        Ok(Self {
            start_day,
            start_time,
            end_day,
            end_time,
        })
    }

    fn parse_half(half: &str) -> Result<(u32, NaiveTime), SchedulerError> {
        let mut parts = half.splitn(2, ':');
        let day_str = parts
            .next()
            .ok_or_else(|| SchedulerError::InvalidDefinition(format!("malformed maintenance window half '{}'", half)))?;
        let time_str = parts
            .next()
            .ok_or_else(|| SchedulerError::InvalidDefinition(format!("malformed maintenance window half '{}'", half)))?;
        let day = weekday_index(day_str)
            .ok_or_else(|| SchedulerError::InvalidDefinition(format!("unknown weekday '{}'", day_str)))?;
        let time = NaiveTime::parse_from_str(time_str, "%H:%M")
            .map_err(|_| SchedulerError::InvalidDefinition(format!("malformed time '{}'", time_str)))?;
        Ok((day, time))
    }

    /// Shifts `start_time` 10 minutes earlier, wrapping to the previous
    /// weekday if the shift would go negative.
    fn lead_shifted_start(&self) -> (u32, NaiveTime) {
        let lead = Duration::minutes(10);
        if self.start_time >= NaiveTime::from_hms_opt(0, 10, 0).unwrap() {
            (self.start_day, self.start_time - lead)
        } else {
            let prev_day = (self.start_day + 6) % 7;
            (prev_day, self.start_time + Duration::minutes(24 * 60 - 10))
        }
    }

    /// Builds a synthetic UTC schedule that is RUNNING ten minutes before
    /// the window opens through the window's end.
    pub fn to_schedule(&self, name: impl Into<String>) -> (Schedule, Vec<Period>) {
        let name = name.into();
        let (shifted_day, shifted_time) = self.lead_shifted_start();
        let utc: Tz = chrono_tz::UTC;

        let mut periods = Vec::new();
        let mut period_refs = Vec::new();

        // The window's own end is exclusive (unlike a period's end_time,
        // which is inclusive of end+1 minute); back it off by a minute so
        // the synthesized period goes inactive exactly at `end_time`.
        let exclusive_end = self.end_time - Duration::minutes(1);

        if shifted_day == self.end_day {
            let period = Period::builder(format!("{}-window", name))
                .begin_time(shifted_time)
                .end_time(exclusive_end)
                .weekdays([shifted_day].into_iter().collect())
                .build()
                .expect("maintenance window period always has time fields");
            period_refs.push(PeriodRef::new(period.name.clone()));
            periods.push(period);
        } else {
            let before_midnight = Period::builder(format!("{}-window-1", name))
                .begin_time(shifted_time)
                .end_time(NaiveTime::from_hms_opt(23, 59, 0).unwrap())
                .weekdays([shifted_day].into_iter().collect())
                .build()
                .expect("maintenance window period always has time fields");
            let after_midnight = Period::builder(format!("{}-window-2", name))
                .begin_time(NaiveTime::from_hms_opt(0, 0, 0).unwrap())
                .end_time(exclusive_end)
                .weekdays([self.end_day].into_iter().collect())
                .build()
                .expect("maintenance window period always has time fields");
            period_refs.push(PeriodRef::new(before_midnight.name.clone()));
            period_refs.push(PeriodRef::new(after_midnight.name.clone()));
            periods.push(before_midnight);
            periods.push(after_midnight);
        }

        let mut builder = Schedule::builder(name, utc);
        for period_ref in period_refs {
            builder = builder.period_ref(period_ref);
        }
        (builder.build().expect("maintenance window schedule always has periods"), periods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::desired_state_evaluator::evaluate;
    use chrono::TimeZone;
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[test]
    fn ten_minute_lead_scenario_s2() {
        let window = MaintenanceWindow::parse("tue:22:00-tue:23:00").unwrap();
        let (schedule, periods) = window.to_schedule("rds-window");
        let mut period_map = BTreeMap::new();
        for p in periods {
            period_map.insert(p.name.clone(), p);
        }

        let ten_min_before = Utc.with_ymd_and_hms(2024, 11, 5, 21, 50, 0).unwrap();
        assert_eq!(
            evaluate(&schedule, &period_map, ten_min_before, None).state,
            crate::domain::value_objects::ScheduleState::Running
        );

        let still_open = Utc.with_ymd_and_hms(2024, 11, 5, 22, 59, 0).unwrap();
        assert_eq!(
            evaluate(&schedule, &period_map, still_open, None).state,
            crate::domain::value_objects::ScheduleState::Running
        );

        let closed = Utc.with_ymd_and_hms(2024, 11, 5, 23, 0, 0).unwrap();
        assert_eq!(
            evaluate(&schedule, &period_map, closed, None).state,
            crate::domain::value_objects::ScheduleState::Stopped
        );
    }

    #[test]
    fn wraps_to_previous_weekday_when_shift_goes_negative() {
        let window = MaintenanceWindow::parse("wed:00:05-wed:01:00").unwrap();
        let (shifted_day, shifted_time) = window.lead_shifted_start();
        assert_eq!(shifted_day, 1); // tue
        assert_eq!(shifted_time, NaiveTime::from_hms_opt(23, 55, 0).unwrap());
    }
}
