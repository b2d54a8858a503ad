//! Schedule entity module
//!
//! Named, time-zoned ordered list of periods plus policy flags, ported from
//! the schedule handling in `instance_scheduler.py` / `asg_service.py`. The
//! `to_hash` method mirrors `schedule.to_hash(period_store)` in
//! `asg_service.py`, used as the ASG configuration fingerprint (§4.5).

use chrono_tz::Tz;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::domain::entities::period::Period;
use crate::domain::error::SchedulerError;
use crate::domain::value_objects::ScheduleState;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PeriodRef {
    pub period_name: String,
    pub target_instance_type: Option<String>,
}

impl PeriodRef {
    pub fn new(period_name: impl Into<String>) -> Self {
        Self {
            period_name: period_name.into(),
            target_instance_type: None,
        }
    }

    pub fn with_target_type(period_name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            period_name: period_name.into(),
            target_instance_type: Some(target_type.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Schedule {
    pub name: String,
    pub timezone: Tz,
    pub period_refs: Vec<PeriodRef>,
    pub enforced: bool,
    pub retain_running: bool,
    pub hibernate: bool,
    pub stop_new_instances: bool,
    pub use_maintenance_window: bool,
    pub override_status: Option<ScheduleState>,
    pub ssm_maintenance_window: Option<Vec<String>>,
    pub configured_in_stack: Option<String>,
    pub description: Option<String>,
}

/// Resolves a period name to its definition; implemented by the definition
/// store and by in-memory fakes used in tests.
pub trait PeriodLookup {
    fn get(&self, name: &str) -> Option<&Period>;
}

impl PeriodLookup for std::collections::BTreeMap<String, Period> {
    fn get(&self, name: &str) -> Option<&Period> {
        std::collections::BTreeMap::get(self, name)
    }
}

impl Schedule {
    pub fn builder(name: impl Into<String>, timezone: Tz) -> ScheduleBuilder {
        ScheduleBuilder::new(name.into(), timezone)
    }

    /// Fingerprints this schedule's definition together with every period it
    /// references, so editing a referenced period (not just the schedule
    /// row itself) invalidates a previously-installed ASG configuration.
    pub fn to_hash(&self, periods: &dyn PeriodLookup) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.name.hash(&mut hasher);
        self.timezone.name().hash(&mut hasher);
        self.enforced.hash(&mut hasher);
        self.retain_running.hash(&mut hasher);
        self.hibernate.hash(&mut hasher);
        self.stop_new_instances.hash(&mut hasher);
        self.use_maintenance_window.hash(&mut hasher);
        format!("{:?}", self.override_status).hash(&mut hasher);

        for period_ref in &self.period_refs {
            period_ref.period_name.hash(&mut hasher);
            period_ref.target_instance_type.hash(&mut hasher);
            if let Some(period) = periods.get(&period_ref.period_name) {
                format!("{:?}", period.begin_time).hash(&mut hasher);
                format!("{:?}", period.end_time).hash(&mut hasher);
                format!("{:?}", period.weekdays).hash(&mut hasher);
                format!("{:?}", period.monthdays).hash(&mut hasher);
                format!("{:?}", period.months).hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

pub struct ScheduleBuilder {
    name: String,
    timezone: Tz,
    period_refs: Vec<PeriodRef>,
    enforced: bool,
    retain_running: bool,
    hibernate: bool,
    stop_new_instances: bool,
    use_maintenance_window: bool,
    override_status: Option<ScheduleState>,
    ssm_maintenance_window: Option<Vec<String>>,
    configured_in_stack: Option<String>,
    description: Option<String>,
}

impl ScheduleBuilder {
    fn new(name: String, timezone: Tz) -> Self {
        Self {
            name,
            timezone,
            period_refs: Vec::new(),
            enforced: false,
            retain_running: false,
            hibernate: false,
            stop_new_instances: true,
            use_maintenance_window: false,
            override_status: None,
            ssm_maintenance_window: None,
            configured_in_stack: None,
            description: None,
        }
    }

    pub fn period_ref(mut self, period_ref: PeriodRef) -> Self {
        self.period_refs.push(period_ref);
        self
    }

    pub fn enforced(mut self, v: bool) -> Self {
        self.enforced = v;
        self
    }

    pub fn retain_running(mut self, v: bool) -> Self {
        self.retain_running = v;
        self
    }

    pub fn hibernate(mut self, v: bool) -> Self {
        self.hibernate = v;
        self
    }

    pub fn stop_new_instances(mut self, v: bool) -> Self {
        self.stop_new_instances = v;
        self
    }

    pub fn use_maintenance_window(mut self, v: bool) -> Self {
        self.use_maintenance_window = v;
        self
    }

    pub fn override_status(mut self, s: ScheduleState) -> Self {
        self.override_status = Some(s);
        self
    }

    pub fn ssm_maintenance_window(mut self, windows: Vec<String>) -> Self {
        self.ssm_maintenance_window = Some(windows);
        self
    }

    pub fn configured_in_stack(mut self, stack: impl Into<String>) -> Self {
        self.configured_in_stack = Some(stack.into());
        self
    }

    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.description = Some(d.into());
        self
    }

    pub fn build(self) -> Result<Schedule, SchedulerError> {
        if self.override_status.is_none() && self.period_refs.is_empty() {
            return Err(SchedulerError::InvalidDefinition(format!(
                "schedule '{}' has neither an override_status nor any periods",
                self.name
            )));
        }
        Ok(Schedule {
            name: self.name,
            timezone: self.timezone,
            period_refs: self.period_refs,
            enforced: self.enforced,
            retain_running: self.retain_running,
            hibernate: self.hibernate,
            stop_new_instances: self.stop_new_instances,
            use_maintenance_window: self.use_maintenance_window,
            override_status: self.override_status,
            ssm_maintenance_window: self.ssm_maintenance_window,
            configured_in_stack: self.configured_in_stack,
            description: self.description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakePeriods(HashMap<String, Period>);
    impl PeriodLookup for FakePeriods {
        fn get(&self, name: &str) -> Option<&Period> {
            self.0.get(name)
        }
    }

    #[test]
    fn hash_changes_when_referenced_period_changes() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let schedule = Schedule::builder("biz", tz)
            .period_ref(PeriodRef::new("business-hours"))
            .build()
            .unwrap();

        let narrow = Period::builder("business-hours")
            .begin_time(chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap())
            .end_time(chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap())
            .build()
            .unwrap();
        let wide = Period::builder("business-hours")
            .begin_time(chrono::NaiveTime::from_hms_opt(7, 0, 0).unwrap())
            .end_time(chrono::NaiveTime::from_hms_opt(19, 0, 0).unwrap())
            .build()
            .unwrap();

        let mut narrow_map = HashMap::new();
        narrow_map.insert("business-hours".to_string(), narrow);
        let mut wide_map = HashMap::new();
        wide_map.insert("business-hours".to_string(), wide);

        let h1 = schedule.to_hash(&FakePeriods(narrow_map));
        let h2 = schedule.to_hash(&FakePeriods(wide_map));
        assert_ne!(h1, h2);
    }

    #[test]
    fn rejects_schedule_with_no_periods_and_no_override() {
        let tz: Tz = "UTC".parse().unwrap();
        assert!(Schedule::builder("empty", tz).build().is_err());
    }
}
