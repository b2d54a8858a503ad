//! In-memory definition store implementation
//!
//! A `Mutex`-guarded map, suitable for tests and the demo `tick` path.
//! Production deployments use
//! [`SqliteDefinitionStore`](super::sqlite_definition_store::SqliteDefinitionStore).

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::domain::entities::{Period, Schedule};
use crate::domain::error::SchedulerError;
use crate::domain::repositories::DefinitionStore;

#[derive(Default)]
pub struct InMemoryDefinitionStore {
    periods: Mutex<BTreeMap<String, Period>>,
    schedules: Mutex<BTreeMap<String, Schedule>>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn period_in_use_by(&self, name: &str) -> Option<String> {
        self.schedules
            .lock()
            .unwrap()
            .values()
            .find(|s| s.period_refs.iter().any(|r| r.period_name == name))
            .map(|s| s.name.clone())
    }
}

#[async_trait::async_trait]
impl DefinitionStore for InMemoryDefinitionStore {
    async fn list_periods(&self) -> Result<BTreeMap<String, Period>, SchedulerError> {
        Ok(self.periods.lock().unwrap().clone())
    }

    async fn list_schedules(&self) -> Result<BTreeMap<String, Schedule>, SchedulerError> {
        Ok(self.schedules.lock().unwrap().clone())
    }

    async fn get_period(&self, name: &str) -> Result<Option<Period>, SchedulerError> {
        Ok(self.periods.lock().unwrap().get(name).cloned())
    }

    async fn get_schedule(&self, name: &str) -> Result<Option<Schedule>, SchedulerError> {
        Ok(self.schedules.lock().unwrap().get(name).cloned())
    }

    async fn put_period(&self, period: Period, overwrite: bool) -> Result<(), SchedulerError> {
        let mut periods = self.periods.lock().unwrap();
        if let Some(existing) = periods.get(&period.name) {
            if existing.configured_in_stack.is_some() {
                return Err(SchedulerError::ManagedByStack { name: period.name });
            }
            if !overwrite {
                return Err(SchedulerError::AlreadyExists);
            }
        }
        periods.insert(period.name.clone(), period);
        Ok(())
    }

    async fn put_schedule(&self, schedule: Schedule, overwrite: bool) -> Result<(), SchedulerError> {
        let mut schedules = self.schedules.lock().unwrap();
        if let Some(existing) = schedules.get(&schedule.name) {
            if existing.configured_in_stack.is_some() {
                return Err(SchedulerError::ManagedByStack { name: schedule.name });
            }
            if !overwrite {
                return Err(SchedulerError::AlreadyExists);
            }
        }
        schedules.insert(schedule.name.clone(), schedule);
        Ok(())
    }

    async fn delete_period(&self, name: &str) -> Result<(), SchedulerError> {
        if let Some(user) = self.period_in_use_by(name) {
            return Err(SchedulerError::InUse {
                name: format!("{name} (referenced by schedule '{user}')"),
            });
        }
        let mut periods = self.periods.lock().unwrap();
        if let Some(existing) = periods.get(name) {
            if existing.configured_in_stack.is_some() {
                return Err(SchedulerError::ManagedByStack { name: name.to_string() });
            }
        }
        periods.remove(name);
        Ok(())
    }

    async fn delete_schedule(&self, name: &str) -> Result<(), SchedulerError> {
        let mut schedules = self.schedules.lock().unwrap();
        if let Some(existing) = schedules.get(name) {
            if existing.configured_in_stack.is_some() {
                return Err(SchedulerError::ManagedByStack { name: name.to_string() });
            }
        }
        schedules.remove(name);
        Ok(())
    }
}
