//! SQLite-backed definition store (C5, §4.7)
//!
//! Schedule/period library keyed by `(kind, name)`, stored as one
//! JSON-serialized row per definition, opening the connection with WAL
//! mode and bulk-insert pragmas. Periods and schedules carry enough
//! optional/nested structure (set expressions, period-ref lists) that a
//! JSON blob column is the natural on-disk shape here; `put`/`get`
//! serialize and deserialize at the boundary and the rest of the engine
//! only ever sees the typed `Period`/`Schedule` structs.
//!
//! Definition-store reads happen once per tick, outside the per-target
//! worker tasks (§4.6 step 1), so the brief lock held by each query here
//! never contends with the orchestrator's fan-out.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::entities::{Period, Schedule};
use crate::domain::error::SchedulerError;
use crate::domain::repositories::DefinitionStore;

const KIND_PERIOD: &str = "period";
const KIND_SCHEDULE: &str = "schedule";

pub struct SqliteDefinitionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDefinitionStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, SchedulerError> {
        let conn = Connection::open(db_path).map_err(|e| SchedulerError::Store(e.into()))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS definitions (
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                data TEXT NOT NULL,
                configured_in_stack TEXT,
                PRIMARY KEY (kind, name)
            );
            "#,
        )
        .map_err(|e| SchedulerError::Store(e.into()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, SchedulerError> {
        Self::open(":memory:")
    }

    fn configured_in_stack_of(conn: &Connection, kind: &str, name: &str) -> Result<Option<String>, SchedulerError> {
        conn.query_row(
            "SELECT configured_in_stack FROM definitions WHERE kind = ?1 AND name = ?2",
            params![kind, name],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| SchedulerError::Store(e.into()))
    }

    fn row_exists(conn: &Connection, kind: &str, name: &str) -> Result<bool, SchedulerError> {
        conn.query_row(
            "SELECT 1 FROM definitions WHERE kind = ?1 AND name = ?2",
            params![kind, name],
            |_| Ok(()),
        )
        .optional()
        .map(|r| r.is_some())
        .map_err(|e| SchedulerError::Store(e.into()))
    }

    fn put_row(&self, kind: &'static str, name: String, data: String, configured_in_stack: Option<String>, overwrite: bool) -> Result<(), SchedulerError> {
        let conn = self.conn.lock().unwrap();
        if let Some(existing_stack) = Self::configured_in_stack_of(&conn, kind, &name)? {
            return Err(SchedulerError::ManagedByStack { name: format!("{name} (stack '{existing_stack}')") });
        }
        if !overwrite && Self::row_exists(&conn, kind, &name)? {
            return Err(SchedulerError::AlreadyExists);
        }
        conn.execute(
            "INSERT OR REPLACE INTO definitions (kind, name, data, configured_in_stack) VALUES (?1, ?2, ?3, ?4)",
            params![kind, name, data, configured_in_stack],
        )
        .map_err(|e| SchedulerError::Store(e.into()))?;
        Ok(())
    }

    fn list_rows<T: serde::de::DeserializeOwned>(&self, kind: &'static str) -> Result<BTreeMap<String, T>, SchedulerError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT name, data FROM definitions WHERE kind = ?1")
            .map_err(|e| SchedulerError::Store(e.into()))?;
        let rows = stmt
            .query_map(params![kind], |row| {
                let name: String = row.get(0)?;
                let data: String = row.get(1)?;
                Ok((name, data))
            })
            .map_err(|e| SchedulerError::Store(e.into()))?;

        let mut result = BTreeMap::new();
        for row in rows {
            let (name, data) = row.map_err(|e| SchedulerError::Store(e.into()))?;
            let value: T = serde_json::from_str(&data).map_err(|e| SchedulerError::Store(e.into()))?;
            result.insert(name, value);
        }
        Ok(result)
    }

    fn get_row<T: serde::de::DeserializeOwned>(&self, kind: &'static str, name: &str) -> Result<Option<T>, SchedulerError> {
        let conn = self.conn.lock().unwrap();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM definitions WHERE kind = ?1 AND name = ?2",
                params![kind, name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| SchedulerError::Store(e.into()))?;
        data.map(|d| serde_json::from_str(&d).map_err(|e| SchedulerError::Store(e.into()))).transpose()
    }

    fn delete_row(&self, kind: &'static str, name: &str) -> Result<(), SchedulerError> {
        let conn = self.conn.lock().unwrap();
        if let Some(existing_stack) = Self::configured_in_stack_of(&conn, kind, name)? {
            return Err(SchedulerError::ManagedByStack { name: format!("{name} (stack '{existing_stack}')") });
        }
        conn.execute("DELETE FROM definitions WHERE kind = ?1 AND name = ?2", params![kind, name])
            .map_err(|e| SchedulerError::Store(e.into()))?;
        Ok(())
    }

    fn period_in_use_by(&self, period_name: &str) -> Result<Option<String>, SchedulerError> {
        let schedules: BTreeMap<String, Schedule> = self.list_rows(KIND_SCHEDULE)?;
        Ok(schedules
            .into_values()
            .find(|s| s.period_refs.iter().any(|r| r.period_name == period_name))
            .map(|s| s.name))
    }
}

#[async_trait::async_trait]
impl DefinitionStore for SqliteDefinitionStore {
    async fn list_periods(&self) -> Result<BTreeMap<String, Period>, SchedulerError> {
        self.list_rows(KIND_PERIOD)
    }

    async fn list_schedules(&self) -> Result<BTreeMap<String, Schedule>, SchedulerError> {
        self.list_rows(KIND_SCHEDULE)
    }

    async fn get_period(&self, name: &str) -> Result<Option<Period>, SchedulerError> {
        self.get_row(KIND_PERIOD, name)
    }

    async fn get_schedule(&self, name: &str) -> Result<Option<Schedule>, SchedulerError> {
        self.get_row(KIND_SCHEDULE, name)
    }

    async fn put_period(&self, period: Period, overwrite: bool) -> Result<(), SchedulerError> {
        let name = period.name.clone();
        let configured_in_stack = period.configured_in_stack.clone();
        let data = serde_json::to_string(&period).map_err(|e| SchedulerError::Store(e.into()))?;
        self.put_row(KIND_PERIOD, name, data, configured_in_stack, overwrite)
    }

    async fn put_schedule(&self, schedule: Schedule, overwrite: bool) -> Result<(), SchedulerError> {
        let name = schedule.name.clone();
        let configured_in_stack = schedule.configured_in_stack.clone();
        let data = serde_json::to_string(&schedule).map_err(|e| SchedulerError::Store(e.into()))?;
        self.put_row(KIND_SCHEDULE, name, data, configured_in_stack, overwrite)
    }

    async fn delete_period(&self, name: &str) -> Result<(), SchedulerError> {
        if let Some(user) = self.period_in_use_by(name)? {
            return Err(SchedulerError::InUse {
                name: format!("{name} (referenced by schedule '{user}')"),
            });
        }
        self.delete_row(KIND_PERIOD, name)
    }

    async fn delete_schedule(&self, name: &str) -> Result<(), SchedulerError> {
        self.delete_row(KIND_SCHEDULE, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PeriodRef;

    fn period(name: &str) -> Period {
        Period::builder(name)
            .begin_time(chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap())
            .end_time(chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap())
            .build()
            .unwrap()
    }

    fn schedule(name: &str, period_name: &str) -> Schedule {
        let tz: chrono_tz::Tz = "UTC".parse().unwrap();
        Schedule::builder(name, tz)
            .period_ref(PeriodRef::new(period_name))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn round_trips_period_and_schedule() {
        let store = SqliteDefinitionStore::in_memory().unwrap();
        store.put_period(period("biz"), false).await.unwrap();
        store.put_schedule(schedule("s", "biz"), false).await.unwrap();

        let periods = store.list_periods().await.unwrap();
        assert!(periods.contains_key("biz"));
        let schedules = store.list_schedules().await.unwrap();
        assert_eq!(schedules.get("s").unwrap().timezone.name(), "UTC");
    }

    #[tokio::test]
    async fn put_without_overwrite_rejects_duplicate() {
        let store = SqliteDefinitionStore::in_memory().unwrap();
        store.put_period(period("biz"), false).await.unwrap();
        let err = store.put_period(period("biz"), false).await.unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyExists));
    }

    #[tokio::test]
    async fn delete_period_in_use_is_rejected() {
        let store = SqliteDefinitionStore::in_memory().unwrap();
        store.put_period(period("biz"), false).await.unwrap();
        store.put_schedule(schedule("s", "biz"), false).await.unwrap();
        let err = store.delete_period("biz").await.unwrap_err();
        assert!(matches!(err, SchedulerError::InUse { .. }));
    }

    #[tokio::test]
    async fn stack_managed_period_rejects_overwrite() {
        let store = SqliteDefinitionStore::in_memory().unwrap();
        let mut p = period("biz");
        p.configured_in_stack = Some("my-stack".to_string());
        store.put_period(p, false).await.unwrap();
        let err = store.put_period(period("biz"), true).await.unwrap_err();
        assert!(matches!(err, SchedulerError::ManagedByStack { .. }));
    }
}
