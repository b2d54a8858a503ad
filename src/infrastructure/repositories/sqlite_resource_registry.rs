//! SQLite-backed resource registry (C6, §3)
//!
//! Keyed by `(account, region, service, resource_id)`, one JSON-blob row
//! per record. `scan_target` drives the per-target prefix scan the default
//! `prune_stale` sweep in [`ResourceRegistry`] relies on.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::entities::RegistryRecord;
use crate::domain::error::SchedulerError;
use crate::domain::repositories::ResourceRegistry;

pub struct SqliteResourceRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteResourceRegistry {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, SchedulerError> {
        let conn = Connection::open(db_path).map_err(|e| SchedulerError::Store(e.into()))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            CREATE TABLE IF NOT EXISTS registry (
                account TEXT NOT NULL,
                region TEXT NOT NULL,
                service TEXT NOT NULL,
                resource_id TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (account, region, service, resource_id)
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
}

#[async_trait::async_trait]
impl ResourceRegistry for SqliteResourceRegistry {
    async fn get(
        &self,
        account: &str,
        region: &str,
        service: &str,
        resource_id: &str,
    ) -> Result<Option<RegistryRecord>, SchedulerError> {
        let conn = self.conn.lock().unwrap();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM registry WHERE account = ?1 AND region = ?2 AND service = ?3 AND resource_id = ?4",
                params![account, region, service, resource_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| SchedulerError::Store(e.into()))?;
        data.map(|d| serde_json::from_str(&d).map_err(|e| SchedulerError::Store(e.into()))).transpose()
    }

    async fn scan_target(&self, account: &str, region: &str, service: &str) -> Result<Vec<RegistryRecord>, SchedulerError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT data FROM registry WHERE account = ?1 AND region = ?2 AND service = ?3")
            .map_err(|e| SchedulerError::Store(e.into()))?;
        let rows = stmt
            .query_map(params![account, region, service], |row| row.get::<_, String>(0))
            .map_err(|e| SchedulerError::Store(e.into()))?;

        let mut result = Vec::new();
        for row in rows {
            let data = row.map_err(|e| SchedulerError::Store(e.into()))?;
            result.push(serde_json::from_str(&data).map_err(|e| SchedulerError::Store(e.into()))?);
        }
        Ok(result)
    }

    async fn put(&self, record: RegistryRecord) -> Result<(), SchedulerError> {
        let conn = self.conn.lock().unwrap();
        let data = serde_json::to_string(&record).map_err(|e| SchedulerError::Store(e.into()))?;
        conn.execute(
            "INSERT OR REPLACE INTO registry (account, region, service, resource_id, data) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![record.account, record.region, record.service, record.resource_id, data],
        )
        .map_err(|e| SchedulerError::Store(e.into()))?;
        Ok(())
    }

    async fn delete(&self, account: &str, region: &str, service: &str, resource_id: &str) -> Result<(), SchedulerError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM registry WHERE account = ?1 AND region = ?2 AND service = ?3 AND resource_id = ?4",
            params![account, region, service, resource_id],
        )
        .map_err(|e| SchedulerError::Store(e.into()))?;
        Ok(())
    }
}
