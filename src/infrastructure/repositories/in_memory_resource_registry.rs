//! In-memory resource registry implementation
//!
//! Same rationale as [`InMemoryDefinitionStore`](super::in_memory_definition_store::InMemoryDefinitionStore):
//! tests and the demo `tick` path use this instead of standing up SQLite.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::domain::entities::RegistryRecord;
use crate::domain::error::SchedulerError;
use crate::domain::repositories::ResourceRegistry;

type Key = (String, String, String, String);

#[derive(Default)]
pub struct InMemoryResourceRegistry {
    records: Mutex<BTreeMap<Key, RegistryRecord>>,
}

impl InMemoryResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ResourceRegistry for InMemoryResourceRegistry {
    async fn get(
        &self,
        account: &str,
        region: &str,
        service: &str,
        resource_id: &str,
    ) -> Result<Option<RegistryRecord>, SchedulerError> {
        let key = (account.to_string(), region.to_string(), service.to_string(), resource_id.to_string());
        Ok(self.records.lock().unwrap().get(&key).cloned())
    }

    async fn scan_target(&self, account: &str, region: &str, service: &str) -> Result<Vec<RegistryRecord>, SchedulerError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.account == account && r.region == region && r.service == service)
            .cloned()
            .collect())
    }

    async fn put(&self, record: RegistryRecord) -> Result<(), SchedulerError> {
        self.records.lock().unwrap().insert(record.key(), record);
        Ok(())
    }

    async fn delete(&self, account: &str, region: &str, service: &str, resource_id: &str) -> Result<(), SchedulerError> {
        let key = (account.to_string(), region.to_string(), service.to_string(), resource_id.to_string());
        self.records.lock().unwrap().remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_target_filters_by_partition() {
        let registry = InMemoryResourceRegistry::new();
        registry
            .put(RegistryRecord::first_sight("111", "us-east-1", "ec2", "i-1", "arn:1", "biz", 0))
            .await
            .unwrap();
        registry
            .put(RegistryRecord::first_sight("111", "us-west-2", "ec2", "i-2", "arn:2", "biz", 0))
            .await
            .unwrap();

        let scanned = registry.scan_target("111", "us-east-1", "ec2").await.unwrap();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].resource_id, "i-1");
    }

    #[tokio::test]
    async fn prune_stale_removes_records_absent_two_ticks() {
        let registry = InMemoryResourceRegistry::new();
        registry
            .put(RegistryRecord::first_sight("111", "us-east-1", "ec2", "i-1", "arn:1", "biz", 3))
            .await
            .unwrap();

        let pruned = registry.prune_stale("111", "us-east-1", "ec2", 5).await.unwrap();
        assert_eq!(pruned, vec!["i-1".to_string()]);
        assert!(registry.get("111", "us-east-1", "ec2", "i-1").await.unwrap().is_none());
    }
}
