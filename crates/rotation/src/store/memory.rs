//! In-memory secret store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use super::{SecretStore, latest_of};
use crate::error::StoreError;
use crate::secret::{SecretValue, StoredSecret};

/// Secret store backed by a concurrent map
///
/// Clones share the same records. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    records: Arc<DashMap<String, StoredSecret>>,
}

impl MemorySecretStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record
    pub fn clear(&self) {
        self.records.clear();
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn setup(&mut self, _params: &HashMap<String, String>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn store(
        &self,
        id: &str,
        value: &SecretValue,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.records.insert(
            id.to_string(),
            StoredSecret::new(id, value.clone(), created_at),
        );
        Ok(())
    }

    async fn get_latest(&self) -> Result<StoredSecret, StoreError> {
        latest_of(self.records.iter().map(|entry| entry.value().clone()))
    }

    async fn get_all(&self) -> Result<Vec<StoredSecret>, StoreError> {
        Ok(self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get(&self, id: &str) -> Result<StoredSecret, StoreError> {
        self.records
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
