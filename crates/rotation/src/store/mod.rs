//! Storage port for persisted secret versions
//!
//! The engine only talks to [`SecretStore`]. Adapters live in submodules:
//! - [`MemorySecretStore`]: in-process, for tests and ephemeral deployments
//! - [`LocalSecretStore`]: one JSON file per secret in a local directory

mod local;
mod memory;

pub use local::{LocalSecretStore, LocalStoreConfig};
pub use memory::MemorySecretStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::secret::{SecretValue, StoredSecret};

/// Durable storage for secret versions
///
/// Implementations must be safe to call from several tasks at once. Writes
/// for the same identifier are repeatable (upsert).
///
/// # Example
///
/// ```
/// use locksmith_rotation::store::{MemorySecretStore, SecretStore};
/// use locksmith_rotation::SecretValue;
/// use chrono::Utc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MemorySecretStore::new();
/// store
///     .store("a1b2c3d4e5f6", &SecretValue::new(vec![1u8; 32]), Utc::now())
///     .await
///     .unwrap();
///
/// let latest = store.get_latest().await.unwrap();
/// assert_eq!(latest.id, "a1b2c3d4e5f6");
/// # }
/// ```
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// One-time provider configuration
    ///
    /// # Errors
    ///
    /// * `StoreError::Config` if a parameter is missing or invalid
    async fn setup(&mut self, params: &HashMap<String, String>) -> Result<(), StoreError>;

    /// Persist one secret version, replacing any record with the same id
    ///
    /// # Errors
    ///
    /// Any `StoreError` means the write did not happen.
    async fn store(
        &self,
        id: &str,
        value: &SecretValue,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Most recently created record
    ///
    /// # Errors
    ///
    /// * `StoreError::Empty` if the store holds nothing
    async fn get_latest(&self) -> Result<StoredSecret, StoreError>;

    /// Every persisted record, in no particular order
    async fn get_all(&self) -> Result<Vec<StoredSecret>, StoreError>;

    /// Record with the given id
    ///
    /// # Errors
    ///
    /// * `StoreError::NotFound` if no record has this id
    async fn get(&self, id: &str) -> Result<StoredSecret, StoreError> {
        self.get_all()
            .await?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// Provider name for logs
    fn provider_name(&self) -> &'static str;
}

/// Orders records newest first, breaking `created_at` ties by id
pub(crate) fn newest_first(a: &StoredSecret, b: &StoredSecret) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Pick the newest record out of an unordered set
pub(crate) fn latest_of<I>(records: I) -> Result<StoredSecret, StoreError>
where
    I: IntoIterator<Item = StoredSecret>,
{
    records
        .into_iter()
        .min_by(newest_first)
        .ok_or(StoreError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, secs: i64) -> StoredSecret {
        StoredSecret::new(
            id,
            SecretValue::new(vec![0u8; 32]),
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
    }

    #[test]
    fn test_newest_first_sorts_by_time_then_id() {
        let mut records = vec![record("b", 10), record("a", 30), record("c", 20), record("d", 30)];
        records.sort_by(newest_first);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a", "c", "b"]);
    }

    #[test]
    fn test_latest_of_empty() {
        assert!(matches!(latest_of(Vec::new()), Err(StoreError::Empty)));
    }

    #[test]
    fn test_latest_of_picks_newest() {
        let latest = latest_of(vec![record("x", 1), record("y", 5), record("z", 3)]).unwrap();
        assert_eq!(latest.id, "y");
    }
}
