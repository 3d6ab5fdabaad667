//! Test doubles for the rotation ports
//!
//! Used by this crate's tests and by downstream crates that need an engine
//! with controllable storage, entropy and notifications.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::{RotationError, RotationResult, StoreError};
use crate::generator::{DEFAULT_SECRET_BYTES, SecretGenerator};
use crate::notify::{Notifier, RotationFailure};
use crate::secret::{SecretInfo, SecretValue, StoredSecret};
use crate::store::{SecretStore, latest_of};

/// Mock secret store with failure injection
#[derive(Debug, Default)]
pub struct MockSecretStore {
    data: Arc<DashMap<String, StoredSecret>>,
    fail_on_store: AtomicBool,
    fail_all_stores: AtomicBool,
    fail_on_get_all: AtomicBool,
    store_count: AtomicU32,
    get_all_count: AtomicU32,
    delay: Option<Duration>,
    ack_delay: Option<Duration>,
}

impl MockSecretStore {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `store` call fail
    pub fn fail_next_store(&self) {
        self.fail_on_store.store(true, Ordering::SeqCst);
    }

    /// Make every `store` call fail until turned off
    pub fn fail_stores(&self, fail: bool) {
        self.fail_all_stores.store(fail, Ordering::SeqCst);
    }

    /// Make the next `get_all` call fail
    pub fn fail_next_get_all(&self) {
        self.fail_on_get_all.store(true, Ordering::SeqCst);
    }

    /// Set artificial delay for every operation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay the reply to `store` after the record is already written
    pub fn with_ack_delay(mut self, delay: Duration) -> Self {
        self.ack_delay = Some(delay);
        self
    }

    /// Number of `store` calls, failed ones included
    pub fn store_count(&self) -> u32 {
        self.store_count.load(Ordering::SeqCst)
    }

    /// Number of `get_all` calls, failed ones included
    pub fn get_all_count(&self) -> u32 {
        self.get_all_count.load(Ordering::SeqCst)
    }

    /// Insert a record directly
    pub fn preload(&self, record: StoredSecret) {
        self.data.insert(record.id.clone(), record);
    }

    /// Number of persisted records
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing is persisted
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether a record with `id` is persisted
    pub fn contains(&self, id: &str) -> bool {
        self.data.contains_key(id)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SecretStore for MockSecretStore {
    async fn setup(&mut self, _params: &HashMap<String, String>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn store(
        &self,
        id: &str,
        value: &SecretValue,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.store_count.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.fail_on_store.swap(false, Ordering::SeqCst)
            || self.fail_all_stores.load(Ordering::SeqCst)
        {
            return Err(StoreError::backend("mock", "injected store failure"));
        }

        self.data.insert(
            id.to_string(),
            StoredSecret::new(id, value.clone(), created_at),
        );
        if let Some(delay) = self.ack_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn get_latest(&self) -> Result<StoredSecret, StoreError> {
        self.pause().await;
        latest_of(self.data.iter().map(|e| e.value().clone()))
    }

    async fn get_all(&self) -> Result<Vec<StoredSecret>, StoreError> {
        self.get_all_count.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.fail_on_get_all.swap(false, Ordering::SeqCst) {
            return Err(StoreError::backend("mock", "injected read failure"));
        }
        Ok(self.data.iter().map(|e| e.value().clone()).collect())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Notifier that records every event
///
/// Notifications are dispatched in the background, so tests await them with
/// [`wait_for_rotations`](Self::wait_for_rotations) or
/// [`wait_for_errors`](Self::wait_for_errors).
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    rotations: Mutex<Vec<SecretInfo>>,
    errors: Mutex<Vec<RotationFailure>>,
    changed: Notify,
}

impl RecordingNotifier {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Rotation events received so far
    pub fn rotations(&self) -> Vec<SecretInfo> {
        self.rotations.lock().clone()
    }

    /// Error events received so far
    pub fn errors(&self) -> Vec<RotationFailure> {
        self.errors.lock().clone()
    }

    /// Wait until at least `count` rotation events arrived
    pub async fn wait_for_rotations(&self, count: usize) -> Vec<SecretInfo> {
        loop {
            // Register before checking so a concurrent event is not missed
            let changed = self.changed.notified();
            if self.rotations.lock().len() >= count {
                return self.rotations();
            }
            changed.await;
        }
    }

    /// Wait until at least `count` error events arrived
    pub async fn wait_for_errors(&self, count: usize) -> Vec<RotationFailure> {
        loop {
            let changed = self.changed.notified();
            if self.errors.lock().len() >= count {
                return self.errors();
            }
            changed.await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_rotation(&self, secret: &SecretInfo) {
        self.rotations.lock().push(secret.clone());
        self.changed.notify_waiters();
    }

    async fn notify_error(&self, failure: &RotationFailure) {
        self.errors.lock().push(failure.clone());
        self.changed.notify_waiters();
    }
}

/// Notifier whose deliveries never finish
#[derive(Debug, Default)]
pub struct StalledNotifier {
    started: AtomicU32,
}

impl StalledNotifier {
    /// Create a stalled notifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of deliveries that began
    pub fn started(&self) -> u32 {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for StalledNotifier {
    async fn notify_rotation(&self, _secret: &SecretInfo) {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
    }

    async fn notify_error(&self, _failure: &RotationFailure) {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
    }
}

/// Deterministic generator: call `n` yields bytes derived from `n`
///
/// Values are distinct per call and reproducible across runs.
#[derive(Debug)]
pub struct SequenceGenerator {
    next: AtomicU64,
    size_bytes: usize,
}

impl SequenceGenerator {
    /// Generator of default-sized values starting at 1
    pub fn new() -> Self {
        Self::with_size(DEFAULT_SECRET_BYTES)
    }

    /// Generator of `size_bytes` values (at least 8)
    pub fn with_size(size_bytes: usize) -> Self {
        Self {
            next: AtomicU64::new(1),
            size_bytes: size_bytes.max(8),
        }
    }

    /// Value the generator produces for call number `n`
    pub fn value_for(&self, n: u64) -> SecretValue {
        let mut bytes = vec![0xA5; self.size_bytes];
        bytes[..8].copy_from_slice(&n.to_le_bytes());
        SecretValue::new(bytes)
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretGenerator for SequenceGenerator {
    fn generate(&self) -> RotationResult<SecretValue> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(self.value_for(n))
    }
}

/// Generator whose entropy source fails
#[derive(Debug)]
pub struct FailingGenerator {
    remaining_failures: Option<AtomicU32>,
    fallback: SequenceGenerator,
}

impl FailingGenerator {
    /// Fail every call
    pub fn always() -> Self {
        Self {
            remaining_failures: None,
            fallback: SequenceGenerator::new(),
        }
    }

    /// Fail the first `count` calls, then produce sequence values
    pub fn first(count: u32) -> Self {
        Self {
            remaining_failures: Some(AtomicU32::new(count)),
            fallback: SequenceGenerator::new(),
        }
    }
}

impl SecretGenerator for FailingGenerator {
    fn generate(&self) -> RotationResult<SecretValue> {
        let fail = match &self.remaining_failures {
            None => true,
            Some(remaining) => remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok(),
        };
        if fail {
            return Err(RotationError::generation("injected entropy failure"));
        }
        self.fallback.generate()
    }
}
