//! Rotation engine
//!
//! [`RotationEngine`] owns the working set of signing secrets: exactly one
//! active secret once initialized, plus retired secrets that stay valid for
//! verification until their grace period runs out.
//!
//! # Concurrency
//!
//! Readers (`secrets`, `active`, `find`) take a shared lock and never wait on
//! storage. `rotate` generates and persists the new secret before taking the
//! exclusive lock, then only splices the working set. Rotations are
//! serialized by a separate async gate, so at most one is in flight.
//!
//! A started rotation runs on its own task. Dropping the future returned by
//! `rotate` or `initialize` detaches from that task without cancelling it,
//! so a secret whose store write succeeded is always promoted.
//!
//! # Example
//!
//! ```
//! use locksmith_rotation::engine::RotationEngine;
//! use locksmith_rotation::store::MemorySecretStore;
//! use locksmith_rotation::RotationPolicy;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> locksmith_rotation::RotationResult<()> {
//! let engine = RotationEngine::builder(Arc::new(MemorySecretStore::new()))
//!     .policy(RotationPolicy::default())
//!     .build();
//! engine.initialize().await?;
//!
//! let first = engine.active().unwrap();
//! let rotated = engine.rotate().await?;
//! assert_ne!(first.id, rotated.id);
//! assert_eq!(engine.secrets().len(), 2);
//! # Ok(())
//! # }
//! ```

mod schedule;
mod working_set;

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::OwnedMutexGuard;

use crate::clock::{Clock, SystemClock};
use crate::error::{RotationError, RotationResult};
use crate::generator::{RandomSecretGenerator, SecretGenerator};
use crate::notify::{NoopNotifier, Notifier, RotationFailure, RotationTrigger};
use crate::policy::RotationPolicy;
use crate::secret::{Secret, SecretInfo};
use crate::store::SecretStore;

use schedule::Schedule;
use working_set::WorkingSet;

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EngineState {
    /// `initialize` has not completed
    Uninitialized = 0,
    /// Serving with an active secret
    Ready = 1,
    /// A rotation is generating or persisting a new secret
    RotationInProgress = 2,
}

impl EngineState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Ready,
            2 => Self::RotationInProgress,
            _ => Self::Uninitialized,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::RotationInProgress => "rotation_in_progress",
        })
    }
}

pub(crate) struct EngineInner {
    policy: RotationPolicy,
    store: Arc<dyn SecretStore>,
    generator: Arc<dyn SecretGenerator>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    working_set: RwLock<WorkingSet>,
    rotation_gate: Arc<tokio::sync::Mutex<()>>,
    state: AtomicU8,
    schedule: Mutex<Option<Schedule>>,
}

impl EngineInner {
    fn set_state(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Some(schedule) = self.schedule.get_mut().take() {
            schedule.stop();
        }
    }
}

/// Marks a rotation in progress; settles the state on drop, even on panic
struct InProgress<'a> {
    inner: &'a EngineInner,
}

impl<'a> InProgress<'a> {
    fn enter(inner: &'a EngineInner) -> Self {
        inner.set_state(EngineState::RotationInProgress);
        Self { inner }
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        let settled = if self.inner.working_set.read().has_active() {
            EngineState::Ready
        } else {
            EngineState::Uninitialized
        };
        self.inner.set_state(settled);
    }
}

/// Signing secret rotation engine
///
/// Cheap to clone; clones share the same working set and schedule.
#[derive(Clone)]
pub struct RotationEngine {
    inner: Arc<EngineInner>,
}

impl fmt::Debug for RotationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotationEngine")
            .field("state", &self.state())
            .field("policy", &self.inner.policy)
            .field("store", &self.inner.store.provider_name())
            .field("active", &self.active().map(|s| s.id))
            .finish_non_exhaustive()
    }
}

impl RotationEngine {
    /// Start building an engine over `store`
    pub fn builder(store: Arc<dyn SecretStore>) -> RotationEngineBuilder {
        RotationEngineBuilder::new(store)
    }

    /// Engine with default generator, system clock and no notifications
    pub fn new(store: Arc<dyn SecretStore>, policy: RotationPolicy) -> Self {
        Self::builder(store).policy(policy).build()
    }

    /// Load persisted secrets and pick the active one
    ///
    /// The newest record by `created_at` becomes active. When the store is
    /// empty or cannot be read, one rotation runs to create the first
    /// secret; if that fails the error is notified and returned and the
    /// engine stays uninitialized. Calling this on a ready engine does nothing.
    pub async fn initialize(&self) -> RotationResult<()> {
        let gate = self.acquire_gate().await;
        if self.state() != EngineState::Uninitialized {
            return Ok(());
        }
        self.run_to_completion(gate, |engine| async move { engine.load_or_create().await })
            .await
    }

    async fn load_or_create(&self) -> RotationResult<()> {
        match self.inner.store.get_all().await {
            Ok(records) if !records.is_empty() => {
                let now = self.inner.clock.now();
                let mut loaded = WorkingSet::from_records(records);
                let evicted = loaded.evict_expired(&self.inner.policy, now);

                let active = loaded.active().map(Secret::info);
                let previous = loaded.previous_len();
                *self.inner.working_set.write() = loaded;
                self.inner.set_state(EngineState::Ready);

                if let Some(active) = active {
                    tracing::info!(
                        secret_id = %active.id,
                        previous,
                        evicted,
                        store = self.inner.store.provider_name(),
                        "Loaded persisted signing secrets"
                    );
                }
                return Ok(());
            }
            Ok(_) => {
                tracing::info!(
                    store = self.inner.store.provider_name(),
                    "No persisted secrets, creating initial signing secret"
                );
            }
            Err(error) => {
                tracing::warn!(
                    store = self.inner.store.provider_name(),
                    %error,
                    "Failed to load persisted secrets, creating initial signing secret"
                );
            }
        }

        self.rotate_locked(RotationTrigger::Initial).await?;
        Ok(())
    }

    /// Generate, persist and activate a new secret
    ///
    /// The working set only changes after the store write succeeds. Any
    /// failure is returned and also reported to the notifier. Once started,
    /// the rotation finishes even if the returned future is dropped.
    ///
    /// # Errors
    ///
    /// * `RotationError::NotInitialized` before `initialize` completes
    /// * `RotationError::Generation` if the entropy source fails
    /// * `RotationError::Store` if persisting the secret fails
    /// * `RotationError::Interrupted` if the runtime shuts down mid-rotation
    pub async fn rotate(&self) -> RotationResult<SecretInfo> {
        self.rotate_with(RotationTrigger::Manual).await
    }

    pub(crate) async fn rotate_with(&self, trigger: RotationTrigger) -> RotationResult<SecretInfo> {
        let gate = self.acquire_gate().await;
        if self.state() == EngineState::Uninitialized {
            return Err(RotationError::NotInitialized);
        }
        self.run_to_completion(gate, move |engine| async move {
            engine.rotate_locked(trigger).await
        })
        .await
    }

    async fn acquire_gate(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.inner.rotation_gate).lock_owned().await
    }

    /// Run `work` on its own task while holding `gate`
    ///
    /// The caller only awaits the join handle. Outside a Tokio runtime the
    /// work runs inline.
    async fn run_to_completion<T, F, Fut>(
        &self,
        gate: OwnedMutexGuard<()>,
        work: F,
    ) -> RotationResult<T>
    where
        F: FnOnce(RotationEngine) -> Fut,
        Fut: Future<Output = RotationResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let work = work(self.clone());
        let task = async move {
            let result = work.await;
            drop(gate);
            result
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return task.await;
        };
        match runtime.spawn(task).await {
            Ok(result) => result,
            Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
            Err(error) => Err(RotationError::Interrupted {
                reason: error.to_string(),
            }),
        }
    }

    /// One rotation cycle; the caller holds the rotation gate
    async fn rotate_locked(&self, trigger: RotationTrigger) -> RotationResult<SecretInfo> {
        let result = {
            let _in_progress = InProgress::enter(&self.inner);
            self.try_rotate().await
        };

        match &result {
            Ok(info) => self.dispatch_rotation(info.clone()),
            Err(error) => {
                tracing::error!(%trigger, %error, "Signing secret rotation failed");
                self.dispatch_error(RotationFailure::new(error, trigger, self.inner.clock.now()));
            }
        }
        result
    }

    async fn try_rotate(&self) -> RotationResult<SecretInfo> {
        let inner = &self.inner;
        let value = inner.generator.generate()?;
        let secret = Secret::new(value, inner.clock.now());

        inner
            .store
            .store(&secret.id, &secret.value, secret.created_at)
            .await?;

        let info = secret.info();
        let now = inner.clock.now();
        let (previous, evicted) = {
            let mut working_set = inner.working_set.write();
            working_set.promote(secret);
            let evicted = working_set.evict_expired(&inner.policy, now);
            (working_set.previous_len(), evicted)
        };

        tracing::info!(
            secret_id = %info.id,
            previous,
            evicted,
            "Rotated signing secret"
        );
        Ok(info)
    }

    fn dispatch_rotation(&self, info: SecretInfo) {
        let notifier = Arc::clone(&self.inner.notifier);
        spawn_detached(async move { notifier.notify_rotation(&info).await });
    }

    fn dispatch_error(&self, failure: RotationFailure) {
        let notifier = Arc::clone(&self.inner.notifier);
        spawn_detached(async move { notifier.notify_error(&failure).await });
    }

    /// Evict previous secrets past the grace period
    ///
    /// Returns the number of secrets removed.
    pub fn cleanup(&self) -> usize {
        let now = self.inner.clock.now();
        let evicted = self
            .inner
            .working_set
            .write()
            .evict_expired(&self.inner.policy, now);
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted expired signing secrets");
        }
        evicted
    }

    /// Consistent snapshot: active first, then valid previous secrets
    pub fn secrets(&self) -> Vec<Secret> {
        let now = self.inner.clock.now();
        self.inner
            .working_set
            .read()
            .snapshot(&self.inner.policy, now)
    }

    /// The secret new tokens are signed with
    pub fn active(&self) -> Option<Secret> {
        self.inner.working_set.read().active().cloned()
    }

    /// Look up a secret that may still verify tokens
    pub fn find(&self, id: &str) -> Option<Secret> {
        let now = self.inner.clock.now();
        self.inner
            .working_set
            .read()
            .find(id, &self.inner.policy, now)
            .cloned()
    }

    /// Active secret value as lowercase hex, empty when there is none
    pub fn export_active_hex(&self) -> String {
        self.inner
            .working_set
            .read()
            .active()
            .map(|s| s.value.to_hex())
            .unwrap_or_default()
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Policy this engine was built with
    pub fn policy(&self) -> &RotationPolicy {
        &self.inner.policy
    }

    /// Current time according to the engine's clock
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.inner.clock.now()
    }
}

/// Run a notification without awaiting it
fn spawn_detached<F>(future: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(future);
        }
        Err(_) => tracing::warn!("No Tokio runtime available, dropping rotation notification"),
    }
}

/// Builder for [`RotationEngine`]
pub struct RotationEngineBuilder {
    store: Arc<dyn SecretStore>,
    policy: RotationPolicy,
    generator: Option<Arc<dyn SecretGenerator>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
}

impl RotationEngineBuilder {
    fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            policy: RotationPolicy::default(),
            generator: None,
            notifier: None,
            clock: None,
        }
    }

    /// Rotation policy (default: manual only, 48h grace)
    pub fn policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Secret generator (default: 64 random bytes)
    pub fn generator(mut self, generator: impl SecretGenerator + 'static) -> Self {
        self.generator = Some(Arc::new(generator));
        self
    }

    /// Notification sink (default: discard)
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Time source (default: system clock)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build an uninitialized engine
    pub fn build(self) -> RotationEngine {
        RotationEngine {
            inner: Arc::new(EngineInner {
                policy: self.policy,
                store: self.store,
                generator: self
                    .generator
                    .unwrap_or_else(|| Arc::new(RandomSecretGenerator::default())),
                notifier: self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier)),
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                working_set: RwLock::new(WorkingSet::default()),
                rotation_gate: Arc::new(tokio::sync::Mutex::new(())),
                state: AtomicU8::new(EngineState::Uninitialized as u8),
                schedule: Mutex::new(None),
            }),
        }
    }
}
