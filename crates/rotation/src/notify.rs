//! Rotation notifications
//!
//! The engine reports successful rotations and rotation failures through
//! [`Notifier`]. Delivery is best-effort: the engine hands an event to a
//! background task and never observes the outcome.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::RotationError;
use crate::secret::SecretInfo;

/// What started the rotation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationTrigger {
    /// First secret created during initialization
    Initial,
    /// Explicit `rotate()` call
    Manual,
    /// Periodic schedule tick
    Scheduled,
}

impl fmt::Display for RotationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initial => "initial",
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
        })
    }
}

/// A failed rotation as reported to notifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationFailure {
    /// Rendered error
    pub message: String,
    /// Whether retrying could succeed
    pub retryable: bool,
    /// What started the rotation
    pub trigger: RotationTrigger,
    /// When the failure happened
    pub occurred_at: DateTime<Utc>,
}

impl RotationFailure {
    /// Describe a rotation error
    pub fn new(error: &RotationError, trigger: RotationTrigger, occurred_at: DateTime<Utc>) -> Self {
        Self {
            message: error.to_string(),
            retryable: error.is_retryable(),
            trigger,
            occurred_at,
        }
    }
}

impl fmt::Display for RotationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rotation failed: {}", self.trigger, self.message)
    }
}

/// Sink for rotation events
///
/// Implementations handle their own timeouts and retries; nothing they do
/// can fail a rotation.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use locksmith_rotation::notify::{Notifier, RotationFailure};
/// use locksmith_rotation::SecretInfo;
///
/// #[derive(Debug)]
/// struct StderrNotifier;
///
/// #[async_trait]
/// impl Notifier for StderrNotifier {
///     async fn notify_rotation(&self, secret: &SecretInfo) {
///         eprintln!("rotated to {secret}");
///     }
///
///     async fn notify_error(&self, failure: &RotationFailure) {
///         eprintln!("{failure}");
///     }
/// }
/// ```
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    /// A new secret became active
    async fn notify_rotation(&self, secret: &SecretInfo);

    /// A rotation attempt failed
    async fn notify_error(&self, failure: &RotationFailure);
}

/// Notifier that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify_rotation(&self, _secret: &SecretInfo) {}

    async fn notify_error(&self, _failure: &RotationFailure) {}
}

/// Writes events to the `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify_rotation(&self, secret: &SecretInfo) {
        tracing::info!(
            secret_id = %secret.id,
            created_at = %secret.created_at,
            "Signing secret rotated"
        );
    }

    async fn notify_error(&self, failure: &RotationFailure) {
        tracing::error!(
            trigger = %failure.trigger,
            retryable = failure.retryable,
            occurred_at = %failure.occurred_at,
            error = %failure.message,
            "Signing secret rotation failed"
        );
    }
}

/// Forwards every event to each configured sink in order
///
/// # Example
///
/// ```
/// use locksmith_rotation::notify::{FanOutNotifier, NoopNotifier, TracingNotifier};
///
/// let notifier = FanOutNotifier::new()
///     .with(TracingNotifier)
///     .with_optional(None::<NoopNotifier>);
/// assert_eq!(notifier.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FanOutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanOutNotifier {
    /// Empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with(mut self, sink: impl Notifier + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Add a shared sink
    pub fn with_shared(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Add a sink if one is configured
    pub fn with_optional(self, sink: Option<impl Notifier + 'static>) -> Self {
        match sink {
            Some(sink) => self.with(sink),
            None => self,
        }
    }

    /// Number of sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether no sinks are configured
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl Notifier for FanOutNotifier {
    async fn notify_rotation(&self, secret: &SecretInfo) {
        for sink in &self.sinks {
            sink.notify_rotation(secret).await;
        }
    }

    async fn notify_error(&self, failure: &RotationFailure) {
        for sink in &self.sinks {
            sink.notify_error(failure).await;
        }
    }
}
