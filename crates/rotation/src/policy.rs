//! Rotation Policy
//!
//! Defines when secrets rotate and how long retired secrets stay valid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RotationError, RotationResult};

/// Default grace period for retired secrets (48 hours)
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(48 * 3600);

/// Rotation timing policy
///
/// A zero `rotation_interval` disables periodic rotation; a zero
/// `grace_period` disables eviction so retired secrets never expire.
///
/// Durations serialize in humantime form:
///
/// ```
/// use locksmith_rotation::RotationPolicy;
/// use std::time::Duration;
///
/// let policy: RotationPolicy =
///     serde_json::from_str(r#"{"rotation_interval":"24h","grace_period":"48h"}"#).unwrap();
/// assert_eq!(policy.rotation_interval, Duration::from_secs(24 * 3600));
/// assert_eq!(policy.grace_period, Duration::from_secs(48 * 3600));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Time between automatic rotations
    #[serde(with = "humantime_serde", default)]
    pub rotation_interval: Duration,

    /// How long a secret stays valid for lookup, measured from its creation
    #[serde(with = "humantime_serde", default = "default_grace_period")]
    pub grace_period: Duration,
}

fn default_grace_period() -> Duration {
    DEFAULT_GRACE_PERIOD
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            rotation_interval: Duration::ZERO,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl RotationPolicy {
    /// Create a policy
    pub fn new(rotation_interval: Duration, grace_period: Duration) -> Self {
        Self {
            rotation_interval,
            grace_period,
        }
    }

    /// Manual-only rotation with the given grace period
    pub fn manual(grace_period: Duration) -> Self {
        Self::new(Duration::ZERO, grace_period)
    }

    /// Set the rotation interval
    pub fn with_rotation_interval(mut self, interval: Duration) -> Self {
        self.rotation_interval = interval;
        self
    }

    /// Set the grace period
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Interval for periodic rotation, `None` when disabled
    pub fn periodic_interval(&self) -> Option<Duration> {
        (!self.rotation_interval.is_zero()).then_some(self.rotation_interval)
    }

    /// Validate that the policy supports scheduled rotation
    ///
    /// # Errors
    ///
    /// * `RotationError::Configuration` if the rotation interval is zero
    pub fn validate_periodic(&self) -> RotationResult<Duration> {
        self.periodic_interval().ok_or_else(|| {
            RotationError::configuration("rotation interval must be greater than zero")
        })
    }

    /// Oldest creation time a retired secret may have at `now`
    ///
    /// Returns `None` when eviction is disabled, or when the grace period
    /// reaches past the representable time range (nothing can be old enough).
    pub fn eviction_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.grace_period.is_zero() {
            return None;
        }
        let grace = chrono::Duration::from_std(self.grace_period).ok()?;
        now.checked_sub_signed(grace)
    }

    /// Whether a retired secret created at `created_at` is still valid at `now`
    pub fn within_grace(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.eviction_cutoff(now)
            .is_none_or(|cutoff| created_at >= cutoff)
    }
}
