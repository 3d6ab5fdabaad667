//! The engine's in-memory view of secrets

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::policy::RotationPolicy;
use crate::secret::{Secret, StoredSecret};
use crate::store::newest_first;

/// One optional active secret plus retired secrets, most recently retired first
#[derive(Debug, Default)]
pub(crate) struct WorkingSet {
    active: Option<Secret>,
    previous: Vec<Secret>,
}

impl WorkingSet {
    /// Rebuild from persisted records regardless of enumeration order
    ///
    /// The newest record becomes active. Duplicate ids keep their newest copy.
    pub(crate) fn from_records(mut records: Vec<StoredSecret>) -> Self {
        records.sort_by(newest_first);

        let mut seen = HashSet::new();
        let mut secrets = records
            .into_iter()
            .filter(|record| seen.insert(record.id.clone()))
            .map(Secret::from_stored);

        let active = secrets.next().map(|mut secret| {
            secret.active = true;
            secret
        });
        Self {
            active,
            previous: secrets.collect(),
        }
    }

    pub(crate) fn has_active(&self) -> bool {
        self.active.is_some()
    }

    pub(crate) fn active(&self) -> Option<&Secret> {
        self.active.as_ref()
    }

    /// Number of retained previous secrets, expired or not
    pub(crate) fn previous_len(&self) -> usize {
        self.previous.len()
    }

    /// Make `secret` active and demote the current active secret
    pub(crate) fn promote(&mut self, mut secret: Secret) {
        secret.active = true;
        self.previous.retain(|s| s.id != secret.id);

        if let Some(mut retired) = self.active.take() {
            if retired.id != secret.id {
                retired.active = false;
                self.previous.insert(0, retired);
            }
        }
        self.active = Some(secret);
    }

    /// Drop previous secrets past the grace period, returning how many
    pub(crate) fn evict_expired(&mut self, policy: &RotationPolicy, now: DateTime<Utc>) -> usize {
        let before = self.previous.len();
        self.previous
            .retain(|s| policy.within_grace(s.created_at, now));
        before - self.previous.len()
    }

    /// Active secret or a previous secret still inside its grace period
    pub(crate) fn find(
        &self,
        id: &str,
        policy: &RotationPolicy,
        now: DateTime<Utc>,
    ) -> Option<&Secret> {
        if let Some(active) = self.active.as_ref().filter(|s| s.id == id) {
            return Some(active);
        }
        self.previous
            .iter()
            .find(|s| s.id == id && policy.within_grace(s.created_at, now))
    }

    /// Active first, then valid previous secrets in retirement order
    pub(crate) fn snapshot(&self, policy: &RotationPolicy, now: DateTime<Utc>) -> Vec<Secret> {
        self.active
            .iter()
            .chain(
                self.previous
                    .iter()
                    .filter(|s| policy.within_grace(s.created_at, now)),
            )
            .cloned()
            .collect()
    }
}
