//! Secret material and metadata
//!
//! [`SecretValue`] wraps raw key bytes: cheap to clone, redacted in `Debug`,
//! zeroized when the last clone is dropped. Access goes through
//! [`SecretValue::expose_secret`] so the bytes cannot escape by accident.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::id::secret_id;

/// Raw secret bytes with automatic zeroization
///
/// # Examples
///
/// ```
/// use locksmith_rotation::SecretValue;
///
/// let value = SecretValue::new(vec![7u8; 32]);
/// assert_eq!(value.len(), 32);
/// assert_eq!(value.expose_secret(|bytes| bytes[0]), 7);
/// assert_eq!(format!("{value:?}"), "[REDACTED]");
/// ```
#[derive(Clone)]
pub struct SecretValue {
    inner: Arc<Zeroizing<Vec<u8>>>,
}

impl SecretValue {
    /// Wrap raw bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(Zeroizing::new(bytes)),
        }
    }

    /// Access the raw bytes within a closure scope
    pub fn expose_secret<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[u8]) -> R,
    {
        f(self.inner.as_slice())
    }

    /// Number of bytes, without exposing content
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the value holds no bytes
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Export as lowercase hex
    ///
    /// This is an explicit export path; the returned string is not zeroized.
    pub fn to_hex(&self) -> String {
        hex::encode(self.inner.as_slice())
    }
}

impl PartialEq for SecretValue {
    fn eq(&self, other: &Self) -> bool {
        self.inner.as_slice().ct_eq(other.inner.as_slice()).into()
    }
}

impl Eq for SecretValue {}

// Prevent accidental secret leakage via Debug/Display
impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// A secret in the engine's working set
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    /// Short identifier derived from `value`; used as the JWT `kid`
    pub id: String,
    /// Raw key material
    pub value: SecretValue,
    /// When the secret was generated
    pub created_at: DateTime<Utc>,
    /// Whether this is the secret new tokens are signed with
    pub active: bool,
}

impl Secret {
    /// Build a secret from freshly generated material
    pub fn new(value: SecretValue, created_at: DateTime<Utc>) -> Self {
        let id = value.expose_secret(secret_id);
        Self {
            id,
            value,
            created_at,
            active: false,
        }
    }

    /// Metadata view that is safe to log and hand to notifiers
    pub fn info(&self) -> SecretInfo {
        SecretInfo {
            id: self.id.clone(),
            created_at: self.created_at,
        }
    }

    pub(crate) fn from_stored(stored: StoredSecret) -> Self {
        Self {
            id: stored.id,
            value: stored.value,
            created_at: stored.created_at,
            active: false,
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// Identifier and creation time of a secret, without its value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretInfo {
    /// Secret identifier (JWT `kid`)
    pub id: String,
    /// When the secret was generated
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for SecretInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (created {})", self.id, self.created_at.to_rfc3339())
    }
}

/// One persisted secret version as exchanged with a storage port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSecret {
    /// Secret identifier
    pub id: String,
    /// Raw key material
    pub value: SecretValue,
    /// When the secret was generated
    pub created_at: DateTime<Utc>,
}

impl StoredSecret {
    /// Create a stored record
    pub fn new(id: impl Into<String>, value: SecretValue, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            value,
            created_at,
        }
    }
}

impl From<&Secret> for StoredSecret {
    fn from(secret: &Secret) -> Self {
        Self {
            id: secret.id.clone(),
            value: secret.value.clone(),
            created_at: secret.created_at,
        }
    }
}
