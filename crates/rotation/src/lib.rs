//! Locksmith Rotation
//!
//! Zero-downtime rotation of symmetric signing secrets.
//!
//! # Features
//!
//! - **Single active secret** - New tokens are always signed with one key
//! - **Grace-period retention** - Retired keys keep verifying until they age out
//! - **Persist before promote** - A secret is never active before it is stored
//! - **Pluggable ports** - Storage, notification, entropy and clock are traits
//! - **Periodic rotation** - Background schedule with cooperative shutdown
//! - **Redacted secrets** - Values are zeroized on drop and never logged

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Time source abstraction
pub mod clock;
/// Rotation engine and periodic scheduling
pub mod engine;
pub mod error;
/// Secret material generators
pub mod generator;
pub mod id;
/// Notification port and adapters
pub mod notify;
pub mod policy;
pub mod secret;
pub mod store;
/// Test doubles for storage, notification and entropy
pub mod testing;

pub use engine::{EngineState, RotationEngine, RotationEngineBuilder};
pub use error::{ConfigError, RotationError, RotationResult, StoreError};
pub use policy::RotationPolicy;
pub use secret::{Secret, SecretInfo, SecretValue, StoredSecret};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::engine::{EngineState, RotationEngine};
    pub use crate::error::{RotationError, RotationResult, StoreError};
    pub use crate::generator::{RandomSecretGenerator, SecretGenerator};
    pub use crate::notify::{FanOutNotifier, Notifier, RotationFailure, TracingNotifier};
    pub use crate::policy::RotationPolicy;
    pub use crate::secret::{Secret, SecretInfo, SecretValue};
    pub use crate::store::{LocalSecretStore, MemorySecretStore, SecretStore};
}

// Re-export commonly used external types
pub use chrono::{DateTime, Utc};
