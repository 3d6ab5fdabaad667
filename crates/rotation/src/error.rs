//! Rotation error types
//!
//! This module defines every error the rotation engine and its ports can
//! produce:
//! - [`RotationError`]: top-level error returned by engine operations
//! - [`StoreError`]: failures reported by a [`SecretStore`](crate::store::SecretStore)
//! - [`ConfigError`]: invalid storage provider setup parameters
//!
//! # Error Conversion
//!
//! Store errors convert into [`RotationError`] automatically, so adapters can
//! be driven with `?`:
//!
//! ```
//! use locksmith_rotation::error::{RotationError, StoreError};
//!
//! let store_err = StoreError::NotFound {
//!     id: "a1b2c3d4e5f6".to_string(),
//! };
//! let err: RotationError = store_err.into();
//! assert!(err.to_string().contains("a1b2c3d4e5f6"));
//! assert!(err.is_retryable());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while generating, persisting or rotating secrets
#[derive(Debug, Error)]
pub enum RotationError {
    /// Policy or construction parameters are invalid; never retried
    #[error("Invalid rotation configuration: {reason}")]
    Configuration {
        /// What is wrong with the configuration
        reason: String,
    },

    /// The entropy source could not supply random bytes
    #[error("Secret generation failed: {reason}")]
    Generation {
        /// Underlying entropy failure
        reason: String,
    },

    /// The storage port rejected or failed a read or write
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// An operation that needs a loaded working set ran before `initialize`
    #[error("Rotation engine is not initialized")]
    NotInitialized,

    /// The runtime shut down before a started rotation finished
    #[error("Rotation task did not complete: {reason}")]
    Interrupted {
        /// Join failure reported by the runtime
        reason: String,
    },
}

impl RotationError {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a generation error
    pub fn generation(reason: impl Into<String>) -> Self {
        Self::Generation {
            reason: reason.into(),
        }
    }

    /// Whether the caller may reasonably retry the failed operation
    ///
    /// Entropy, storage and runtime interruptions are transient;
    /// configuration mistakes and lifecycle misuse are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Generation { .. } | Self::Store(_) | Self::Interrupted { .. }
        )
    }
}

/// Result type for rotation operations
pub type RotationResult<T> = Result<T, RotationError>;

/// Storage port errors
///
/// Adapters map their backend failures onto these variants. The engine
/// treats every variant, timeouts included, as a failed rotation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with the given identifier
    #[error("Secret '{id}' not found")]
    NotFound {
        /// Secret identifier
        id: String,
    },

    /// The store holds no records at all
    #[error("No secrets stored")]
    Empty,

    /// Provider setup failed
    #[error("Store configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to read a record
    #[error("Failed to read secret '{id}': {source}")]
    ReadFailure {
        /// Secret identifier, or `[directory]` for listing failures
        id: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a record
    #[error("Failed to write secret '{id}': {source}")]
    WriteFailure {
        /// Secret identifier, or `[directory]` for directory creation
        id: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A stored record could not be decoded
    #[error("Secret record '{id}' is corrupted: {reason}")]
    Corrupted {
        /// Secret identifier or file name
        id: String,
        /// Decoding failure
        reason: String,
    },

    /// Identifier is not safe to use as a storage key
    #[error("Invalid secret identifier '{id}': {reason}")]
    InvalidId {
        /// The rejected identifier
        id: String,
        /// Reason for rejection
        reason: String,
    },

    /// Backend-specific failure
    #[error("{provider} backend error: {reason}")]
    Backend {
        /// Provider name
        provider: String,
        /// Backend failure description
        reason: String,
    },

    /// Operation timed out
    #[error("Store operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// Operation name
        operation: String,
        /// Duration attempted
        duration: Duration,
    },
}

impl StoreError {
    /// Create a backend error
    pub fn backend(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error means "nothing there" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Empty)
    }
}

/// Storage provider configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidValue {
        /// Offending field
        field: String,
        /// Reason for rejection
        reason: String,
    },

    /// Missing required configuration
    #[error("Missing required configuration: {field}")]
    MissingRequired {
        /// Missing field
        field: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_configuration_error_not_retryable() {
        let err = RotationError::configuration("secret size must be at least 32 bytes");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn test_generation_error_retryable() {
        let err = RotationError::generation("entropy source unavailable");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_store_error_conversion() {
        let store_err = StoreError::backend("memory", "disk full");
        let err: RotationError = store_err.into();
        assert!(matches!(err, RotationError::Store(_)));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(StoreError::Empty.is_not_found());
        assert!(
            StoreError::NotFound {
                id: "abc".to_string()
            }
            .is_not_found()
        );
        assert!(!StoreError::backend("x", "y").is_not_found());
    }

    #[test]
    fn test_write_failure_source_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let store_err = StoreError::WriteFailure {
            id: "a1b2c3".to_string(),
            source: io_err,
        };
        let err = RotationError::from(store_err);

        let store_source = err.source().unwrap();
        assert!(store_source.source().is_some());
    }

    #[test]
    fn test_config_error_into_store_error() {
        let err: StoreError = ConfigError::MissingRequired {
            field: "path".to_string(),
        }
        .into();
        assert!(err.to_string().contains("path"));
    }
}
