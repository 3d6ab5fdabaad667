//! Token error types

use locksmith_rotation::RotationError;
use thiserror::Error;

/// Errors from signing or validating tokens
///
/// None of the token-path variants are worth retrying: they mean the engine
/// has no key yet or the token is untrusted, malformed or expired.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The engine has no active secret to sign with
    #[error("No active secret available to sign token")]
    NoActiveSecret,

    /// The token is not a well-formed compact JWT or lacks a `kid`
    #[error("Malformed token: {reason}")]
    MalformedToken {
        /// What is wrong with the token
        reason: String,
    },

    /// The header names an algorithm other than HS256, HS384 or HS512
    #[error("Unsupported token algorithm '{alg}'")]
    UnsupportedAlgorithm {
        /// Algorithm from the token header
        alg: String,
    },

    /// No active or in-grace secret has this key id
    #[error("Unknown signing key '{kid}'")]
    UnknownKey {
        /// Key id from the token header
        kid: String,
    },

    /// The signature does not verify under the matching secret
    #[error("Invalid token signature for key '{kid}'")]
    SignatureInvalid {
        /// Key id from the token header
        kid: String,
    },

    /// Signature verified but registered claims were rejected
    #[error("Token claims rejected for key '{kid}': {reason}")]
    ClaimsRejected {
        /// Key id from the token header
        kid: String,
        /// Which check failed
        reason: String,
    },

    /// Claims could not be serialized into a token
    #[error("Failed to encode token: {reason}")]
    Encoding {
        /// Encoder failure
        reason: String,
    },

    /// Underlying rotation engine failure
    #[error(transparent)]
    Rotation(#[from] RotationError),
}

impl TokenError {
    /// Create a malformed-token error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }

    /// Whether the caller may reasonably retry
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rotation(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

#[cfg(test)]
mod tests {
    use super::*;
    use locksmith_rotation::StoreError;

    #[test]
    fn test_token_errors_not_retryable() {
        assert!(!TokenError::NoActiveSecret.is_retryable());
        assert!(
            !TokenError::UnknownKey {
                kid: "abc".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_rotation_error_passthrough() {
        let err: TokenError = RotationError::from(StoreError::backend("mock", "down")).into();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn test_display_names_key() {
        let err = TokenError::SignatureInvalid {
            kid: "a1b2c3d4e5f6".to_string(),
        };
        assert!(err.to_string().contains("a1b2c3d4e5f6"));
    }
}
