//! Secret material generation

use crate::error::{RotationError, RotationResult};
use crate::secret::SecretValue;

/// Minimum secret size accepted by [`RandomSecretGenerator`]
pub const MIN_SECRET_BYTES: usize = 32;

/// Default secret size for HMAC signing keys
pub const DEFAULT_SECRET_BYTES: usize = 64;

/// Produces new secret values
pub trait SecretGenerator: Send + Sync {
    /// Generate a fresh secret value
    ///
    /// # Errors
    ///
    /// * `RotationError::Generation` if the entropy source fails
    fn generate(&self) -> RotationResult<SecretValue>;
}

/// Generates secrets from the operating system's CSPRNG
///
/// # Example
///
/// ```
/// use locksmith_rotation::generator::{RandomSecretGenerator, SecretGenerator};
///
/// let generator = RandomSecretGenerator::new(64).unwrap();
/// let value = generator.generate().unwrap();
/// assert_eq!(value.len(), 64);
///
/// assert!(RandomSecretGenerator::new(16).is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RandomSecretGenerator {
    size_bytes: usize,
}

impl RandomSecretGenerator {
    /// Create a generator producing `size_bytes` of random material
    ///
    /// # Errors
    ///
    /// * `RotationError::Configuration` if `size_bytes` is below [`MIN_SECRET_BYTES`]
    pub fn new(size_bytes: usize) -> RotationResult<Self> {
        if size_bytes < MIN_SECRET_BYTES {
            return Err(RotationError::configuration(format!(
                "secret size must be at least {MIN_SECRET_BYTES} bytes, got {size_bytes}"
            )));
        }
        Ok(Self { size_bytes })
    }

    /// Configured secret size
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

impl Default for RandomSecretGenerator {
    fn default() -> Self {
        Self {
            size_bytes: DEFAULT_SECRET_BYTES,
        }
    }
}

impl SecretGenerator for RandomSecretGenerator {
    fn generate(&self) -> RotationResult<SecretValue> {
        let mut bytes = vec![0u8; self.size_bytes];
        getrandom::fill(&mut bytes).map_err(|e| {
            RotationError::generation(format!("error generating random secret: {e}"))
        })?;
        Ok(SecretValue::new(bytes))
    }
}
