//! Token signing configuration

use jsonwebtoken::Algorithm;
use locksmith_rotation::generator::{DEFAULT_SECRET_BYTES, RandomSecretGenerator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{TokenError, TokenResult};

/// HMAC algorithms accepted for signing and validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256
    #[default]
    HS256,
    /// HMAC with SHA-384
    HS384,
    /// HMAC with SHA-512
    HS512,
}

impl SigningAlgorithm {
    /// Header name of the algorithm
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }
}

impl From<SigningAlgorithm> for Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        match alg {
            SigningAlgorithm::HS256 => Self::HS256,
            SigningAlgorithm::HS384 => Self::HS384,
            SigningAlgorithm::HS512 => Self::HS512,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(TokenError::UnsupportedAlgorithm {
                alg: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT signing and validation settings
///
/// ```
/// use locksmith_jwt::{JwtConfig, SigningAlgorithm};
///
/// let config: JwtConfig =
///     serde_json::from_str(r#"{"algorithm":"HS512","leeway":"30s","issuer":"auth"}"#).unwrap();
/// assert_eq!(config.algorithm, SigningAlgorithm::HS512);
/// assert_eq!(config.secret_bytes, 64);
/// assert_eq!(config.leeway.as_secs(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Algorithm used for new tokens
    #[serde(default)]
    pub algorithm: SigningAlgorithm,

    /// Size of generated secrets in bytes
    #[serde(default = "default_secret_bytes")]
    pub secret_bytes: usize,

    /// Clock skew tolerance for `exp` and `nbf`
    #[serde(with = "humantime_serde", default = "default_leeway")]
    pub leeway: Duration,

    /// Required `iss` claim
    #[serde(default)]
    pub issuer: Option<String>,

    /// Required `aud` claim
    #[serde(default)]
    pub audience: Option<String>,

    /// Reject tokens without an `exp` claim
    #[serde(default)]
    pub require_exp: bool,
}

fn default_secret_bytes() -> usize {
    DEFAULT_SECRET_BYTES
}

fn default_leeway() -> Duration {
    Duration::from_secs(60)
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::default(),
            secret_bytes: default_secret_bytes(),
            leeway: default_leeway(),
            issuer: None,
            audience: None,
            require_exp: false,
        }
    }
}

impl JwtConfig {
    /// Set the signing algorithm
    pub fn with_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the generated secret size
    pub fn with_secret_bytes(mut self, secret_bytes: usize) -> Self {
        self.secret_bytes = secret_bytes;
        self
    }

    /// Require and check the `iss` claim
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Require and check the `aud` claim
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Reject tokens without `exp`
    pub fn with_required_exp(mut self, require_exp: bool) -> Self {
        self.require_exp = require_exp;
        self
    }

    /// Set the clock skew tolerance
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Secret generator for this configuration
    ///
    /// # Errors
    ///
    /// * `TokenError::Rotation` if `secret_bytes` is below the minimum
    pub fn generator(&self) -> TokenResult<RandomSecretGenerator> {
        Ok(RandomSecretGenerator::new(self.secret_bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("HS256", SigningAlgorithm::HS256)]
    #[case("HS384", SigningAlgorithm::HS384)]
    #[case("HS512", SigningAlgorithm::HS512)]
    fn test_parse_hmac_algorithms(#[case] raw: &str, #[case] expected: SigningAlgorithm) {
        let parsed: SigningAlgorithm = raw.parse().unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), raw);
    }

    #[rstest]
    #[case("none")]
    #[case("RS256")]
    #[case("hs256")]
    fn test_reject_other_algorithms(#[case] raw: &str) {
        assert!(matches!(
            raw.parse::<SigningAlgorithm>(),
            Err(TokenError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let config = JwtConfig::default();
        assert_eq!(config.algorithm, SigningAlgorithm::HS256);
        assert_eq!(config.secret_bytes, 64);
        assert!(!config.require_exp);
        assert_eq!(serde_json::from_str::<JwtConfig>("{}").unwrap(), config);
    }

    #[test]
    fn test_generator_rejects_short_secrets() {
        let config = JwtConfig::default().with_secret_bytes(16);
        assert!(matches!(config.generator(), Err(TokenError::Rotation(_))));
    }
}
