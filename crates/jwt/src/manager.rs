//! Rotation-aware JWT manager

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use locksmith_rotation::notify::Notifier;
use locksmith_rotation::store::SecretStore;
use locksmith_rotation::{RotationEngine, RotationPolicy, SecretInfo};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::{JwtConfig, SigningAlgorithm};
use crate::error::{TokenError, TokenResult};
use crate::header;

/// Claims of a token that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedToken<C> {
    /// Decoded claim set
    pub claims: C,
    /// Identifier of the secret that verified the signature
    pub key_id: String,
    /// Algorithm from the token header
    pub algorithm: SigningAlgorithm,
}

/// Signs and validates HMAC JWTs with the engine's secrets
///
/// New tokens carry the active secret's identifier as `kid`. Validation
/// resolves `kid` against the active secret and previous secrets still in
/// their grace period, so tokens survive rotation until that key ages out.
///
/// # Example
///
/// ```
/// use locksmith_jwt::{JwtConfig, JwtManager};
/// use locksmith_rotation::notify::NoopNotifier;
/// use locksmith_rotation::store::MemorySecretStore;
/// use locksmith_rotation::RotationPolicy;
/// use serde_json::{json, Value};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> locksmith_jwt::TokenResult<()> {
/// let manager = JwtManager::connect(
///     Arc::new(MemorySecretStore::new()),
///     RotationPolicy::default(),
///     JwtConfig::default(),
///     Arc::new(NoopNotifier),
/// )
/// .await?;
///
/// let token = manager.sign(&json!({"sub": "user-1"}))?;
/// manager.rotate().await?;
///
/// let validated = manager.validate::<Value>(&token)?;
/// assert_eq!(validated.claims["sub"], "user-1");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JwtManager {
    engine: RotationEngine,
    config: JwtConfig,
}

impl JwtManager {
    /// Wrap an engine; the engine should already be initialized
    pub fn new(engine: RotationEngine, config: JwtConfig) -> Self {
        Self { engine, config }
    }

    /// Build and initialize an engine for JWT signing
    ///
    /// # Errors
    ///
    /// * `TokenError::Rotation` if the secret size is invalid or the
    ///   initial secret cannot be created
    pub async fn connect(
        store: Arc<dyn SecretStore>,
        policy: RotationPolicy,
        config: JwtConfig,
        notifier: Arc<dyn Notifier>,
    ) -> TokenResult<Self> {
        let engine = RotationEngine::builder(store)
            .policy(policy)
            .generator(config.generator()?)
            .notifier(notifier)
            .build();
        engine.initialize().await?;
        Ok(Self::new(engine, config))
    }

    /// Sign claims with the active secret
    ///
    /// # Errors
    ///
    /// * `TokenError::NoActiveSecret` if the engine has no active secret
    /// * `TokenError::Encoding` if the claims cannot be serialized
    pub fn sign<C: Serialize>(&self, claims: &C) -> TokenResult<String> {
        let secret = self.engine.active().ok_or(TokenError::NoActiveSecret)?;

        let mut header = Header::new(self.config.algorithm.into());
        header.kid = Some(secret.id.clone());

        let key = secret.value.expose_secret(EncodingKey::from_secret);
        let token = encode(&header, claims, &key).map_err(|e| TokenError::Encoding {
            reason: e.to_string(),
        })?;

        tracing::trace!(kid = %secret.id, alg = %self.config.algorithm, "Signed token");
        Ok(token)
    }

    /// Verify a token and decode its claims
    ///
    /// The header algorithm is checked before any key lookup. The key is
    /// selected by `kid` alone; no other secret is tried.
    ///
    /// # Errors
    ///
    /// * `TokenError::MalformedToken` for a broken token or missing `kid`
    /// * `TokenError::UnsupportedAlgorithm` for any non-HMAC algorithm
    /// * `TokenError::UnknownKey` if no valid secret has this `kid`
    /// * `TokenError::SignatureInvalid` if the signature does not verify
    /// * `TokenError::ClaimsRejected` if `exp`, `nbf`, `iss` or `aud` fail
    pub fn validate<C: DeserializeOwned>(&self, token: &str) -> TokenResult<ValidatedToken<C>> {
        let header = header::inspect(token)?;

        let Some(secret) = self.engine.find(&header.kid) else {
            tracing::debug!(kid = %header.kid, "Token signed with unknown or expired key");
            return Err(TokenError::UnknownKey { kid: header.kid });
        };

        let key = secret.value.expose_secret(DecodingKey::from_secret);
        let data: TokenData<C> = decode(token, &key, &self.validation(header.algorithm))
            .map_err(|e| decode_error(e, &header.kid))?;

        Ok(ValidatedToken {
            claims: data.claims,
            key_id: header.kid,
            algorithm: header.algorithm,
        })
    }

    fn validation(&self, algorithm: SigningAlgorithm) -> Validation {
        let mut validation = Validation::new(algorithm.into());
        validation.leeway = self.config.leeway.as_secs();
        validation.validate_nbf = true;

        if !self.config.require_exp {
            validation.required_spec_claims.clear();
        }
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
            validation.required_spec_claims.insert("iss".to_string());
        }
        match &self.config.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.required_spec_claims.insert("aud".to_string());
            }
            None => validation.validate_aud = false,
        }
        validation
    }

    /// Rotate the signing secret
    pub async fn rotate(&self) -> TokenResult<SecretInfo> {
        Ok(self.engine.rotate().await?)
    }

    /// Active secret as lowercase hex, empty when there is none
    pub fn export_active_secret_hex(&self) -> String {
        self.engine.export_active_hex()
    }

    /// Underlying rotation engine
    pub fn engine(&self) -> &RotationEngine {
        &self.engine
    }

    /// Signing configuration
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }
}

fn decode_error(error: JwtError, kid: &str) -> TokenError {
    let kid = kid.to_string();
    let rejected = |reason: String| TokenError::ClaimsRejected {
        kid: kid.clone(),
        reason,
    };

    let mapped = match error.kind() {
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid { kid: kid.clone() },
        ErrorKind::ExpiredSignature => rejected("token has expired".to_string()),
        ErrorKind::ImmatureSignature => rejected("token is not yet valid".to_string()),
        ErrorKind::InvalidIssuer => rejected("issuer mismatch".to_string()),
        ErrorKind::InvalidAudience => rejected("audience mismatch".to_string()),
        ErrorKind::InvalidSubject => rejected("subject mismatch".to_string()),
        ErrorKind::MissingRequiredClaim(claim) => {
            rejected(format!("missing required claim '{claim}'"))
        }
        // The header was already checked, so JSON failures come from the payload
        ErrorKind::Json(e) => rejected(format!("claims do not match: {e}")),
        ErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm {
            alg: "unexpected".to_string(),
        },
        _ => TokenError::malformed(error.to_string()),
    };

    tracing::debug!(%kid, error = %mapped, "Token validation failed");
    mapped
}
