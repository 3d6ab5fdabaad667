//! Secret identifier derivation
//!
//! Identifiers are the first [`SECRET_ID_LEN`] hex characters of an
//! HMAC-SHA256 over the secret bytes under an empty key. They are stable for
//! a given value and carry no recoverable key material.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Number of hex characters kept from the digest
pub const SECRET_ID_LEN: usize = 12;

/// Derive the identifier (JWT `kid`) for raw secret bytes
///
/// # Examples
///
/// ```
/// use locksmith_rotation::id::{secret_id, SECRET_ID_LEN};
///
/// let id = secret_id(&[0u8; 32]);
/// assert_eq!(id.len(), SECRET_ID_LEN);
/// assert_eq!(id, secret_id(&[0u8; 32]));
/// ```
pub fn secret_id(value: &[u8]) -> String {
    // HMAC accepts keys of any length, including empty
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&[])
        .unwrap_or_else(|_| unreachable!("HMAC accepts empty keys"));
    mac.update(value);
    let digest = mac.finalize().into_bytes();

    let mut id = hex::encode(digest);
    id.truncate(SECRET_ID_LEN);
    id
}
