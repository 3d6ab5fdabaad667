//! Locksmith JWT
//!
//! HMAC-signed JSON Web Tokens whose `kid` header names the rotating secret
//! that signed them. Tokens stay valid across rotations until the signing
//! secret leaves its grace period.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Signing configuration
pub mod config;
pub mod error;
mod header;
/// Token manager
pub mod manager;

pub use config::{JwtConfig, SigningAlgorithm};
pub use error::{TokenError, TokenResult};
pub use manager::{JwtManager, ValidatedToken};
