//! # Cryptography
//!
//! Ed25519 keys and the [`CryptoSuite`] seam through which every hash and
//! signature in the SDK is produced. Nothing here is novel: the suite wraps
//! `ed25519-dalek` and `sha2`, and the interesting part is only which bytes
//! get hashed (proposal bytes, payload bytes) and where keys are kept.

pub mod keys;
pub mod suite;

use thiserror::Error;

pub use keys::{PrivateKey, PublicKey};
pub use suite::{CryptoSuite, Ed25519Sha2Suite};

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key material")]
    InvalidKey,

    #[error("unsupported hash {algorithm} at security level {level}")]
    UnsupportedHash { algorithm: String, level: u16 },

    #[error("key not found for ski {0}")]
    KeyNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("key store failure: {0}")]
    KeyStore(String),
}
