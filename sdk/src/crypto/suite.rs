//! # Crypto Suite
//!
//! The [`CryptoSuite`] trait is the only way the rest of the SDK hashes,
//! signs or looks up keys. [`Ed25519Sha2Suite`] is the stock
//! implementation: SHA-2 digests at the configured security level, Ed25519
//! signatures, and an in-memory key store indexed by SKI that can be backed
//! by a persistent [`KeyValueStore`].

use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256, Sha384};

use super::keys::{PrivateKey, PublicKey};
use super::CryptoError;
use crate::config::SecurityConfig;
use crate::store::{KeyValueStore, StoreError};

/// Hashing, signing and key management behind one seam.
pub trait CryptoSuite: Send + Sync {
    /// Digest of `message` with the suite's configured hash.
    fn hash(&self, message: &[u8]) -> Vec<u8>;

    /// Signs an already-computed digest.
    fn sign(&self, key: &PrivateKey, digest: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn verify(&self, key: &PublicKey, signature: &[u8], digest: &[u8])
        -> Result<bool, CryptoError>;

    /// New key. Ephemeral keys are not kept in the key store.
    fn generate_key(&self, ephemeral: bool) -> Result<PrivateKey, CryptoError>;

    /// Deterministically derives a child key from `key` and `context`.
    fn derive_key(
        &self,
        key: &PrivateKey,
        context: &[u8],
        ephemeral: bool,
    ) -> Result<PrivateKey, CryptoError>;

    /// Imports raw secret key bytes.
    fn import_key(&self, raw: &[u8], ephemeral: bool) -> Result<PrivateKey, CryptoError>;

    /// Looks a stored key up by subject key identifier.
    fn get_key(&self, ski: &[u8]) -> Result<PrivateKey, CryptoError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashFunction {
    Sha256,
    Sha384,
}

/// Ed25519 signatures over SHA-2 digests.
pub struct Ed25519Sha2Suite {
    hash_function: HashFunction,
    keys: DashMap<Vec<u8>, PrivateKey>,
    key_store: Option<Arc<dyn KeyValueStore>>,
}

impl Ed25519Sha2Suite {
    /// Builds a suite for `security.hash_algorithm` at `security.level`.
    ///
    /// Only the SHA-2 family is available; asking for anything else fails
    /// here rather than at the first signature.
    pub fn new(security: &SecurityConfig) -> Result<Self, CryptoError> {
        let hash_function = match (security.hash_algorithm.to_uppercase().as_str(), security.level)
        {
            ("SHA2", 256) => HashFunction::Sha256,
            ("SHA2", 384) => HashFunction::Sha384,
            (algorithm, level) => {
                return Err(CryptoError::UnsupportedHash {
                    algorithm: algorithm.to_string(),
                    level,
                })
            }
        };
        Ok(Self {
            hash_function,
            keys: DashMap::new(),
            key_store: None,
        })
    }

    /// Persists non-ephemeral keys to `store`, and consults it on lookups
    /// that miss in memory.
    pub fn with_key_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_store = Some(store);
        self
    }

    fn store_key_name(ski: &[u8]) -> String {
        format!("{}_sk", hex::encode(ski))
    }

    fn remember(&self, key: &PrivateKey) -> Result<(), CryptoError> {
        let ski = key.ski();
        if let Some(store) = &self.key_store {
            store
                .set_value(
                    &Self::store_key_name(&ski),
                    hex::encode(key.to_bytes()).as_bytes(),
                )
                .map_err(|e| CryptoError::KeyStore(e.to_string()))?;
        }
        self.keys.insert(ski, key.clone());
        Ok(())
    }

    fn finish(&self, key: PrivateKey, ephemeral: bool) -> Result<PrivateKey, CryptoError> {
        if !ephemeral {
            self.remember(&key)?;
        }
        Ok(key)
    }
}

impl CryptoSuite for Ed25519Sha2Suite {
    fn hash(&self, message: &[u8]) -> Vec<u8> {
        match self.hash_function {
            HashFunction::Sha256 => Sha256::digest(message).to_vec(),
            HashFunction::Sha384 => Sha384::digest(message).to_vec(),
        }
    }

    fn sign(&self, key: &PrivateKey, digest: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if digest.is_empty() {
            return Err(CryptoError::InvalidInput("digest is empty"));
        }
        Ok(key.sign(digest))
    }

    fn verify(
        &self,
        key: &PublicKey,
        signature: &[u8],
        digest: &[u8],
    ) -> Result<bool, CryptoError> {
        if signature.is_empty() {
            return Err(CryptoError::InvalidInput("signature is empty"));
        }
        Ok(key.verify(digest, signature))
    }

    fn generate_key(&self, ephemeral: bool) -> Result<PrivateKey, CryptoError> {
        self.finish(PrivateKey::generate(), ephemeral)
    }

    fn derive_key(
        &self,
        key: &PrivateKey,
        context: &[u8],
        ephemeral: bool,
    ) -> Result<PrivateKey, CryptoError> {
        let mut hasher = Sha256::new();
        hasher.update(key.to_bytes());
        hasher.update(context);
        let derived = PrivateKey::from_bytes(&hasher.finalize())?;
        self.finish(derived, ephemeral)
    }

    fn import_key(&self, raw: &[u8], ephemeral: bool) -> Result<PrivateKey, CryptoError> {
        self.finish(PrivateKey::from_bytes(raw)?, ephemeral)
    }

    fn get_key(&self, ski: &[u8]) -> Result<PrivateKey, CryptoError> {
        if let Some(key) = self.keys.get(ski) {
            return Ok(key.clone());
        }

        let not_found = || CryptoError::KeyNotFound(hex::encode(ski));
        let Some(store) = &self.key_store else {
            return Err(not_found());
        };
        let raw = match store.get_value(&Self::store_key_name(ski)) {
            Ok(raw) => raw,
            Err(StoreError::NotFound(_)) => return Err(not_found()),
            Err(e) => return Err(CryptoError::KeyStore(e.to_string())),
        };
        let hex_key = String::from_utf8(raw).map_err(|_| CryptoError::InvalidKey)?;
        let key = PrivateKey::from_hex(&hex_key)?;
        if key.ski() != ski {
            return Err(CryptoError::InvalidKey);
        }
        self.keys.insert(ski.to_vec(), key.clone());
        Ok(key)
    }
}
