//! # State Stores
//!
//! Small key-value stores for client-side state: persisted user records and,
//! optionally, the crypto suite's keys. Two implementations:
//!
//! ```text
//! file.rs: one `<key>.json` file per key in a directory
//! db.rs  : a single sled tree, for processes that already embed sled
//! ```
//!
//! Both are synchronous. Writes are small and rare (enrollment, key import),
//! so nothing here is worth an executor hop.

pub mod db;
pub mod file;

use thiserror::Error;

pub use self::db::SledKeyValueStore;
pub use self::file::FileKeyValueStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("FileKeyValueStore path is empty")]
    EmptyPath,

    #[error("invalid key name: {0:?}")]
    InvalidKey(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A named-value store shared across the client and its crypto suite.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored bytes, or [`StoreError::NotFound`].
    fn get_value(&self, name: &str) -> StoreResult<Vec<u8>>;

    /// Creates or replaces `name`.
    fn set_value(&self, name: &str, value: &[u8]) -> StoreResult<()>;
}

/// Rejects names that could escape a directory or collide with sled prefixes.
pub(crate) fn check_key_name(name: &str) -> StoreResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(StoreError::InvalidKey(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_with_separators_are_rejected() {
        assert!(check_key_name("admin").is_ok());
        assert!(check_key_name("ab12_sk").is_ok());
        assert!(check_key_name("").is_err());
        assert!(check_key_name("..").is_err());
        assert!(check_key_name("../etc/passwd").is_err());
        assert!(check_key_name("a\\b").is_err());
    }
}
