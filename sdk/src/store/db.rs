//! sled-backed store. All values share one `state` tree keyed by UTF-8 name.

use std::path::Path;

use sled::{Db, Tree};

use super::{check_key_name, KeyValueStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct SledKeyValueStore {
    db: Db,
    state: Tree,
}

impl SledKeyValueStore {
    /// Opens or creates the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "opened sled state store");
        Self::from_db(db)
    }

    /// In-memory database removed on drop. Meant for tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let state = db.open_tree("state")?;
        Ok(Self { db, state })
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl KeyValueStore for SledKeyValueStore {
    fn get_value(&self, name: &str) -> StoreResult<Vec<u8>> {
        check_key_name(name)?;
        match self.state.get(name.as_bytes())? {
            Some(bytes) => Ok(bytes.to_vec()),
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }

    fn set_value(&self, name: &str, value: &[u8]) -> StoreResult<()> {
        check_key_name(name)?;
        self.state.insert(name.as_bytes(), value)?;
        self.state.flush()?;
        Ok(())
    }
}
