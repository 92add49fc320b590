//! File-per-key store. Each value lives in `<dir>/<key>.json`, readable only
//! by the owning user on Unix.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{check_key_name, KeyValueStore, StoreError, StoreResult};
use crate::config::STATE_STORE_FILE_EXTENSION;

#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    path: PathBuf,
}

impl FileKeyValueStore {
    /// Opens the store rooted at `path`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(StoreError::EmptyPath);
        }
        fs::create_dir_all(path)?;
        tracing::info!(path = %path.display(), "opened file state store");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_for(&self, name: &str) -> StoreResult<PathBuf> {
        check_key_name(name)?;
        Ok(self
            .path
            .join(format!("{name}.{STATE_STORE_FILE_EXTENSION}")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_value(&self, name: &str) -> StoreResult<Vec<u8>> {
        let file = self.file_for(name)?;
        match fs::read(&file) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set_value(&self, name: &str, value: &[u8]) -> StoreResult<()> {
        let file = self.file_for(name)?;
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut handle = options.open(&file)?;
        handle.write_all(value)?;
        handle.sync_all()?;
        tracing::debug!(key = name, "state store value written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(
            FileKeyValueStore::new(""),
            Err(StoreError::EmptyPath)
        ));
    }

    #[test]
    fn set_then_get_returns_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path()).unwrap();
        store.set_value("admin", b"{\"name\":\"admin\"}").unwrap();
        assert_eq!(store.get_value("admin").unwrap(), b"{\"name\":\"admin\"}");
        assert!(dir.path().join("admin.json").exists());
    }

    #[test]
    fn missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.get_value("nobody"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn directory_is_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileKeyValueStore::new(&nested).unwrap();
        store.set_value("k", b"v").unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn overwrite_replaces_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path()).unwrap();
        store.set_value("k", b"a much longer first value").unwrap();
        store.set_value("k", b"short").unwrap();
        assert_eq!(store.get_value("k").unwrap(), b"short");
    }

    #[cfg(unix)]
    #[test]
    fn files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path()).unwrap();
        store.set_value("secret", b"x").unwrap();
        let mode = fs::metadata(dir.path().join("secret.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
