use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SessionStoreError;
use crate::paths::{decode_key, entry_file_name, temp_file_name};

/// Durable string-to-string mapping.
///
/// Writes are immediately durable; there is no batching.
pub trait KeyValueStore: Send {
    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError>;

    /// Inserts or replaces the value for `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionStoreError>;

    /// Removes `key`. Removing an absent key succeeds.
    fn remove(&mut self, key: &str) -> Result<(), SessionStoreError>;

    /// Lists every stored key in lexical order.
    fn keys(&self) -> Result<Vec<String>, SessionStoreError>;
}

/// Directory-backed store holding one file per key.
///
/// Values are replaced atomically through a temporary sibling file and rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (creating when needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SessionStoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|source| SessionStoreError::io("creating store directory", &root, source))?;
        debug!(root = %root.display(), "opened file store");
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, SessionStoreError> {
        validate_key(key)?;
        Ok(self.root.join(entry_file_name(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        let path = self.entry_path(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionStoreError::io("reading entry", &path, source));
            }
        };

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| SessionStoreError::InvalidUtf8 {
                key: key.to_string(),
                path,
            })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionStoreError> {
        let path = self.entry_path(key)?;
        let temp_path = self.root.join(temp_file_name(key));

        let mut file = File::create(&temp_path)
            .map_err(|source| SessionStoreError::io("creating temporary entry", &temp_path, source))?;
        file.write_all(value.as_bytes())
            .map_err(|source| SessionStoreError::io("writing temporary entry", &temp_path, source))?;
        file.sync_all()
            .map_err(|source| SessionStoreError::io("syncing temporary entry", &temp_path, source))?;
        drop(file);

        fs::rename(&temp_path, &path)
            .map_err(|source| SessionStoreError::io("replacing entry", &path, source))
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionStoreError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionStoreError::io("removing entry", &path, source)),
        }
    }

    fn keys(&self) -> Result<Vec<String>, SessionStoreError> {
        let entries = fs::read_dir(&self.root)
            .map_err(|source| SessionStoreError::io("listing store directory", &self.root, source))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| {
                SessionStoreError::io("listing store directory", &self.root, source)
            })?;
            let is_file = entry.file_type().map(|kind| kind.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(key) = entry.file_name().to_str().and_then(decode_key) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}

pub(crate) fn validate_key(key: &str) -> Result<(), SessionStoreError> {
    if key.is_empty() {
        return Err(SessionStoreError::EmptyKey);
    }

    Ok(())
}
