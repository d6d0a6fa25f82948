//! String-keyed blob storage used to persist the profile collection.

use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::PersistenceError;

/// Opaque get/set blob store.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Replace the value stored under `key`.
    ///
    /// The write is complete once this returns.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        (**self).set(key, value)
    }
}

/// Stores each key as `<root>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the given directory. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the stored values.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        write_atomic(&path, value).map_err(|source| PersistenceError::Io {
            key: key.to_string(),
            source,
        })?;
        debug!("wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

/// Write through a temporary sibling file and rename it into place.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

fn sanitize_key(input: &str) -> String {
    let result: String = input
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
        .collect();
    if result.is_empty() {
        "value".to_string()
    } else {
        result
    }
}

/// Process-local store, handy for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        self.values.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
