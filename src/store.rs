//! Durable key/value option storage.
//!
//! The blocked range collection is persisted as a single blob under one key.
//! [`OptionStore`] is the capability the range store writes through; this
//! module ships an in-memory implementation and a directory-backed one.

use ahash::AHashMap;
use parking_lot::RwLock;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::Result;

/// Durable blob storage keyed by option name.
pub trait OptionStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// Option store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    values: RwLock<AHashMap<String, Vec<u8>>>,
}

impl MemoryOptionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored options.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OptionStore for MemoryOptionStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Option store keeping one file per option in a directory.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// reader never observes a half-written value.
#[derive(Debug, Clone)]
pub struct FileOptionStore {
    dir: PathBuf,
}

impl FileOptionStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the option files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.opt", file_stem(key)))
    }

    /// Path used while writing `key`.
    fn temp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.opt.tmp", file_stem(key)))
    }
}

/// Map an option key to a safe file name.
fn file_stem(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl OptionStore for FileOptionStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.value_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let temp_path = self.temp_path(key);

        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(value)?;
        temp_file.sync_all()?;
        drop(temp_file);

        fs::rename(&temp_path, self.value_path(key))?;
        log::debug!("Stored option {} ({} bytes)", key, value.len());
        Ok(())
    }
}
