//! Key/value storage backends.
//!
//! The facade never inspects the stored bytes; serialization happens at its
//! edge and the backend only moves opaque values. Every backend initializes
//! itself lazily and idempotently: callers invoke [`StorageBackend::ensure_initialized`]
//! before each operation and the first call does the actual work.

use crate::errors::StorageError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Persistence contract consumed by the facade.
pub trait StorageBackend: Send + Sync {
    /// One-time lazy initialization. Safe to call before every operation.
    fn ensure_initialized(&self) -> Result<(), StorageError>;

    /// Store a value, returning whether the write was accepted.
    fn put(&self, key: &str, value: Vec<u8>) -> Result<bool, StorageError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
}

fn check_key(key: &str) -> Result<(), StorageError> {
    if key.trim().is_empty() {
        return Err(StorageError::EmptyKey);
    }
    Ok(())
}

/// Volatile in-process store.
#[derive(Default)]
pub struct MemoryStorage {
    entries: DashMap<String, Vec<u8>>,
    initialized: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}

impl StorageBackend for MemoryStorage {
    fn ensure_initialized(&self) -> Result<(), StorageError> {
        if !self.initialized.swap(true, Ordering::AcqRel) {
            debug!("initialized in-memory storage");
        }
        Ok(())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<bool, StorageError> {
        check_key(key)?;
        self.entries.insert(key.to_string(), value);
        Ok(true)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        check_key(key)?;
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }
}

/// One-file-per-key store under a directory.
///
/// The directory is created on first use; initialization is double-checked so
/// concurrent first calls create it exactly once and a failed attempt is
/// retried by the next caller.
pub struct DirectoryStorage {
    dir: PathBuf,
    initialized: AtomicBool,
    init_lock: Mutex<()>,
}

impl DirectoryStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    /// Store under the platform cache directory.
    pub fn default_location() -> Self {
        let dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hammer-data")
            .join("storage");
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keys are arbitrary strings; the file name keeps a readable prefix and
    /// disambiguates sanitized collisions with an md5 digest of the original
    /// key, so the same key maps to the same file across processes.
    fn entry_path(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .take(64)
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let digest = md5::compute(key.as_bytes());
        self.dir.join(format!("{sanitized}-{digest:x}.bin"))
    }
}

impl StorageBackend for DirectoryStorage {
    fn ensure_initialized(&self) -> Result<(), StorageError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        let _guard = self.init_lock.lock();
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "storage initialization failed");
            return Err(StorageError::Init(format!(
                "cannot create storage directory '{}': {}",
                self.dir.display(),
                e
            )));
        }
        info!(dir = %self.dir.display(), "initialized directory storage");
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<bool, StorageError> {
        check_key(key)?;
        self.ensure_initialized()?;
        let path = self.entry_path(key);
        fs::write(&path, value)
            .map_err(|e| StorageError::Io(format!("writing '{}'", path.display()), e))?;
        debug!(key, path = %path.display(), "stored entry");
        Ok(true)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        check_key(key)?;
        self.ensure_initialized()?;
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(format!("reading '{}'", path.display()), e)),
        }
    }
}
