use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage capacity exhausted")]
    CapacityExceeded,

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Keyed blob storage with a bounded entry count. Accessed by single
/// synchronous read-modify-write operations; all writes originate from one
/// mission flow at a time, so no concurrent-writer protocol is needed.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Rejects with `CapacityExceeded` when inserting a new key would push
    /// the backend past its capacity.
    fn put(&self, key: &str, value: String) -> Result<(), StorageError>;

    fn remove(&self, key: &str);

    fn keys(&self) -> Vec<String>;
}

/// In-process backend; the default for browsers-like single-session use and
/// for tests.
pub struct MemoryBackend {
    capacity: usize,
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) && entries.len() >= self.capacity {
            return Err(StorageError::CapacityExceeded);
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

/// One JSON document per key under a directory. Writes go through a temp
/// file plus rename so an interrupted write never leaves a torn document.
pub struct FileBackend {
    dir: PathBuf,
    capacity: usize,
}

impl FileBackend {
    pub fn new(dir: &Path, capacity: usize) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let backend = Self {
            dir: dir.to_path_buf(),
            capacity,
        };
        backend.recover_interrupted_writes();
        Ok(backend)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn recover_interrupted_writes(&self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "tmp") {
                debug!(path = %path.display(), "removing interrupted write");
                let _ = fs::remove_file(&path);
            }
        }
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if !path.exists() && self.keys().len() >= self.capacity {
            return Err(StorageError::CapacityExceeded);
        }

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(|e| StorageError::Backend(e.to_string()))?;
        fs::rename(&tmp_path, &path).map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }

    fn keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    path.file_stem()
                        .and_then(|s| s.to_str())
                        .map(String::from)
                } else {
                    None
                }
            })
            .collect()
    }
}
