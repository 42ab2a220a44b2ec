use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::StorageError;

/// String-keyed, string-valued persistence surface the store writes its
/// snapshots into.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// All keys kept in one JSON object on disk. Every `set` rewrites the whole
/// file; when two processes write, the last one wins.
///
/// A file that is not valid JSON is moved aside to `<name>.corrupt-<timestamp>`
/// and the store starts empty. A file that cannot be read or moved is never
/// written over: every `set` fails until the problem is fixed by hand.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    writable: bool,
}

impl FileStorage {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let (entries, writable) = match Self::load_from_file(&path) {
            Ok(entries) => (entries, true),
            Err(StorageError::Json(e)) => {
                tracing::error!("Storage file {} is not valid JSON: {}", path.display(), e);
                match Self::move_aside(&path) {
                    Ok(moved) => {
                        tracing::warn!("Moved unreadable storage file to {}", moved.display());
                        (BTreeMap::new(), true)
                    }
                    Err(e) => {
                        tracing::error!("Failed to move {} aside: {}", path.display(), e);
                        (BTreeMap::new(), false)
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to read storage file {}: {}", path.display(), e);
                (BTreeMap::new(), false)
            }
        };
        Self {
            path,
            entries,
            writable,
        }
    }

    /// Renames a corrupt file next to itself so the next write starts clean
    /// without losing the old bytes.
    fn move_aside(path: &Path) -> Result<PathBuf, StorageError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "storage".to_string());
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let target = path.with_file_name(format!("{name}.corrupt-{stamp}"));
        fs::rename(path, &target)?;
        Ok(target)
    }

    fn load_from_file(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes through a temporary file and renames it over the target so a
    /// crash never leaves a half-written file behind.
    fn save_to_file(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = self.path.with_extension("tmp");
        let mut f = File::create(&temp)?;
        let content = serde_json::to_string_pretty(&self.entries)?;
        f.write_all(content.as_bytes())?;
        f.sync_all()?;
        fs::rename(temp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.writable {
            return Err(StorageError::ReadOnly(self.path.display().to_string()));
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.save_to_file()
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }
}
