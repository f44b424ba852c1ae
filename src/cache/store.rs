//! Durable key-value stores used to warm-start caches.
//!
//! Mirroring is best-effort: the in-memory cache stays authoritative and the durable copy is
//! only a hint read back at construction time.

use crate::errors::{DataError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub trait DurableStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Process-local store; survives cache instances but not the process.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl DurableStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .items
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[derive(Serialize, Deserialize)]
struct FileRecord {
    key: String,
    value: String,
}

/// One JSON file per key, named by the SHA-256 of the key.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::Store(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    /// `{local data dir}/racedata/cache`, or `./.racedata-cache` when the platform has none.
    pub fn open_default() -> Result<Self> {
        let dir = dirs_next::data_local_dir()
            .map(|d| d.join("racedata").join("cache"))
            .unwrap_or_else(|| PathBuf::from(".racedata-cache"));
        Self::open(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    fn read_record(path: &Path) -> Option<FileRecord> {
        let raw = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("cache file {} is unreadable: {e}", path.display());
                None
            }
        }
    }
}

impl DurableStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Self::read_record(&path).filter(|r| r.key == key).map(|r| r.value))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string(&FileRecord { key: key.to_string(), value: value.to_string() })?;
        fs::write(&tmp, body).map_err(|e| DataError::Store(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| DataError::Store(format!("rename {}: {e}", path.display())))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DataError::Store(format!("remove {key}: {e}"))),
        }
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| DataError::Store(format!("list {}: {e}", self.dir.display())))?;
        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|x| x.to_str()) != Some("json") {
                continue;
            }
            if let Some(rec) = Self::read_record(&path)
                && rec.key.starts_with(prefix)
            {
                keys.push(rec.key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
