//! Metadata snapshot store
//!
//! Durable key-value persistence of decoded metadata blobs, addressed by
//! logical name. Presence of a snapshot on disk short-circuits the
//! corresponding download on the next run.

use crate::domain::{HarvestError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// JSON-file-backed metadata store
#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    /// Creates a store rooted at `dir`; the directory is created lazily on
    /// first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the snapshot file for a logical name
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Returns true if a snapshot exists for the logical name
    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Loads and decodes a snapshot
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.path(name);
        let contents = fs::read_to_string(&path).map_err(|e| {
            HarvestError::Metadata(format!("Failed to read snapshot {}: {e}", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            HarvestError::Metadata(format!("Failed to decode snapshot {}: {e}", path.display()))
        })
    }

    /// Encodes and saves a snapshot
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            HarvestError::Metadata(format!(
                "Failed to create metadata directory {}: {e}",
                self.dir.display()
            ))
        })?;
        let path = self.path(name);
        let contents = serde_json::to_string(value)?;

        // Write-then-rename so a crash mid-save never leaves a corrupt
        // snapshot; exists() only ever sees complete files
        let tmp = self.dir.join(format!("{name}.json.tmp"));
        fs::write(&tmp, contents).map_err(|e| {
            HarvestError::Metadata(format!("Failed to write snapshot {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            HarvestError::Metadata(format!("Failed to commit snapshot {}: {e}", path.display()))
        })?;

        tracing::info!(path = %path.display(), "Saved metadata snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());

        let mut map = HashMap::new();
        map.insert("e1".to_string(), "Element One".to_string());

        assert!(!store.exists("data_elements"));
        store.save("data_elements", &map).unwrap();
        assert!(store.exists("data_elements"));

        let loaded: HashMap<String, String> = store.load("data_elements").unwrap();
        assert_eq!(loaded, map);
    }

    #[test]
    fn test_load_missing_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());

        let result: Result<HashMap<String, String>> = store.load("org_units");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_corrupt_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());
        std::fs::write(store.path("org_units"), "not json").unwrap();

        let result: Result<Vec<String>> = store.load("org_units");
        assert!(matches!(result, Err(HarvestError::Metadata(_))));
    }

    #[test]
    fn test_save_replaces_existing_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = MetadataStore::new(dir.path());
        std::fs::write(store.path("org_units"), "stale half-written junk").unwrap();

        store.save("org_units", &vec!["u1".to_string()]).unwrap();

        let loaded: Vec<String> = store.load("org_units").unwrap();
        assert_eq!(loaded, vec!["u1".to_string()]);
        assert!(!dir.path().join("org_units.json.tmp").exists());
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = MetadataStore::new(&nested);

        store.save("combos", &vec!["x".to_string()]).unwrap();
        assert!(nested.join("combos.json").is_file());
    }
}
