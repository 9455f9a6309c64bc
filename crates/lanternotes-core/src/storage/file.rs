//! File-based storage implementation for native platforms.

use super::{Storage, StorageError, StorageResult};
use crate::notebook::Workspace;
use std::fs;
use std::path::PathBuf;

/// File-based storage.
///
/// Stores each tree document as a JSON file in a base directory.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("failed to create storage directory: {e}"))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location,
    /// `<data dir>/lanternotes/workspaces/`.
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("could not determine home directory".to_string()))?;
        Self::new(base.join("lanternotes").join("workspaces"))
    }

    /// File path for a storage key, sanitized for the filesystem.
    fn document_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{safe_key}.json"))
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

impl Storage for FileStorage {
    fn save(&self, key: &str, workspace: &Workspace) -> StorageResult<()> {
        let path = self.document_path(key);
        let json = workspace
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| StorageError::Io(format!("failed to write {}: {}", path.display(), e)))
    }

    fn load(&self, key: &str) -> StorageResult<Workspace> {
        let path = self.document_path(key);
        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let json = fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("failed to read {}: {}", path.display(), e)))?;
        Workspace::from_json(&json).map_err(|e| {
            StorageError::Serialization(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.document_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                StorageError::Io(format!("failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(vec![]);
        }
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| StorageError::Io(format!("failed to read directory: {e}")))?;

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        Ok(keys)
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.document_path(key).exists())
    }
}
