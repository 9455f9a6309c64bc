//! In-memory storage implementation.

use super::{Storage, StorageError, StorageResult};
use crate::notebook::Workspace;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
///
/// Values are kept as serialized JSON, exercising the same wire format as
/// the persistent backends.
#[derive(Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn save(&self, key: &str, workspace: &Workspace) -> StorageResult<()> {
        let json = workspace
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut docs = self
            .documents
            .write()
            .map_err(|e| StorageError::Other(format!("lock error: {e}")))?;
        docs.insert(key.to_string(), json);
        Ok(())
    }

    fn load(&self, key: &str) -> StorageResult<Workspace> {
        let docs = self
            .documents
            .read()
            .map_err(|e| StorageError::Other(format!("lock error: {e}")))?;
        let json = docs
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Workspace::from_json(json).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let mut docs = self
            .documents
            .write()
            .map_err(|e| StorageError::Other(format!("lock error: {e}")))?;
        docs.remove(key);
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let docs = self
            .documents
            .read()
            .map_err(|e| StorageError::Other(format!("lock error: {e}")))?;
        Ok(docs.keys().cloned().collect())
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        let docs = self
            .documents
            .read()
            .map_err(|e| StorageError::Other(format!("lock error: {e}")))?;
        Ok(docs.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        let ws = Workspace::new("guest");

        storage.save("test", &ws).unwrap();
        let loaded = storage.load("test").unwrap();
        assert_eq!(loaded.id, "guest");
    }

    #[test]
    fn test_not_found() {
        let storage = MemoryStorage::new();
        let result = storage.load("nonexistent");
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_exists_and_delete() {
        let storage = MemoryStorage::new();
        let ws = Workspace::new("guest");

        assert!(!storage.exists("test").unwrap());
        storage.save("test", &ws).unwrap();
        assert!(storage.exists("test").unwrap());

        storage.delete("test").unwrap();
        assert!(!storage.exists("test").unwrap());
    }

    #[test]
    fn test_list() {
        let storage = MemoryStorage::new();
        let ws = Workspace::new("guest");

        storage.save("doc1", &ws).unwrap();
        storage.save("doc2", &ws).unwrap();

        let list = storage.list().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(&"doc1".to_string()));
        assert!(list.contains(&"doc2".to_string()));
    }
}
