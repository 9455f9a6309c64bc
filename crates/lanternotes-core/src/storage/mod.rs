//! Storage abstraction for whole-tree persistence.
//!
//! The notebook tree is persisted as a single JSON document under a
//! workspace-scoped key; every save rewrites the full tree. Persistence is
//! synchronous and bounded by document size, so a failed write leaves the
//! in-memory tree (and any live surfaces) untouched.

mod autosave;
mod file;
mod memory;

pub use autosave::{AutoSaveManager, DEFAULT_AUTOSAVE_INTERVAL_SECS, LAST_WORKSPACE_KEY};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

use crate::notebook::Workspace;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Build the workspace-scoped storage key for a document.
///
/// Matches the `{workspace}-lantern-notes-{key}` namespace of the persisted
/// browser-storage documents, so existing data remains addressable.
pub fn storage_key(workspace_id: &str, key: &str) -> String {
    format!("{workspace_id}-lantern-notes-{key}")
}

/// Trait for tree storage backends.
///
/// Implementations store whole-tree JSON documents in memory, on the
/// filesystem, or any other key-value medium.
pub trait Storage: Send + Sync {
    /// Save a tree under a key, overwriting any previous document.
    fn save(&self, key: &str, workspace: &Workspace) -> StorageResult<()>;

    /// Load the tree stored under a key.
    fn load(&self, key: &str) -> StorageResult<Workspace>;

    /// Delete the document under a key.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// List all stored keys.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Check whether a document exists.
    fn exists(&self, key: &str) -> StorageResult<bool>;
}
