//! Periodic auto-save of the notebook tree.

use super::{Storage, StorageResult};
use crate::notebook::Workspace;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Key under which the most recently edited workspace is mirrored.
pub const LAST_WORKSPACE_KEY: &str = "__last_workspace__";

/// Tracks dirtiness and save timing for one workspace document.
///
/// The owner marks the manager dirty after each mutation and calls
/// [`AutoSaveManager::maybe_save`] from its tick; a save happens only when
/// the document is dirty and the interval has elapsed.
pub struct AutoSaveManager<S: Storage> {
    storage: Arc<S>,
    interval: Duration,
    last_save: Option<Instant>,
    dirty: bool,
    workspace_key: Option<String>,
}

impl<S: Storage> AutoSaveManager<S> {
    /// Create a new auto-save manager with the given storage backend.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
            workspace_key: None,
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Mark the tree as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Set the storage key the workspace saves under.
    pub fn set_workspace_key(&mut self, key: Option<String>) {
        self.workspace_key = key;
    }

    pub fn workspace_key(&self) -> Option<&str> {
        self.workspace_key.as_deref()
    }

    /// Whether a save is due (dirty and interval elapsed).
    pub fn should_save(&self) -> bool {
        if !self.dirty {
            return false;
        }
        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save if due. Returns true if a save was performed.
    pub fn maybe_save(&mut self, workspace: &Workspace) -> StorageResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }
        self.save(workspace)?;
        Ok(true)
    }

    /// Force an immediate save.
    pub fn save(&mut self, workspace: &Workspace) -> StorageResult<()> {
        let key = self
            .workspace_key
            .clone()
            .unwrap_or_else(|| super::storage_key(&workspace.id, "folders"));
        self.storage.save(&key, workspace)?;
        // Mirror for restore-on-launch.
        self.storage.save(LAST_WORKSPACE_KEY, workspace)?;

        self.last_save = Some(Instant::now());
        self.dirty = false;
        Ok(())
    }

    /// Load a tree by key and adopt it as the current document.
    pub fn load(&mut self, key: &str) -> StorageResult<Workspace> {
        let workspace = self.storage.load(key)?;
        self.workspace_key = Some(key.to_string());
        self.dirty = false;
        self.last_save = Some(Instant::now());
        Ok(workspace)
    }

    /// Try to load the most recently edited workspace.
    pub fn load_last(&mut self) -> Option<Workspace> {
        match self.storage.load(LAST_WORKSPACE_KEY) {
            Ok(workspace) => {
                self.workspace_key = Some(super::storage_key(&workspace.id, "folders"));
                self.dirty = false;
                self.last_save = Some(Instant::now());
                Some(workspace)
            }
            Err(_) => None,
        }
    }

    /// List stored workspace keys, hiding the restore mirror.
    pub fn list_workspaces(&self) -> StorageResult<Vec<String>> {
        let mut keys = self.storage.list()?;
        keys.retain(|k| k != LAST_WORKSPACE_KEY);
        Ok(keys)
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}
