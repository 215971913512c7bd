//! Sync-state persistence.
//!
//! Provides the [`SyncStore`] trait and its implementations:
//! - [`FileSyncStore`]: remembers the toggle in a JSON file
//! - [`NullSyncStore`]: no-op store (always returns `None`)
//!
//! # File Format
//!
//! ```json
//! {"enabled": false}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct StoredSyncState {
    enabled: bool,
}

/// Storage for the synchronization toggle.
///
/// Persistence is best effort: failures are logged and ignored.
pub trait SyncStore {
    /// Stored state, or `None` if nothing (valid) was stored.
    fn get(&self) -> Option<bool>;

    /// Store the state.
    fn set(&self, enabled: bool);
}

/// No-op store used when persistence is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSyncStore;

impl SyncStore for NullSyncStore {
    fn get(&self) -> Option<bool> {
        None
    }

    fn set(&self, _enabled: bool) {}
}

/// File-based store.
///
/// Stores the state as JSON in `{state_dir}/sync.json`.
#[derive(Debug, Clone)]
pub struct FileSyncStore {
    state_dir: PathBuf,
}

impl FileSyncStore {
    /// Create a store writing into `state_dir`.
    #[must_use]
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Directory holding the state file.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn state_path(&self) -> PathBuf {
        self.state_dir.join("sync.json")
    }
}

impl SyncStore for FileSyncStore {
    fn get(&self) -> Option<bool> {
        let state_path = self.state_path();
        if !state_path.exists() {
            return None;
        }

        let content = fs::read_to_string(&state_path).ok()?;
        let stored: StoredSyncState = serde_json::from_str(&content).ok()?;
        Some(stored.enabled)
    }

    fn set(&self, enabled: bool) {
        if let Err(e) = fs::create_dir_all(&self.state_dir) {
            tracing::debug!(error = %e, "Failed to create state directory");
            return;
        }

        let content = match serde_json::to_string(&StoredSyncState { enabled }) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to serialize sync state");
                return;
            }
        };

        if let Err(e) = fs::write(self.state_path(), content) {
            tracing::debug!(error = %e, "Failed to write sync state");
        }
    }
}
