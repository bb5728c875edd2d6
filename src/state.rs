//! Durable sync state: identity to destination-record mapping.
//!
//! The state file is the memory that makes repeated runs update existing
//! destination records instead of duplicating them. It is persisted as a
//! whole after every completed queue action and on shutdown, and reloaded
//! on startup.
//!
//! A missing or unreadable file never fails the pipeline: [`StateStore::load`]
//! falls back to the empty initial state and the upsert fallback recreates
//! any destination records whose mappings were lost.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from persisting sync state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The persisted mapping from source identity to destination record.
///
/// Invariant: every key in `destination_ids` implies a destination record
/// previously existed. Absence does not imply non-existence; a lost write is
/// healed by the upsert create-fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Source identity -> destination record id.
    #[serde(default)]
    pub destination_ids: HashMap<String, String>,
    /// Source identity -> last known edit (epoch millis). Optional
    /// bookkeeping retained for forward compatibility, not required for
    /// correctness.
    #[serde(default)]
    pub last_known_edit: HashMap<String, i64>,
}

impl SyncState {
    /// Number of mapped identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.destination_ids.len()
    }

    /// Whether any identity is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destination_ids.is_empty()
    }
}

/// Whole-file JSON persistence for [`SyncState`].
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state from disk.
    ///
    /// Never fails hard: a missing file yields the empty initial state, and
    /// an unreadable or corrupt file does the same with a warning. The
    /// create-fallback in the upsert protocol makes this safe.
    pub async fn load(&self) -> SyncState {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No prior state file, starting empty");
                return SyncState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read state file, starting empty");
                return SyncState::default();
            }
        };

        match serde_json::from_slice::<SyncState>(&bytes) {
            Ok(state) => {
                info!(path = %self.path.display(), mapped = state.len(), "Loaded sync state");
                state
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "State file corrupt, starting empty");
                SyncState::default()
            }
        }
    }

    /// Persist the full state atomically-enough: write a sibling temp file,
    /// then rename it into place. Must complete before the calling action is
    /// considered finished.
    pub async fn save(&self, state: &SyncState) -> Result<(), StateError> {
        let bytes = serde_json::to_vec_pretty(state)?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        crate::metrics::record_state_save(bytes.len());
        debug!(path = %self.path.display(), mapped = state.len(), "Sync state persisted");
        Ok(())
    }
}
