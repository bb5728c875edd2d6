//! Note change-event payloads and queued work units.
//!
//! A [`NoteSnapshot`] is what the change event source delivers for a note;
//! a [`SyncAction`] is the deferred unit of work the debounce coalescer hands
//! to the sync queue once a burst of edits has quiesced.

use serde::{Deserialize, Serialize};

/// A point-in-time view of a source note.
///
/// # Example
///
/// ```
/// use note_mirror::NoteSnapshot;
///
/// let snap = NoteSnapshot::new("Shopping list\nmilk\neggs", vec!["home".into()]);
/// assert!(!snap.deleted);
/// assert_eq!(snap.tags.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSnapshot {
    /// Raw note body.
    pub content: String,
    /// Tag labels attached to the note.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the source note has been deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Last edit timestamp (epoch millis), when the source supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl NoteSnapshot {
    /// Create a live (non-deleted) snapshot.
    pub fn new(content: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            content: content.into(),
            tags,
            deleted: false,
            updated_at: Some(now_millis()),
        }
    }

    /// Create a deletion marker for a note.
    #[must_use]
    pub fn tombstone() -> Self {
        Self {
            content: String::new(),
            tags: Vec::new(),
            deleted: true,
            updated_at: Some(now_millis()),
        }
    }
}

/// Current time as epoch millis.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// A deferred unit of sync work bound to one record identity.
///
/// Carries the snapshot *as of the moment the debounce timer fired*, not
/// necessarily the latest edit. Executed exactly once by the queue worker,
/// then discarded.
#[derive(Debug, Clone)]
pub struct SyncAction {
    /// Opaque stable key for the source note.
    pub identity: String,
    /// The latest snapshot seen when the debounce window closed.
    pub snapshot: NoteSnapshot,
}

impl SyncAction {
    pub fn new(identity: impl Into<String>, snapshot: NoteSnapshot) -> Self {
        Self {
            identity: identity.into(),
            snapshot,
        }
    }
}
