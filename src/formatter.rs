// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Content formatting: note snapshot to destination property set.
//!
//! Pure transforms only - no I/O, no retry, no clock. The queue worker calls
//! [`format_record`] once per action and hands the result to the destination
//! API unchanged.
//!
//! # Example
//!
//! ```
//! use note_mirror::{format_record, FormatLimits, NoteSnapshot};
//!
//! let snap = NoteSnapshot::new("  \nMeeting notes\nagenda item one", vec![]);
//! let props = format_record("note-1", &snap, &FormatLimits::default());
//!
//! assert_eq!(props.title, "Meeting notes");
//! assert_eq!(props.source_identity, "note-1");
//! ```

use serde::Serialize;

use crate::note::NoteSnapshot;

/// Marker appended to the last retained chunk when body content was cut off.
pub const TRUNCATION_MARKER: char = '…';

/// Title used when a note body is empty or blank.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Limits applied while deriving a [`RecordProperties`] from a snapshot.
#[derive(Debug, Clone)]
pub struct FormatLimits {
    /// Title truncation limit in characters.
    pub title_max_chars: usize,
    /// Body chunk size in characters.
    pub chunk_size: usize,
    /// Maximum number of body chunks retained.
    pub max_chunks: usize,
    /// Tag label truncation limit in characters.
    pub tag_max_chars: usize,
    /// Whether a destination tag property is configured at all.
    pub tags_enabled: bool,
}

impl Default for FormatLimits {
    fn default() -> Self {
        Self {
            title_max_chars: 80,
            chunk_size: 1800,
            max_chunks: 100,
            tag_max_chars: 50,
            tags_enabled: true,
        }
    }
}

/// Destination property set derived from one snapshot.
///
/// `tags` is `None` both when the tag list is empty and when no tag property
/// is configured; the destination never receives an empty tag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordProperties {
    /// First non-blank line of the body, truncated.
    pub title: String,
    /// Ordered fixed-size body chunks.
    pub chunks: Vec<String>,
    /// Truncated tag labels, omitted when empty or unconfigured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Source record identity, embedded for reverse lookup and debugging.
    pub source_identity: String,
}

/// Derive the destination property set for one identity/snapshot pair.
#[must_use]
pub fn format_record(identity: &str, snapshot: &NoteSnapshot, limits: &FormatLimits) -> RecordProperties {
    let tags = if limits.tags_enabled && !snapshot.tags.is_empty() {
        Some(
            snapshot
                .tags
                .iter()
                .map(|t| truncate_chars(t, limits.tag_max_chars))
                .collect(),
        )
    } else {
        None
    };

    RecordProperties {
        title: extract_title(&snapshot.content, limits.title_max_chars),
        chunks: chunk_content(&snapshot.content, limits.chunk_size, limits.max_chunks),
        tags,
        source_identity: identity.to_string(),
    }
}

/// First line with non-whitespace content, trimmed and truncated.
/// Falls back to [`DEFAULT_TITLE`] for blank bodies.
#[must_use]
pub fn extract_title(content: &str, max_chars: usize) -> String {
    content
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| truncate_chars(line.trim(), max_chars))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// Split content into ordered chunks of at most `chunk_size` characters.
///
/// When the chunk count exceeds `max_chunks`, the list is cut to `max_chunks`
/// and the tail of the last retained chunk is replaced with
/// [`TRUNCATION_MARKER`] so the cut is visible downstream.
#[must_use]
pub fn chunk_content(content: &str, chunk_size: usize, max_chunks: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for ch in content.chars() {
        current.push(ch);
        current_len += 1;
        if current_len == chunk_size {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }
    if current_len > 0 {
        chunks.push(current);
    }

    if chunks.len() > max_chunks {
        chunks.truncate(max_chunks);
        if let Some(last) = chunks.last_mut() {
            last.pop();
            last.push(TRUNCATION_MARKER);
        }
    }

    chunks
}

/// Truncate to at most `max_chars` characters, never splitting a `char`.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}
