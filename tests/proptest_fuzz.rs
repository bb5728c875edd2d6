//! Property-based tests for the formatter and the persisted state format.
//!
//! The formatter is the one component fed raw, arbitrary user text, so it
//! gets the fuzzing budget: multi-byte characters, blank bodies, pathological
//! limits. State serialization is round-tripped and fed garbage bytes.

use proptest::prelude::*;

use note_mirror::{
    chunk_content, extract_title, format_record, truncate_chars, FormatLimits, NoteSnapshot,
    SyncState, DEFAULT_TITLE, TRUNCATION_MARKER,
};

proptest! {
    #[test]
    fn prop_chunk_count_never_exceeds_cap(
        content in ".*",
        chunk_size in 1usize..64,
        max_chunks in 1usize..16,
    ) {
        let chunks = chunk_content(&content, chunk_size, max_chunks);
        prop_assert!(chunks.len() <= max_chunks);
    }

    #[test]
    fn prop_every_chunk_fits_and_splits_no_char(
        content in ".*",
        chunk_size in 1usize..64,
    ) {
        for chunk in chunk_content(&content, chunk_size, usize::MAX) {
            prop_assert!(chunk.chars().count() <= chunk_size);
            // A chunk that split a char would not be valid UTF-8; holding a
            // String at all proves the boundary was respected. Check anyway
            // that it is a substring of the original.
            prop_assert!(content.contains(&chunk));
        }
    }

    #[test]
    fn prop_chunks_rejoin_to_content_when_uncapped(
        content in ".*",
        chunk_size in 1usize..64,
    ) {
        let rejoined: String = chunk_content(&content, chunk_size, usize::MAX).concat();
        prop_assert_eq!(rejoined, content);
    }

    #[test]
    fn prop_overflow_is_marked(
        content in "[a-z]{200,400}",
        chunk_size in 1usize..8,
        max_chunks in 1usize..8,
    ) {
        let total_chars = content.chars().count();
        let chunks = chunk_content(&content, chunk_size, max_chunks);
        if total_chars > chunk_size * max_chunks {
            prop_assert_eq!(chunks.len(), max_chunks);
            let last = chunks.last().unwrap();
            prop_assert_eq!(last.chars().last(), Some(TRUNCATION_MARKER));
            prop_assert!(last.chars().count() <= chunk_size);
        }
    }

    #[test]
    fn prop_title_bounded_for_non_blank_content(
        first_line in "[^\\s][^\n]{0,200}",
        rest in ".*",
        max_chars in 1usize..120,
    ) {
        let content = format!("{first_line}\n{rest}");
        let title = extract_title(&content, max_chars);
        prop_assert!(title.chars().count() <= max_chars);
        prop_assert!(!title.is_empty());
    }

    #[test]
    fn prop_blank_content_falls_back_to_default_title(
        blanks in "[ \t\n]{0,40}",
        max_chars in 1usize..120,
    ) {
        prop_assert_eq!(extract_title(&blanks, max_chars), DEFAULT_TITLE);
    }

    #[test]
    fn prop_truncate_is_a_char_prefix(s in ".*", max_chars in 0usize..100) {
        let out = truncate_chars(&s, max_chars);
        prop_assert!(out.chars().count() <= max_chars);
        prop_assert!(s.starts_with(&out));
    }

    #[test]
    fn prop_format_record_never_panics_and_tags_are_never_empty(
        identity in "[a-zA-Z0-9-]{1,32}",
        content in ".*",
        tags in proptest::collection::vec(".*", 0..8),
        tags_enabled in any::<bool>(),
    ) {
        let snapshot = NoteSnapshot::new(content, tags.clone());
        let limits = FormatLimits { tags_enabled, ..Default::default() };
        let record = format_record(&identity, &snapshot, &limits);

        prop_assert_eq!(&record.source_identity, &identity);
        match &record.tags {
            Some(t) => {
                prop_assert!(tags_enabled);
                prop_assert!(!t.is_empty());
                for tag in t {
                    prop_assert!(tag.chars().count() <= limits.tag_max_chars);
                }
            }
            None => prop_assert!(!tags_enabled || tags.is_empty()),
        }
    }

    #[test]
    fn prop_state_round_trips_through_json(
        ids in proptest::collection::hash_map("[a-z0-9-]{1,16}", "[a-z0-9-]{1,16}", 0..16),
        edits in proptest::collection::hash_map("[a-z0-9-]{1,16}", any::<i64>(), 0..16),
    ) {
        let state = SyncState {
            destination_ids: ids,
            last_known_edit: edits,
        };
        let bytes = serde_json::to_vec(&state).unwrap();
        let back: SyncState = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(back.destination_ids, state.destination_ids);
        prop_assert_eq!(back.last_known_edit, state.last_known_edit);
    }

    #[test]
    fn prop_state_parser_never_panics_on_garbage(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        // Corrupt state files are handled by falling back to default; the
        // parse itself must only ever return Err, never panic.
        let _ = serde_json::from_slice::<SyncState>(&bytes);
    }
}

#[test]
fn snapshot_deserializes_with_missing_fields() {
    let snap: NoteSnapshot = serde_json::from_str(r#"{"content":"hi"}"#).unwrap();
    assert_eq!(snap.content, "hi");
    assert!(snap.tags.is_empty());
    assert!(!snap.deleted);
    assert!(snap.updated_at.is_none());

    let empty: NoteSnapshot = serde_json::from_str("{}").unwrap();
    assert_eq!(empty.content, "");
}
