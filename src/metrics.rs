// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for note-mirror.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the embedding
//! process chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `note_mirror_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `outcome`: created, updated, recreated
//! - `class`: rate_limited, transient, permanent, not_found_stale, auth_expired
//! - `operation`: create_record, update_record, get_schema

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a completed sync action by outcome.
pub fn record_action(outcome: &str) {
    counter!(
        "note_mirror_actions_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record end-to-end latency of one sync action.
pub fn record_action_duration(duration: Duration) {
    histogram!("note_mirror_action_seconds").record(duration.as_secs_f64());
}

/// Record a terminally failed action (dropped after retry exhaustion).
pub fn record_dead_letter(class: &'static str) {
    counter!(
        "note_mirror_dead_letter_total",
        "class" => class
    )
    .increment(1);
}

/// Record one retry of a destination call.
pub fn record_retry(operation: &str, class: &'static str) {
    counter!(
        "note_mirror_retries_total",
        "operation" => operation.to_string(),
        "class" => class
    )
    .increment(1);
}

/// Record a change event coalesced into an already-armed window.
pub fn record_coalesced() {
    counter!("note_mirror_coalesced_events_total").increment(1);
}

/// Record a debounce window firing into the queue.
pub fn record_debounce_fired() {
    counter!("note_mirror_debounce_fired_total").increment(1);
}

/// Record a deleted-record event dropped by the coalescer.
pub fn record_deleted_dropped() {
    counter!("note_mirror_deleted_dropped_total").increment(1);
}

/// Set the current queue depth.
pub fn set_queue_depth(depth: usize) {
    gauge!("note_mirror_queue_depth").set(depth as f64);
}

/// Set the number of armed debounce timers.
pub fn set_armed_timers(count: usize) {
    gauge!("note_mirror_armed_timers").set(count as f64);
}

/// Record a state-file persist and its size.
pub fn record_state_save(bytes: usize) {
    counter!("note_mirror_state_saves_total").increment(1);
    gauge!("note_mirror_state_bytes").set(bytes as f64);
}
