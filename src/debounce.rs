// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-identity debounce coalescing of change events.
//!
//! Rapid repeated edits to one note produce a burst of change events; the
//! [`Coalescer`] collapses each burst into a single [`SyncAction`] carrying
//! the latest snapshot. Every event cancels and replaces the armed timer for
//! its identity (trailing-edge debounce, no minimum spacing once armed).
//!
//! Timers are scheduled tasks in an explicit per-identity table, not
//! fire-and-forget: re-arming aborts the previous task, and shutdown aborts
//! them all. The table is in-memory only; a restart loses in-flight windows
//! and relies on the change source redelivering after reconnect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::note::{NoteSnapshot, SyncAction};

struct TimerSlot {
    arm_id: u64,
    handle: JoinHandle<()>,
}

/// Collapses bursts of change events into single sync actions.
pub struct Coalescer {
    delay: Duration,
    timers: Arc<DashMap<String, TimerSlot>>,
    tx: mpsc::UnboundedSender<SyncAction>,
    next_arm: AtomicU64,
}

impl Coalescer {
    /// Create a coalescer feeding actions into `tx` after `delay` of quiet.
    pub fn new(delay: Duration, tx: mpsc::UnboundedSender<SyncAction>) -> Self {
        Self {
            delay,
            timers: Arc::new(DashMap::new()),
            tx,
            next_arm: AtomicU64::new(0),
        }
    }

    /// Handle one change event: cancel any armed timer for the identity and
    /// arm a new one with this snapshot.
    ///
    /// Deleted-record snapshots are dropped silently and also cancel the
    /// armed timer, so a pre-delete snapshot is not synced after the note
    /// is gone.
    pub fn on_change(&self, identity: impl Into<String>, snapshot: NoteSnapshot) {
        let identity = identity.into();

        if snapshot.deleted {
            if let Some((_, slot)) = self.timers.remove(&identity) {
                slot.handle.abort();
                debug!(id = %identity, "Deleted note cancelled armed debounce timer");
            }
            crate::metrics::record_deleted_dropped();
            crate::metrics::set_armed_timers(self.timers.len());
            return;
        }

        if let Some((_, old)) = self.timers.remove(&identity) {
            old.handle.abort();
            crate::metrics::record_coalesced();
            trace!(id = %identity, "Change event coalesced, timer re-armed");
        }

        let arm_id = self.next_arm.fetch_add(1, Ordering::Relaxed);
        let timers = self.timers.clone();
        let tx = self.tx.clone();
        let delay = self.delay;
        let task_identity = identity.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Clear only our own slot; a re-arm may already have replaced it
            timers.remove_if(&task_identity, |_, slot| slot.arm_id == arm_id);
            crate::metrics::set_armed_timers(timers.len());
            debug!(id = %task_identity, "Debounce window closed, enqueueing sync action");
            // Count the fire only if the queue is still there to receive it
            if tx.send(SyncAction::new(task_identity, snapshot)).is_ok() {
                crate::metrics::record_debounce_fired();
            }
        });

        self.timers.insert(identity, TimerSlot { arm_id, handle });
        crate::metrics::set_armed_timers(self.timers.len());
    }

    /// Number of currently armed timers.
    #[must_use]
    pub fn armed_len(&self) -> usize {
        self.timers.len()
    }

    /// Abort all armed timers (shutdown). Lost windows are redelivered by
    /// the change source on the next connect.
    pub fn abort_all(&self) {
        let before = self.timers.len();
        self.timers.retain(|_, slot| {
            slot.handle.abort();
            false
        });
        if before > 0 {
            debug!(aborted = before, "Aborted armed debounce timers");
        }
        crate::metrics::set_armed_timers(0);
    }
}
