//! The sync work queue: single-consumer FIFO driving the upsert protocol.
//!
//! One worker task owns the [`SyncState`] and executes actions strictly in
//! enqueue order, one at a time - an explicit trade-off favoring downstream
//! rate-limit safety over throughput. After every action (success or terminal
//! failure) the state is persisted and the worker pauses for a fixed
//! inter-action delay, throttling aggregate request rate independent of
//! per-call retry.
//!
//! A terminally failed action is logged, counted as a dead letter, and
//! dropped; the next edit to that note re-triggers sync naturally.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::MirrorConfig;
use crate::coordinator::types::MirrorState;
use crate::destination::traits::{ApiError, DestinationApi};
use crate::formatter::{format_record, FormatLimits};
use crate::note::SyncAction;
use crate::resilience::invoker::{invoke, InvokerConfig};
use crate::state::{StateStore, SyncState};

/// How one sync action resolved against the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// First sync for this identity; a record was created and mapped.
    Created,
    /// Existing mapping updated in place.
    Updated,
    /// Mapped record was gone downstream; a fresh one was created and the
    /// mapping repaired.
    Recreated,
}

impl ActionOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Recreated => "recreated",
        }
    }
}

impl std::fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single queue consumer. Owns the sync state for its whole lifetime.
pub(crate) struct QueueWorker {
    rx: mpsc::UnboundedReceiver<SyncAction>,
    destination: Arc<dyn DestinationApi>,
    store: StateStore,
    state: SyncState,
    invoker: InvokerConfig,
    limits: FormatLimits,
    parent_ref: String,
    pause: Duration,
    lifecycle: watch::Receiver<MirrorState>,
    auth_expired: Arc<watch::Sender<bool>>,
}

impl QueueWorker {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<SyncAction>,
        destination: Arc<dyn DestinationApi>,
        store: StateStore,
        config: &MirrorConfig,
        lifecycle: watch::Receiver<MirrorState>,
        auth_expired: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            rx,
            destination,
            store,
            state: SyncState::default(),
            invoker: config.invoker(),
            limits: config.format_limits(),
            parent_ref: config.parent_ref.clone(),
            pause: config.queue_pause(),
            lifecycle,
            auth_expired,
        }
    }

    fn draining(&self) -> bool {
        *self.lifecycle.borrow() != MirrorState::Running
    }

    /// Run until drained-and-draining, or until all senders are dropped.
    pub(crate) async fn run(mut self) {
        self.state = self.store.load().await;
        info!(mapped = self.state.len(), "Queue worker started");

        loop {
            if self.draining() && self.rx.is_empty() {
                break;
            }

            let action = tokio::select! {
                maybe = self.rx.recv() => match maybe {
                    Some(action) => action,
                    None => break,
                },
                changed = self.lifecycle.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };

            self.execute(action).await;
            if let Err(e) = self.store.save(&self.state).await {
                // A lost mapping is healed by the create-fallback on a later sync
                error!(error = %e, "Failed to persist sync state");
            }
            crate::metrics::set_queue_depth(self.rx.len());

            if self.draining() && self.rx.is_empty() {
                break;
            }
            sleep(self.pause).await;
        }

        if let Err(e) = self.store.save(&self.state).await {
            error!(error = %e, "Failed to persist sync state on exit");
        }
        info!(mapped = self.state.len(), "Queue worker stopped");
    }

    /// Execute one action, absorbing its failure at the action boundary so a
    /// bad action cannot halt the queue.
    async fn execute(&mut self, action: SyncAction) {
        let started = Instant::now();
        match self.sync_action(&action).await {
            Ok(outcome) => {
                info!(id = %action.identity, outcome = %outcome, "Sync action completed");
                crate::metrics::record_action(outcome.as_str());
            }
            Err(err) => {
                if matches!(err, ApiError::AuthExpired) {
                    let _ = self.auth_expired.send(true);
                }
                error!(
                    id = %action.identity,
                    class = err.class(),
                    error = %err,
                    "Sync action failed terminally, dropping"
                );
                crate::metrics::record_dead_letter(err.class());
            }
        }
        crate::metrics::record_action_duration(started.elapsed());
    }

    /// The upsert protocol: update by mapped id, falling back to create when
    /// the mapping is missing or stale.
    async fn sync_action(&mut self, action: &SyncAction) -> Result<ActionOutcome, ApiError> {
        let properties = format_record(&action.identity, &action.snapshot, &self.limits);
        let destination = &self.destination;
        let mapped = self.state.destination_ids.get(&action.identity).cloned();

        let mut recreating = false;
        if let Some(dest_id) = mapped {
            match invoke("update_record", &self.invoker, || {
                destination.update_record(&dest_id, &properties)
            })
            .await
            {
                Ok(()) => {
                    self.touch(action);
                    return Ok(ActionOutcome::Updated);
                }
                Err(ApiError::NotFoundStale) => {
                    warn!(
                        id = %action.identity,
                        destination_id = %dest_id,
                        "Mapped destination record is gone, recreating"
                    );
                    recreating = true;
                }
                Err(err) => return Err(err),
            }
        }

        let new_id = invoke("create_record", &self.invoker, || {
            destination.create_record(&self.parent_ref, &properties)
        })
        .await?;
        self.state.destination_ids.insert(action.identity.clone(), new_id);
        self.touch(action);

        Ok(if recreating {
            ActionOutcome::Recreated
        } else {
            ActionOutcome::Created
        })
    }

    fn touch(&mut self, action: &SyncAction) {
        let edited = action
            .snapshot
            .updated_at
            .unwrap_or_else(crate::note::now_millis);
        self.state.last_known_edit.insert(action.identity.clone(), edited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::memory::InMemoryDestination;
    use crate::note::NoteSnapshot;

    fn test_config() -> MirrorConfig {
        MirrorConfig {
            queue_pause_ms: 1,
            rate_limit_base_ms: 1,
            transient_delay_ms: 1,
            parent_ref: "parent".into(),
            ..Default::default()
        }
    }

    fn unique_state_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "note_mirror_queue_{}_{}.json",
            name,
            std::process::id()
        ))
    }

    fn worker_with(
        destination: Arc<InMemoryDestination>,
        state_path: &std::path::Path,
    ) -> (QueueWorker, mpsc::UnboundedSender<SyncAction>, watch::Sender<MirrorState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (lifecycle_tx, lifecycle_rx) = watch::channel(MirrorState::Running);
        let (auth_tx, _auth_rx) = watch::channel(false);

        let worker = QueueWorker::new(
            rx,
            destination,
            StateStore::new(state_path),
            &test_config(),
            lifecycle_rx,
            Arc::new(auth_tx),
        );
        (worker, tx, lifecycle_tx)
    }

    fn action(identity: &str, body: &str) -> SyncAction {
        SyncAction::new(identity, NoteSnapshot::new(body, vec![]))
    }

    #[tokio::test]
    async fn test_first_sync_creates_and_maps() {
        let dest = Arc::new(InMemoryDestination::new());
        let path = unique_state_path("create");
        let (mut worker, _tx, _lc) = worker_with(dest.clone(), &path);

        let outcome = worker.sync_action(&action("note-1", "hello")).await.unwrap();

        assert_eq!(outcome, ActionOutcome::Created);
        assert_eq!(dest.len(), 1);
        assert!(worker.state.destination_ids.contains_key("note-1"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_second_sync_updates_not_creates() {
        let dest = Arc::new(InMemoryDestination::new());
        let path = unique_state_path("update");
        let (mut worker, _tx, _lc) = worker_with(dest.clone(), &path);

        worker.sync_action(&action("note-1", "v1")).await.unwrap();
        let outcome = worker.sync_action(&action("note-1", "v2")).await.unwrap();

        assert_eq!(outcome, ActionOutcome::Updated);
        assert_eq!(dest.creates(), 1);
        assert_eq!(dest.updates(), 1);
        assert_eq!(dest.len(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_stale_mapping_recreates_and_repairs() {
        let dest = Arc::new(InMemoryDestination::new());
        let path = unique_state_path("recreate");
        let (mut worker, _tx, _lc) = worker_with(dest.clone(), &path);

        worker.sync_action(&action("note-1", "v1")).await.unwrap();
        let old_id = worker.state.destination_ids["note-1"].clone();

        // External actor deletes the destination record
        assert!(dest.delete_record(&old_id));

        let outcome = worker.sync_action(&action("note-1", "v2")).await.unwrap();

        assert_eq!(outcome, ActionOutcome::Recreated);
        let new_id = worker.state.destination_ids["note-1"].clone();
        assert_ne!(new_id, old_id);
        assert_eq!(dest.get(&new_id).unwrap().title, "v2");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_worker_runs_fifo_and_exits_on_channel_close() {
        let dest = Arc::new(InMemoryDestination::new());
        let path = unique_state_path("fifo");
        let (worker, tx, _lc) = worker_with(dest.clone(), &path);

        for i in 0..3 {
            tx.send(action(&format!("note-{i}"), &format!("body {i}"))).unwrap();
        }
        drop(tx);

        worker.run().await;

        assert_eq!(dest.len(), 3);
        // State was persisted with all three mappings
        let state = StateStore::new(&path).load().await;
        assert_eq!(state.len(), 3);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_draining_empty_queue_exits_immediately() {
        let dest = Arc::new(InMemoryDestination::new());
        let path = unique_state_path("drain_empty");
        let (worker, _tx, lifecycle) = worker_with(dest, &path);

        let handle = tokio::spawn(worker.run());
        lifecycle.send(MirrorState::Draining).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker should exit once draining with empty queue")
            .unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_mapping_survives_worker_restart() {
        let dest = Arc::new(InMemoryDestination::new());
        let path = unique_state_path("restart");

        {
            let (worker, tx, _lc) = worker_with(dest.clone(), &path);
            tx.send(action("note-1", "v1")).unwrap();
            drop(tx);
            worker.run().await;
        }
        assert_eq!(dest.creates(), 1);

        // Second run with a fresh worker over the same state file
        {
            let (worker, tx, _lc) = worker_with(dest.clone(), &path);
            tx.send(action("note-1", "v2")).unwrap();
            drop(tx);
            worker.run().await;
        }

        // Idempotent: still one record, updated in place
        assert_eq!(dest.creates(), 1);
        assert_eq!(dest.updates(), 1);
        assert_eq!(dest.len(), 1);
        let _ = std::fs::remove_file(&path);
    }
}
