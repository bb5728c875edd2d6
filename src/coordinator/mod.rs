// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Mirror coordinator.
//!
//! The [`Mirror`] ties the pipeline together: change events feed the
//! debounce coalescer, fired actions feed the single-consumer sync queue,
//! and the queue worker drives upserts through the resilient invoker while
//! owning the persistent identity mapping.
//!
//! # Lifecycle
//!
//! ```text
//! Running → Draining → Terminated
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use note_mirror::{Mirror, MirrorConfig, InMemoryDestination, NoteSnapshot};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = MirrorConfig::default();
//! let mirror = Mirror::new(config, Arc::new(InMemoryDestination::new()));
//! mirror.start().await.expect("start failed");
//!
//! mirror.on_change("note-1", NoteSnapshot::new("First line\nbody", vec![]));
//!
//! mirror.shutdown().await;
//! # }
//! ```

mod lifecycle;
pub(crate) mod types;

pub use types::MirrorState;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::MirrorConfig;
use crate::debounce::Coalescer;
use crate::destination::traits::DestinationApi;
use crate::note::NoteSnapshot;
use crate::queue::QueueWorker;
use crate::state::StateStore;

/// Main pipeline coordinator.
///
/// `Send + Sync`; the change-event listener, debounce timers, and the queue
/// worker run concurrently, but only the worker touches the shared sync
/// state.
pub struct Mirror {
    config: MirrorConfig,
    destination: Arc<dyn DestinationApi>,
    coalescer: Coalescer,
    state_tx: watch::Sender<MirrorState>,
    state_rx: watch::Receiver<MirrorState>,
    auth_expired: Arc<watch::Sender<bool>>,
    auth_rx: watch::Receiver<bool>,
    /// Worker not yet spawned (before `start`).
    pending_worker: Mutex<Option<QueueWorker>>,
    /// Worker task (after `start`).
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Mirror {
    /// Create a mirror over the given destination. Call
    /// [`start()`](Self::start) to begin processing.
    pub fn new(config: MirrorConfig, destination: Arc<dyn DestinationApi>) -> Self {
        let (state_tx, state_rx) = watch::channel(MirrorState::Running);
        let (auth_tx, auth_rx) = watch::channel(false);
        let auth_tx = Arc::new(auth_tx);
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = QueueWorker::new(
            rx,
            destination.clone(),
            StateStore::new(&config.state_path),
            &config,
            state_rx.clone(),
            auth_tx.clone(),
        );
        let coalescer = Coalescer::new(config.debounce_delay(), tx);

        Self {
            config,
            destination,
            coalescer,
            state_tx,
            state_rx,
            auth_expired: auth_tx,
            auth_rx,
            pending_worker: Mutex::new(Some(worker)),
            worker: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> MirrorState {
        *self.state_rx.borrow()
    }

    /// Receiver to watch lifecycle transitions.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<MirrorState> {
        self.state_rx.clone()
    }

    /// Whether change events are currently accepted.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == MirrorState::Running
    }

    /// Number of armed debounce timers.
    #[must_use]
    pub fn armed_timers(&self) -> usize {
        self.coalescer.armed_len()
    }

    /// Receiver flipping to `true` once credentials have expired and need
    /// renewal; the embedding process reconnects and builds a fresh mirror.
    #[must_use]
    pub fn auth_expired_receiver(&self) -> watch::Receiver<bool> {
        self.auth_rx.clone()
    }

    /// Change-event entry point, called by the realtime listener.
    pub fn on_change(&self, identity: impl Into<String>, snapshot: NoteSnapshot) {
        let identity = identity.into();
        if !self.is_running() {
            debug!(id = %identity, state = %self.state(), "Dropping change event, mirror not running");
            return;
        }
        self.coalescer.on_change(identity, snapshot);
    }

    /// Auth-loss entry point, called by the realtime listener when the
    /// session is no longer authorized.
    pub fn on_unauthorized(&self) {
        warn!("Session unauthorized, escalating for credential renewal");
        let _ = self.auth_expired.send(true);
    }
}
