//! # Note Mirror
//!
//! A change-ingestion and reconciliation pipeline that mirrors notes from a
//! realtime note-sync service into a structured document database, keeping a
//! persistent identity mapping so repeated runs update existing records
//! instead of duplicating them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Change Event Source                       │
//! │  • Realtime (identity, snapshot) events                     │
//! │  • External: wired in via on_change / on_unauthorized       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Debounce Coalescer                        │
//! │  • Per-identity cancel-and-replace timers                   │
//! │  • Collapses edit bursts to one action (latest snapshot)    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Sync Work Queue                          │
//! │  • Strict FIFO, single in-flight action                     │
//! │  • State persisted after every action                       │
//! │  • Fixed inter-action pause (rate-limit safety)             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Resilient API Invoker                      │
//! │  • Bounded, classification-aware retry                      │
//! │  • Upsert: update by mapped id, create-fallback when stale  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use note_mirror::{Mirror, MirrorConfig, InMemoryDestination, NoteSnapshot};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = MirrorConfig {
//!         parent_ref: "page-root".into(),
//!         state_path: "./state.json".into(),
//!         ..Default::default()
//!     };
//!
//!     let mirror = Mirror::new(config, Arc::new(InMemoryDestination::new()));
//!     mirror.start().await.expect("Failed to start");
//!
//!     // The realtime listener calls this for every note change
//!     mirror.on_change("note-1", NoteSnapshot::new("Title\nbody", vec!["tag".into()]));
//!
//!     // Drain the queue and persist state before exit
//!     mirror.shutdown().await;
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **At-least-once**: every change is eventually reflected downstream,
//!   possibly via a redundant no-op write; work is only lost by explicit
//!   retry exhaustion (logged and counted as a dead letter).
//! - **Idempotent upsert**: one destination record per identity, healed by a
//!   create-fallback when the mapped record was deleted externally.
//! - **Crash safety**: state is persisted after every completed action;
//!   reload reflects all completed work.
//!
//! ## Modules
//!
//! - [`coordinator`]: The [`Mirror`] orchestrating all components
//! - [`debounce`]: Per-identity trailing-edge debounce
//! - [`queue`]: FIFO worker and the upsert protocol
//! - [`resilience`]: Bounded classification-aware retry
//! - [`formatter`]: Pure snapshot-to-properties transform
//! - [`state`]: Durable identity mapping
//! - [`destination`]: Downstream API seam

pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod destination;
pub mod formatter;
pub mod metrics;
pub mod note;
pub mod queue;
pub mod resilience;
pub mod state;

pub use config::MirrorConfig;
pub use coordinator::{Mirror, MirrorState};
pub use debounce::Coalescer;
pub use destination::{ApiError, DestinationApi, InMemoryDestination, SchemaInfo};
pub use formatter::{
    chunk_content, extract_title, format_record, truncate_chars, FormatLimits, RecordProperties,
    DEFAULT_TITLE, TRUNCATION_MARKER,
};
pub use note::{NoteSnapshot, SyncAction};
pub use queue::ActionOutcome;
pub use resilience::{invoke, InvokerConfig};
pub use state::{StateError, StateStore, SyncState};
