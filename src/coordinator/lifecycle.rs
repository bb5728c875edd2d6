//! Mirror lifecycle: start, drain, shutdown.

use tracing::{info, warn};

use crate::destination::traits::{ApiError, SchemaInfo};
use crate::resilience::invoker::invoke;

use super::{Mirror, MirrorState};

impl Mirror {
    /// Start processing: spawn the queue worker and discover the destination
    /// schema (title property) when a database reference is configured.
    ///
    /// Idempotent for the worker; a second call spawns nothing and only
    /// re-queries the schema.
    pub async fn start(&self) -> Result<SchemaInfo, ApiError> {
        if let Some(worker) = self.pending_worker.lock().take() {
            let handle = tokio::spawn(worker.run());
            *self.worker.lock() = Some(handle);
            info!("Mirror started, queue worker spawned");
        }

        if self.config.database_ref.is_empty() {
            return Ok(SchemaInfo {
                title_property: self.config.title_property.clone(),
            });
        }

        let invoker = self.config.invoker();
        let destination = &self.destination;
        let database_ref = &self.config.database_ref;
        let schema = invoke("get_schema", &invoker, || destination.get_schema(database_ref)).await?;
        info!(title_property = %schema.title_property, "Destination schema resolved");
        Ok(schema)
    }

    /// Graceful shutdown: stop accepting events, abort armed debounce
    /// timers, and wait for the queue to drain.
    ///
    /// A hard timeout bounds shutdown latency; work still queued at that
    /// point is lost and will be re-synced by the next change event for the
    /// affected identities. State was persisted after every completed
    /// action, so nothing completed is lost either way.
    pub async fn shutdown(&self) {
        info!("Initiating mirror shutdown...");
        let _ = self.state_tx.send(MirrorState::Draining);
        self.coalescer.abort_all();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let abort = handle.abort_handle();
            match tokio::time::timeout(self.config.shutdown_timeout(), handle).await {
                Ok(_) => info!("Queue drained"),
                Err(_) => {
                    warn!(
                        timeout_secs = self.config.shutdown_timeout_secs,
                        "Shutdown hard timeout reached, aborting queue worker"
                    );
                    abort.abort();
                }
            }
        }

        let _ = self.state_tx.send(MirrorState::Terminated);
        info!("Mirror shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::MirrorConfig;
    use crate::coordinator::{Mirror, MirrorState};
    use crate::destination::memory::InMemoryDestination;
    use crate::note::NoteSnapshot;

    fn unique_state_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!(
                "note_mirror_lifecycle_{}_{}.json",
                name,
                std::process::id()
            ))
            .to_string_lossy()
            .into_owned()
    }

    fn fast_config(name: &str) -> MirrorConfig {
        MirrorConfig {
            debounce_ms: 10,
            queue_pause_ms: 1,
            state_path: unique_state_path(name),
            parent_ref: "parent".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_starts_running_and_terminates() {
        let config = fast_config("terminate");
        let path = config.state_path.clone();
        let mirror = Mirror::new(config, Arc::new(InMemoryDestination::new()));

        assert_eq!(mirror.state(), MirrorState::Running);
        mirror.start().await.unwrap();

        mirror.shutdown().await;
        assert_eq!(mirror.state(), MirrorState::Terminated);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_second_start_spawns_no_second_worker() {
        let mut config = fast_config("double_start");
        config.database_ref = "db-1".into();
        let path = config.state_path.clone();
        let dest = Arc::new(InMemoryDestination::new());
        let mirror = Mirror::new(config, dest.clone());

        let first = mirror.start().await.unwrap();
        let second = mirror.start().await.unwrap();
        assert_eq!(first, second);

        // The single worker still processes and drains normally
        mirror.on_change("note-1", NoteSnapshot::new("once", vec![]));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        mirror.shutdown().await;

        assert_eq!(dest.creates(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_start_without_database_ref_uses_configured_title() {
        let config = fast_config("schema_default");
        let path = config.state_path.clone();
        let mirror = Mirror::new(config, Arc::new(InMemoryDestination::new()));

        let schema = mirror.start().await.unwrap();
        assert_eq!(schema.title_property, "Name");

        mirror.shutdown().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_start_with_database_ref_queries_schema() {
        let mut config = fast_config("schema_query");
        config.database_ref = "db-1".into();
        let path = config.state_path.clone();
        let mirror = Mirror::new(config, Arc::new(InMemoryDestination::new()));

        let schema = mirror.start().await.unwrap();
        assert_eq!(schema.title_property, "Name");

        mirror.shutdown().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_events_dropped_after_shutdown() {
        let config = fast_config("post_shutdown");
        let path = config.state_path.clone();
        let dest = Arc::new(InMemoryDestination::new());
        let mirror = Mirror::new(config, dest.clone());
        mirror.start().await.unwrap();
        mirror.shutdown().await;

        mirror.on_change("note-1", NoteSnapshot::new("late", vec![]));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(mirror.armed_timers(), 0);
        assert!(dest.is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_on_unauthorized_flips_auth_flag() {
        let config = fast_config("auth");
        let path = config.state_path.clone();
        let mirror = Mirror::new(config, Arc::new(InMemoryDestination::new()));

        let auth_rx = mirror.auth_expired_receiver();
        assert!(!*auth_rx.borrow());

        mirror.on_unauthorized();
        assert!(*auth_rx.borrow());

        mirror.shutdown().await;
        let _ = std::fs::remove_file(&path);
    }
}
