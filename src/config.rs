//! Configuration for the mirror pipeline.
//!
//! # Example
//!
//! ```
//! use note_mirror::MirrorConfig;
//!
//! // Minimal config (uses defaults)
//! let config = MirrorConfig::default();
//! assert_eq!(config.debounce_ms, 3000);
//! assert_eq!(config.max_attempts, 5);
//!
//! // Full config
//! let config = MirrorConfig {
//!     parent_ref: "page-root".into(),
//!     database_ref: "db-notes".into(),
//!     state_path: "/var/lib/note-mirror/state.json".into(),
//!     debounce_ms: 1000,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;
use std::time::Duration;

use crate::formatter::FormatLimits;
use crate::resilience::invoker::InvokerConfig;

/// Configuration for the mirror pipeline.
///
/// All fields have sensible defaults. At minimum, you should configure
/// `parent_ref` and `database_ref` for production use.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Debounce delay per identity in milliseconds (default: 3000)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Pause between queue actions in milliseconds (default: 500)
    #[serde(default = "default_queue_pause_ms")]
    pub queue_pause_ms: u64,

    /// Maximum attempts per downstream call (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Base backoff for rate-limited calls without a server-provided
    /// interval, in milliseconds; doubles per attempt (default: 500)
    #[serde(default = "default_rate_limit_base_ms")]
    pub rate_limit_base_ms: u64,

    /// Backoff cap for rate-limited calls in milliseconds (default: 30000)
    #[serde(default = "default_rate_limit_max_ms")]
    pub rate_limit_max_ms: u64,

    /// Fixed wait before retrying a transient failure, in milliseconds
    /// (default: 1000)
    #[serde(default = "default_transient_delay_ms")]
    pub transient_delay_ms: u64,

    /// Hard cap on graceful shutdown in seconds (default: 10)
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Path to the durable sync-state file
    #[serde(default = "default_state_path")]
    pub state_path: String,

    /// Destination parent reference for created records
    #[serde(default)]
    pub parent_ref: String,

    /// Destination database reference (schema discovery)
    #[serde(default)]
    pub database_ref: String,

    /// Name of the destination title property (default: "Name")
    #[serde(default = "default_title_property")]
    pub title_property: String,

    /// Name of the destination tags property; when unset, tags are never
    /// written
    #[serde(default)]
    pub tags_property: Option<String>,

    /// Title truncation limit in characters (default: 80)
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    /// Body chunk size in characters (default: 1800)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Maximum body chunks per record (default: 100)
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    /// Tag label truncation limit in characters (default: 50)
    #[serde(default = "default_tag_max_chars")]
    pub tag_max_chars: usize,
}

fn default_debounce_ms() -> u64 { 3000 }
fn default_queue_pause_ms() -> u64 { 500 }
fn default_max_attempts() -> usize { 5 }
fn default_rate_limit_base_ms() -> u64 { 500 }
fn default_rate_limit_max_ms() -> u64 { 30_000 }
fn default_transient_delay_ms() -> u64 { 1000 }
fn default_shutdown_timeout_secs() -> u64 { 10 }
fn default_state_path() -> String { "./note_mirror_state.json".to_string() }
fn default_title_property() -> String { "Name".to_string() }
fn default_title_max_chars() -> usize { 80 }
fn default_chunk_size() -> usize { 1800 }
fn default_max_chunks() -> usize { 100 }
fn default_tag_max_chars() -> usize { 50 }

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            queue_pause_ms: default_queue_pause_ms(),
            max_attempts: default_max_attempts(),
            rate_limit_base_ms: default_rate_limit_base_ms(),
            rate_limit_max_ms: default_rate_limit_max_ms(),
            transient_delay_ms: default_transient_delay_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            state_path: default_state_path(),
            parent_ref: String::new(),
            database_ref: String::new(),
            title_property: default_title_property(),
            tags_property: None,
            title_max_chars: default_title_max_chars(),
            chunk_size: default_chunk_size(),
            max_chunks: default_max_chunks(),
            tag_max_chars: default_tag_max_chars(),
        }
    }
}

impl MirrorConfig {
    /// Debounce delay as a [`Duration`].
    #[must_use]
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Inter-action queue pause as a [`Duration`].
    #[must_use]
    pub fn queue_pause(&self) -> Duration {
        Duration::from_millis(self.queue_pause_ms)
    }

    /// Hard shutdown cap as a [`Duration`].
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Invoker retry settings derived from this config.
    #[must_use]
    pub fn invoker(&self) -> InvokerConfig {
        InvokerConfig {
            max_attempts: self.max_attempts,
            rate_limit_base: Duration::from_millis(self.rate_limit_base_ms),
            rate_limit_max: Duration::from_millis(self.rate_limit_max_ms),
            transient_delay: Duration::from_millis(self.transient_delay_ms),
        }
    }

    /// Formatter limits derived from this config.
    #[must_use]
    pub fn format_limits(&self) -> FormatLimits {
        FormatLimits {
            title_max_chars: self.title_max_chars,
            chunk_size: self.chunk_size,
            max_chunks: self.max_chunks,
            tag_max_chars: self.tag_max_chars,
            tags_enabled: self.tags_property.is_some(),
        }
    }
}
