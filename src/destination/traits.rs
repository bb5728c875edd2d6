use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::formatter::RecordProperties;

/// Classified failure from the destination API.
///
/// The invoker retries `RateLimited` and `Transient`; everything else is
/// propagated immediately. `NotFoundStale` is special-cased by the upsert
/// protocol to trigger a create-fallback rather than a hard failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Destination throttled the call; retry after the server-provided
    /// interval when present, else with exponential backoff.
    #[error("rate limited by destination")]
    RateLimited { retry_after: Option<Duration> },
    /// Retryable failure (network blip, 5xx).
    #[error("transient destination error: {0}")]
    Transient(String),
    /// Not retried (malformed payload, rejected schema).
    #[error("permanent destination error: {0}")]
    Permanent(String),
    /// Update target is gone or the mapped id is stale; the upsert falls
    /// back to create.
    #[error("destination record not found or id stale")]
    NotFoundStale,
    /// Credentials expired; escalated for renewal, never retried here.
    #[error("destination credentials expired")]
    AuthExpired,
}

impl ApiError {
    /// Whether the invoker may retry this failure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient(_))
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Transient(_) => "transient",
            Self::Permanent(_) => "permanent",
            Self::NotFoundStale => "not_found_stale",
            Self::AuthExpired => "auth_expired",
        }
    }
}

/// Destination schema details fetched once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaInfo {
    /// Name of the title property in the destination database.
    pub title_property: String,
}

/// The downstream document API.
///
/// All calls from the upsert logic pass through the resilient invoker; no
/// other component communicates with the destination.
#[async_trait]
pub trait DestinationApi: Send + Sync {
    /// Create a record under `parent_ref`, returning the new record id.
    async fn create_record(
        &self,
        parent_ref: &str,
        properties: &RecordProperties,
    ) -> Result<String, ApiError>;

    /// Overwrite the properties of an existing record.
    async fn update_record(&self, id: &str, properties: &RecordProperties) -> Result<(), ApiError>;

    /// Discover the schema of the target database (startup only).
    async fn get_schema(&self, database_ref: &str) -> Result<SchemaInfo, ApiError>;
}
