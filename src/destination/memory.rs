use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::traits::{ApiError, DestinationApi, SchemaInfo};
use crate::formatter::RecordProperties;

/// In-memory destination for tests and local runs.
///
/// Behaves like the real document API at the contract level: created records
/// get fresh ids, updates to unknown ids fail with
/// [`ApiError::NotFoundStale`], and records can be deleted out-of-band to
/// simulate external deletion.
pub struct InMemoryDestination {
    records: DashMap<String, RecordProperties>,
    next_id: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
}

impl InMemoryDestination {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
            creates: AtomicU64::new(0),
            updates: AtomicU64::new(0),
        }
    }

    /// Current record count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fetch a stored record's properties.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<RecordProperties> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// Delete a record out-of-band, as an external actor would.
    pub fn delete_record(&self, id: &str) -> bool {
        self.records.remove(id).is_some()
    }

    /// Total successful creates since construction.
    #[must_use]
    pub fn creates(&self) -> u64 {
        self.creates.load(Ordering::Relaxed)
    }

    /// Total successful updates since construction.
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryDestination {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DestinationApi for InMemoryDestination {
    async fn create_record(
        &self,
        _parent_ref: &str,
        properties: &RecordProperties,
    ) -> Result<String, ApiError> {
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.records.insert(id.clone(), properties.clone());
        self.creates.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    async fn update_record(&self, id: &str, properties: &RecordProperties) -> Result<(), ApiError> {
        match self.records.get_mut(id) {
            Some(mut entry) => {
                *entry.value_mut() = properties.clone();
                self.updates.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => Err(ApiError::NotFoundStale),
        }
    }

    async fn get_schema(&self, _database_ref: &str) -> Result<SchemaInfo, ApiError> {
        Ok(SchemaInfo {
            title_property: "Name".to_string(),
        })
    }
}
