use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{ListingId, RoomRecord, RunSummary};

/// Record-oriented view of the remote store.
///
/// Only the primitives the synchronizer needs: select by key, insert,
/// update by key, plus the append-only run log and a key listing used by
/// batch runs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// `Ok(None)` when there is no row for `id`
    async fn find(&self, id: &ListingId) -> Result<Option<RoomRecord>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the key already exists
    async fn insert(&self, record: &RoomRecord) -> Result<(), StoreError>;

    async fn update_label(&self, id: &ListingId, label: &str) -> Result<(), StoreError>;

    /// Append one run summary to the auxiliary log collection
    async fn append_run(&self, summary: &RunSummary) -> Result<(), StoreError>;

    async fn list_ids(&self) -> Result<Vec<ListingId>, StoreError>;
}
