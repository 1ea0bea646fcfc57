//! In-memory record store for tests and dry runs.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::StoreError;
use crate::models::{ListingId, RoomRecord, RunSummary};
use crate::sync::store::RecordStore;

/// In-memory rooms table plus run log.
///
/// Keys are unique: inserting an existing id fails with
/// [`StoreError::Conflict`], as a primary key constraint would.
#[derive(Default)]
pub struct MemoryStore {
    rooms: RwLock<BTreeMap<ListingId, Option<String>>>,
    runs: RwLock<Vec<RunSummary>>,
    fail_finds: AtomicBool,
    fail_runs: AtomicBool,
    hide_existing: AtomicBool,
    remote_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `find` fails with a transport error
    pub fn with_failing_finds(self) -> Self {
        self.fail_finds.store(true, Ordering::SeqCst);
        self
    }

    /// Every `append_run` fails
    pub fn with_failing_runs(self) -> Self {
        self.fail_runs.store(true, Ordering::SeqCst);
        self
    }

    /// `find` reports every row as missing, which makes the synchronizer
    /// take the insert branch for existing keys (a lost check-then-act race)
    pub fn with_stale_reads(self) -> Self {
        self.hide_existing.store(true, Ordering::SeqCst);
        self
    }

    pub fn seed(&self, id: &ListingId, label: &str) {
        self.rooms
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), Some(label.to_string()));
    }

    pub fn label(&self, id: &ListingId) -> Option<String> {
        self.rooms
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.rooms.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn runs(&self) -> Vec<RunSummary> {
        self.runs.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of store operations served so far
    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, id: &ListingId) -> Result<Option<RoomRecord>, StoreError> {
        self.touch();
        if self.fail_finds.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("connection refused".to_string()));
        }
        if self.hide_existing.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let rooms = self.rooms.read().unwrap_or_else(|e| e.into_inner());
        Ok(rooms.get(id).map(|label| RoomRecord {
            room_id: id.clone(),
            label: label.clone(),
        }))
    }

    async fn insert(&self, record: &RoomRecord) -> Result<(), StoreError> {
        self.touch();
        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        if rooms.contains_key(&record.room_id) {
            return Err(StoreError::Conflict(format!(
                "duplicate key value violates unique constraint (room_id)=({})",
                record.room_id
            )));
        }
        rooms.insert(record.room_id.clone(), record.label.clone());
        Ok(())
    }

    async fn update_label(&self, id: &ListingId, label: &str) -> Result<(), StoreError> {
        self.touch();
        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        // update-by-key on a missing row touches nothing
        if let Some(slot) = rooms.get_mut(id) {
            *slot = Some(label.to_string());
        }
        Ok(())
    }

    async fn append_run(&self, summary: &RunSummary) -> Result<(), StoreError> {
        self.touch();
        if self.fail_runs.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                status: 404,
                message: "relation \"public.logs\" does not exist".to_string(),
            });
        }
        self.runs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(summary.clone());
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<ListingId>, StoreError> {
        self.touch();
        Ok(self
            .rooms
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect())
    }
}
