pub mod locks;
pub mod memory;
pub mod postgrest;
pub mod store;

pub use locks::KeyedLocks;
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use store::RecordStore;

use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::StoreError;
use crate::models::{ListingId, RoomRecord, RunSummary, SyncAction, SyncResult};

/// Result of the best-effort run log append.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogOutcome {
    pub recorded: bool,
    pub warning: Option<String>,
}

/// Keeps the remote `rooms` table in step with extracted titles.
///
/// `upsert` is check-then-act against the store. Calls for the same id are
/// serialized through a per-id lock, and an insert that still loses a race
/// against another process (`Conflict`) is replayed as an update, so
/// repeated calls converge on one row holding the latest label.
pub struct Synchronizer<S> {
    store: S,
    locks: KeyedLocks,
}

impl<S: RecordStore> Synchronizer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Insert or update the label for `id`. Never panics or returns `Err`;
    /// failures are reported in the result with the store's message as-is.
    pub async fn upsert(&self, id: &str, label: &str) -> SyncResult {
        if id.is_empty() || label.trim().is_empty() {
            return SyncResult::failed("room_id and label are required");
        }
        let id = match ListingId::parse(id) {
            Ok(id) => id,
            Err(e) => return SyncResult::failed(e.to_string()),
        };

        let _guard = self.locks.lock(id.as_str()).await;

        let exists = match self.store.find(&id).await {
            Ok(found) => found.is_some(),
            Err(StoreError::NotFound) => false,
            Err(e) => {
                error!("Failed to check room {}: {}", id, e);
                return SyncResult::failed(e.to_string());
            }
        };

        let outcome = if exists {
            info!("Updating existing room {} with label '{}'", id, label);
            self.store
                .update_label(&id, label)
                .await
                .map(|_| SyncAction::Updated)
        } else {
            info!("Inserting new room {} with label '{}'", id, label);
            let record = RoomRecord {
                room_id: id.clone(),
                label: Some(label.to_string()),
            };
            match self.store.insert(&record).await {
                Ok(()) => Ok(SyncAction::Inserted),
                Err(StoreError::Conflict(msg)) => {
                    warn!("Room {} was inserted concurrently ({}); updating instead", id, msg);
                    self.store
                        .update_label(&id, label)
                        .await
                        .map(|_| SyncAction::Updated)
                }
                Err(e) => Err(e),
            }
        };

        match outcome {
            Ok(action) => {
                info!("✅ Room {} {} in store", id, action);
                SyncResult::done(action)
            }
            Err(e) => {
                error!("❌ Failed to sync room {}: {}", id, e);
                SyncResult::failed(e.to_string())
            }
        }
    }

    /// Append a run summary to the log collection.
    ///
    /// Best effort: a failure is logged and returned as a warning, never as
    /// an error.
    pub async fn log_execution(
        &self,
        duration: Duration,
        ids: &[ListingId],
        success_count: usize,
        total_count: usize,
    ) -> LogOutcome {
        let room_ids: Vec<u64> = ids
            .iter()
            .filter_map(|id| {
                let numeric = id.as_u64();
                if numeric.is_none() {
                    warn!("Room {} does not fit the numeric room_ids column; left out of the run log", id);
                }
                numeric
            })
            .collect();

        let summary = RunSummary {
            service_time: duration.as_secs_f64(),
            room_ids,
            success_count,
            total_count,
        };

        info!(
            "Recording run: {:.2}s, {} rooms, {}/{} succeeded ({:.1}%)",
            summary.service_time,
            ids.len(),
            success_count,
            total_count,
            summary.success_rate()
        );

        match self.store.append_run(&summary).await {
            Ok(()) => LogOutcome {
                recorded: true,
                warning: None,
            },
            Err(e) => {
                warn!("⚠️ Failed to record run log, processing itself completed: {}", e);
                LogOutcome {
                    recorded: false,
                    warning: Some(format!("run log not recorded: {e}")),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(s: &str) -> ListingId {
        ListingId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn insert_then_update() {
        let sync = Synchronizer::new(MemoryStore::new());

        let first = sync.upsert("555", "X").await;
        assert_eq!(first, SyncResult::done(SyncAction::Inserted));

        let second = sync.upsert("555", "Y").await;
        assert_eq!(second, SyncResult::done(SyncAction::Updated));
    }

    #[tokio::test]
    async fn repeated_upserts_converge_on_latest_label() {
        let sync = Synchronizer::new(MemoryStore::new());

        assert!(sync.upsert("42", "A").await.success);
        assert!(sync.upsert("42", "B").await.success);

        assert_eq!(sync.store().len(), 1);
        assert_eq!(sync.store().label(&id("42")).as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn validation_happens_before_any_store_call() {
        let sync = Synchronizer::new(MemoryStore::new());

        for (room, label) in [("", "Label"), ("42", ""), ("42", "   "), ("4x2", "Label")] {
            let result = sync.upsert(room, label).await;
            assert!(!result.success);
            assert_eq!(result.action, SyncAction::None);
            assert!(result.error.is_some());
        }
        assert_eq!(sync.store().remote_calls(), 0);
    }

    #[tokio::test]
    async fn failed_existence_check_short_circuits() {
        let sync = Synchronizer::new(MemoryStore::new().with_failing_finds());

        let result = sync.upsert("42", "A").await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("store transport error: connection refused"));
        assert_eq!(sync.store().remote_calls(), 1);
        assert!(sync.store().is_empty());
    }

    #[tokio::test]
    async fn lost_insert_race_falls_back_to_update() {
        let store = MemoryStore::new().with_stale_reads();
        store.seed(&id("42"), "old");
        let sync = Synchronizer::new(store);

        let result = sync.upsert("42", "new").await;
        assert_eq!(result, SyncResult::done(SyncAction::Updated));
        assert_eq!(sync.store().label(&id("42")).as_deref(), Some("new"));
        assert_eq!(sync.store().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_upserts_for_one_id_insert_once() {
        let sync = Arc::new(Synchronizer::new(MemoryStore::new()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sync = Arc::clone(&sync);
                tokio::spawn(async move { sync.upsert("900", &format!("label {i}")).await })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.success, "{result:?}");
            if result.action == SyncAction::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(sync.store().len(), 1);
    }

    #[tokio::test]
    async fn log_failure_is_only_a_warning() {
        let sync = Synchronizer::new(MemoryStore::new().with_failing_runs());

        let synced = sync.upsert("7", "Casa").await;
        let logged = sync
            .log_execution(Duration::from_millis(1500), &[id("7")], 1, 1)
            .await;

        assert!(synced.success);
        assert!(!logged.recorded);
        assert!(logged.warning.unwrap().contains("does not exist"));
    }

    #[tokio::test]
    async fn log_records_summary() {
        let sync = Synchronizer::new(MemoryStore::new());
        let outcome = sync
            .log_execution(Duration::from_secs(3), &[id("1"), id("2")], 1, 2)
            .await;

        assert_eq!(outcome, LogOutcome { recorded: true, warning: None });
        let runs = sync.store().runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].room_ids, vec![1, 2]);
        assert_eq!(runs[0].service_time, 3.0);
        assert_eq!(runs[0].success_rate(), 50.0);
    }

    #[tokio::test]
    async fn oversized_ids_are_left_out_of_the_summary() {
        let sync = Synchronizer::new(MemoryStore::new());
        let huge = id("123456789012345678901234567890");
        let outcome = sync
            .log_execution(Duration::from_secs(1), &[id("5"), huge], 2, 2)
            .await;

        assert!(outcome.recorded);
        let runs = sync.store().runs();
        assert_eq!(runs[0].room_ids, vec![5]);
        assert_eq!(runs[0].total_count, 2);
    }
}
