//! Batch driver: many listing ids, bounded concurrency, one run summary.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::fetch::Transport;
use crate::models::ListingId;
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::sync::RecordStore;

/// Outcome for one id of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<PipelineOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// One entry per distinct id, in first-occurrence order
    pub entries: Vec<BatchEntry>,
    pub success_count: usize,
    pub total_count: usize,
    pub duration: Duration,
    pub run_logged: bool,
    /// Set when the run summary could not be stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_warning: Option<String>,
}

/// Trim, drop blanks and deduplicate, keeping first occurrences.
pub fn dedupe_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.as_ref().trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// Run the pipeline for every id with at most `concurrency` in flight.
///
/// Ids fail independently. When the pipeline has a synchronizer, a run
/// summary is appended afterwards; failing to store it only sets
/// `log_warning`.
pub async fn run_batch<T, S, I>(
    pipeline: Arc<Pipeline<T, S>>,
    ids: I,
    concurrency: usize,
) -> BatchReport
where
    T: Transport + 'static,
    S: RecordStore + 'static,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let ids = dedupe_ids(ids);
    let total_count = ids.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let started = Instant::now();

    info!(
        "🚀 Processing {} rooms with concurrency {}",
        total_count,
        concurrency.max(1)
    );

    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let pipeline = Arc::clone(&pipeline);
            let sem = Arc::clone(&semaphore);
            tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                pipeline.run(&id).await
            })
        })
        .collect();

    let mut entries = Vec::with_capacity(total_count);
    for (id, handle) in ids.iter().zip(handles) {
        let entry = match handle.await {
            Ok(Ok(outcome)) => BatchEntry {
                id: id.clone(),
                success: true,
                outcome: Some(outcome),
                error: None,
            },
            Ok(Err(e)) => {
                error!("❌ Room {} failed: {}", id, e);
                BatchEntry {
                    id: id.clone(),
                    success: false,
                    outcome: None,
                    error: Some(e.to_string()),
                }
            }
            Err(e) => {
                error!("❌ Room {} task aborted: {}", id, e);
                BatchEntry {
                    id: id.clone(),
                    success: false,
                    outcome: None,
                    error: Some(format!("task aborted: {e}")),
                }
            }
        };
        entries.push(entry);
    }

    let duration = started.elapsed();
    let success_count = entries.iter().filter(|e| e.success).count();
    info!(
        "✅ Batch finished in {:.2}s: {}/{} rooms succeeded",
        duration.as_secs_f64(),
        success_count,
        total_count
    );

    let (run_logged, log_warning) = match pipeline.synchronizer() {
        Some(synchronizer) => {
            let valid: Vec<ListingId> = ids
                .iter()
                .filter_map(|id| ListingId::parse(id).ok())
                .collect();
            let logged = synchronizer
                .log_execution(duration, &valid, success_count, total_count)
                .await;
            (logged.recorded, logged.warning)
        }
        None => {
            warn!("Sync disabled; run summary not recorded");
            (false, None)
        }
    };

    BatchReport {
        entries,
        success_count,
        total_count,
        duration,
        run_logged,
        log_warning,
    }
}
