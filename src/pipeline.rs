use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::archive::save_raw;
use crate::error::PipelineError;
use crate::extract::Extractor;
use crate::fetch::{Fetcher, Transport};
use crate::models::{ExtractedMetadata, ListingId, SyncResult};
use crate::sync::{RecordStore, Synchronizer};

/// What to do when a page yields no title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingTitlePolicy {
    /// Leave the store untouched
    #[default]
    Skip,
    /// Sync a clearly marked placeholder label instead
    Placeholder,
}

pub fn placeholder_label(id: &ListingId, at: DateTime<Utc>) -> String {
    format!("[untitled] listing {} ({})", id, at.format("%Y-%m-%d"))
}

/// Result of one successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub id: ListingId,
    pub metadata: ExtractedMetadata,
    /// Label sent to the store, if any
    pub label: Option<String>,
    /// `None` when sync is disabled or skipped for a missing title
    pub sync: Option<SyncResult>,
    /// Set when a missing title kept the run away from the store
    pub skipped_sync: bool,
    pub archived: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// fetch → extract → sync for one listing id.
///
/// A run owns its document from fetch to extraction; nothing is shared
/// between runs except the synchronizer's per-id locks.
pub struct Pipeline<T, S> {
    fetcher: Fetcher<T>,
    extractor: Extractor,
    synchronizer: Option<Synchronizer<S>>,
    archive_dir: Option<PathBuf>,
    missing_title: MissingTitlePolicy,
}

impl<T: Transport, S: RecordStore> Pipeline<T, S> {
    pub fn new(fetcher: Fetcher<T>, synchronizer: Option<Synchronizer<S>>) -> Self {
        Self {
            fetcher,
            extractor: Extractor::new(),
            synchronizer,
            archive_dir: None,
            missing_title: MissingTitlePolicy::default(),
        }
    }

    /// Also keep the raw markup under `dir`
    pub fn archive_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn missing_title(mut self, policy: MissingTitlePolicy) -> Self {
        self.missing_title = policy;
        self
    }

    pub fn synchronizer(&self) -> Option<&Synchronizer<S>> {
        self.synchronizer.as_ref()
    }

    pub async fn run(&self, raw_id: &str) -> Result<PipelineOutcome, PipelineError> {
        let id = ListingId::parse(raw_id)?;
        let doc = self.fetcher.fetch(&id).await?;
        let mut warnings = Vec::new();

        let archived = match &self.archive_dir {
            Some(dir) => match save_raw(dir, &doc).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("⚠️ Could not archive room {}: {:#}", id, e);
                    warnings.push(format!("archive failed: {e:#}"));
                    None
                }
            },
            None => None,
        };

        let metadata = self.extractor.extract(&doc.body);
        drop(doc);
        info!(
            "Extracted {}/8 fields for room {}{}",
            metadata.found_count(),
            id,
            metadata
                .title
                .as_deref()
                .map(|t| format!(": '{t}'"))
                .unwrap_or_default()
        );

        let label = match (&metadata.title, self.missing_title) {
            (Some(title), _) => Some(title.clone()),
            (None, MissingTitlePolicy::Skip) => {
                warn!("⚠️ No title extracted for room {}; skipping sync", id);
                warnings.push("no title extracted; sync skipped".to_string());
                None
            }
            (None, MissingTitlePolicy::Placeholder) => {
                let label = placeholder_label(&id, Utc::now());
                warn!("⚠️ No title extracted for room {}; using placeholder '{}'", id, label);
                warnings.push(format!("no title extracted; placeholder '{label}' used"));
                Some(label)
            }
        };

        let skipped_sync = label.is_none();
        let sync = match (&self.synchronizer, &label) {
            (Some(synchronizer), Some(label)) => {
                let result = synchronizer.upsert(id.as_str(), label).await;
                if !result.success {
                    return Err(PipelineError::Sync {
                        id: id.to_string(),
                        message: result.error.unwrap_or_else(|| "unknown error".to_string()),
                    });
                }
                Some(result)
            }
            _ => None,
        };

        Ok(PipelineOutcome {
            id,
            metadata,
            label,
            sync,
            skipped_sync,
            archived,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AttemptError, FetchError};
    use crate::fetch::FetchOptions;
    use crate::models::SyncAction;
    use crate::sync::MemoryStore;
    use crate::testing::{listing_page, ScriptedTransport, Step};
    use std::time::Duration;

    fn pipeline(
        transport: ScriptedTransport,
        store: Option<MemoryStore>,
    ) -> Pipeline<ScriptedTransport, MemoryStore> {
        let options = FetchOptions::default()
            .with_retries(3)
            .with_retry_delay(Duration::from_secs(1));
        Pipeline::new(Fetcher::new(transport, options), store.map(Synchronizer::new))
    }

    #[tokio::test]
    async fn invalid_ids_never_reach_the_network() {
        let transport = ScriptedTransport::serving("<html></html>");
        let pipeline = pipeline(transport.clone(), Some(MemoryStore::new()));

        for bad in ["", "abc", "12 34", "12345678 ", "-1", "1.5", "١٢٣"] {
            let err = pipeline.run(bad).await.unwrap_err();
            assert!(matches!(err, PipelineError::InvalidIdentifier(_)), "{bad:?}");
        }
        assert_eq!(transport.calls(), 0);
        assert_eq!(pipeline.synchronizer().unwrap().store().remote_calls(), 0);
    }

    #[tokio::test]
    async fn end_to_end_inserts_extracted_title() {
        let transport = ScriptedTransport::serving(&listing_page("Cozy Loft - City"));
        let pipeline = pipeline(transport.clone(), Some(MemoryStore::new()));

        let outcome = pipeline.run("12345678").await.unwrap();
        assert_eq!(outcome.metadata.title.as_deref(), Some("Cozy Loft"));
        assert_eq!(outcome.sync, Some(SyncResult::done(SyncAction::Inserted)));
        assert_eq!(transport.urls(), vec!["https://www.airbnb.com.br/rooms/12345678"]);

        let store = pipeline.synchronizer().unwrap().store();
        let id = ListingId::parse("12345678").unwrap();
        assert_eq!(store.label(&id).as_deref(), Some("Cozy Loft"));

        let again = pipeline.run("12345678").await.unwrap();
        assert_eq!(again.sync, Some(SyncResult::done(SyncAction::Updated)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_exhaustion_aborts_before_sync() {
        let transport = ScriptedTransport::new([Step::Fail(AttemptError::Status(429))]);
        let pipeline = pipeline(transport.clone(), Some(MemoryStore::new()));

        let err = pipeline.run("12345678").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Fetch(FetchError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(transport.calls(), 3);
        assert_eq!(pipeline.synchronizer().unwrap().store().remote_calls(), 0);
    }

    #[tokio::test]
    async fn missing_title_skips_sync_by_default() {
        let transport = ScriptedTransport::serving("<html><body><p>nothing</p></body></html>");
        let pipeline = pipeline(transport, Some(MemoryStore::new()));

        let outcome = pipeline.run("31337").await.unwrap();
        assert_eq!(outcome.metadata.title, None);
        assert_eq!(outcome.sync, None);
        assert!(outcome.skipped_sync);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(pipeline.synchronizer().unwrap().store().is_empty());
    }

    #[tokio::test]
    async fn missing_title_placeholder_is_marked() {
        let transport = ScriptedTransport::serving("<html><body></body></html>");
        let pipeline = pipeline(transport, Some(MemoryStore::new()))
            .missing_title(MissingTitlePolicy::Placeholder);

        let outcome = pipeline.run("31337").await.unwrap();
        let label = outcome.label.unwrap();
        assert!(label.starts_with("[untitled] listing 31337 ("), "{label}");
        assert_eq!(outcome.sync, Some(SyncResult::done(SyncAction::Inserted)));
    }

    #[tokio::test]
    async fn store_failure_is_a_pipeline_failure() {
        let transport = ScriptedTransport::serving(&listing_page("Casa"));
        let pipeline = pipeline(transport, Some(MemoryStore::new().with_failing_finds()));

        let err = pipeline.run("8").await.unwrap_err();
        assert_eq!(
            err,
            PipelineError::Sync {
                id: "8".into(),
                message: "store transport error: connection refused".into()
            }
        );
    }

    #[tokio::test]
    async fn runs_without_a_store() {
        let transport = ScriptedTransport::serving(&listing_page("Casa"));
        let pipeline = pipeline(transport, None);

        let outcome = pipeline.run("8").await.unwrap();
        assert_eq!(outcome.label.as_deref(), Some("Casa"));
        assert_eq!(outcome.sync, None);
    }

    #[tokio::test]
    async fn archives_raw_markup() {
        let dir = std::env::temp_dir().join(format!("listing-sync-pipeline-{}", std::process::id()));
        let transport = ScriptedTransport::serving(&listing_page("Casa"));
        let pipeline = pipeline(transport, None).archive_to(&dir);

        let outcome = pipeline.run("8").await.unwrap();
        let path = outcome.archived.unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("airbnb_8_") && name.ends_with(".html"), "{name}");
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            listing_page("Casa")
        );

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
