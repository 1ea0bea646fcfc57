//! Re-extraction over a directory of archived listing pages.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use crate::archive::parse_artifact_name;
use crate::extract::{main_content, Extractor};
use crate::models::ExtractionRecord;
use crate::sync::{RecordStore, Synchronizer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
    #[default]
    Both,
}

impl OutputFormat {
    fn json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }

    fn text(self) -> bool {
        matches!(self, OutputFormat::Text | OutputFormat::Both)
    }
}

/// Extract every archived page in `input` into `output`.
///
/// Files whose names are not archive artifacts are skipped. With a
/// synchronizer, each extracted title is upserted; sync failures are
/// logged and the pass continues. Returns the number of pages processed.
pub async fn reextract_dir<S: RecordStore>(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    sync: Option<&Synchronizer<S>>,
) -> Result<usize> {
    let mut names = Vec::new();
    let mut dir = tokio::fs::read_dir(input)
        .await
        .with_context(|| format!("Failed to read input directory {}", input.display()))?;
    while let Some(entry) = dir.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(".html") {
                names.push(name.to_string());
            }
        }
    }
    names.sort();

    tokio::fs::create_dir_all(output)
        .await
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    info!("📂 Found {} HTML files in {}", names.len(), input.display());

    let extractor = Extractor::new();
    let mut processed = 0;

    for name in &names {
        let Some((room_id, timestamp)) = parse_artifact_name(name) else {
            warn!("Skipping {}: not an archived listing page", name);
            continue;
        };

        let path = input.join(name);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let record = ExtractionRecord {
            room_id,
            timestamp,
            metadata: extractor.extract(&raw),
            content: main_content(&raw),
            original_filename: name.clone(),
            extracted_at: Utc::now(),
        };

        let stem = name.trim_end_matches(".html");
        if format.json() {
            let out = output.join(format!("{stem}.json"));
            let json = serde_json::to_string_pretty(&record)?;
            tokio::fs::write(&out, json)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            info!("💾 JSON saved: {}", out.display());
        }
        if format.text() {
            let out = output.join(format!("{stem}.txt"));
            tokio::fs::write(&out, &record.content)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            info!("💾 Text saved: {}", out.display());
        }

        if let (Some(synchronizer), Some(title)) = (sync, &record.metadata.title) {
            let result = synchronizer.upsert(record.room_id.as_str(), title).await;
            if !result.success {
                warn!(
                    "⚠️ Sync failed for room {}: {}",
                    record.room_id,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        processed += 1;
    }

    info!(
        "✅ Processing complete: {} of {} files processed",
        processed,
        names.len()
    );
    Ok(processed)
}
