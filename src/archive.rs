//! Raw markup archive.
//!
//! Files are named `airbnb_<id>_<YYYY-MM-DDTHH-MM-SS>.html` (UTC). The
//! re-extraction pass reads the id and capture time back out of that name.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::{ListingId, RawDocument};

const PREFIX: &str = "airbnb_";
const EXTENSION: &str = ".html";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

pub fn artifact_name(id: &ListingId, at: DateTime<Utc>) -> String {
    format!("{PREFIX}{id}_{}{EXTENSION}", at.format(TIMESTAMP_FORMAT))
}

/// Recover `(id, timestamp)` from an artifact file name.
pub fn parse_artifact_name(name: &str) -> Option<(ListingId, String)> {
    let stem = name.strip_prefix(PREFIX)?.strip_suffix(EXTENSION)?;
    let (id, timestamp) = stem.split_once('_')?;
    if timestamp.is_empty() {
        return None;
    }
    Some((ListingId::parse(id).ok()?, timestamp.to_string()))
}

/// Capture time encoded in an artifact timestamp, if it is well-formed.
pub fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Write the fetched markup under `dir`, creating it if needed.
pub async fn save_raw(dir: &Path, doc: &RawDocument) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(artifact_name(&doc.id, doc.fetched_at));
    tokio::fs::write(&path, &doc.body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        "💾 Saved room {} to {} ({:.2} KB)",
        doc.id,
        path.display(),
        doc.len() as f64 / 1024.0
    );
    Ok(path)
}
