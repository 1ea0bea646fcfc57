use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InvalidIdentifier;

/// Numeric listing identifier, e.g. `756587219584104742`.
///
/// Only constructed through [`ListingId::parse`], so every value in the
/// crate is non-empty and made of ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    pub fn parse(input: &str) -> Result<Self, InvalidIdentifier> {
        if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(input.to_string()))
        } else {
            Err(InvalidIdentifier {
                input: input.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form for stores with integer key columns.
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ListingId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Stores hand the key back either as a JSON string or a JSON number.
        let value = serde_json::Value::deserialize(deserializer)?;
        let raw = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "listing id must be a string or number, got {}",
                    other
                )))
            }
        };
        ListingId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Full markup of one fetched listing page.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: ListingId,
    pub url: String,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

impl RawDocument {
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Metadata pulled out of a listing page.
///
/// Every field is independent. `None` means "unknown", never zero; numeric
/// fields keep the matched text as-is so callers decide how to parse it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub title: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub review_count: Option<String>,
    pub location: Option<String>,
    pub bedroom_count: Option<String>,
    pub bathroom_count: Option<String>,
    pub guest_capacity: Option<String>,
}

impl ExtractedMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Number of fields that were found.
    pub fn found_count(&self) -> usize {
        [
            &self.title,
            &self.price,
            &self.rating,
            &self.review_count,
            &self.location,
            &self.bedroom_count,
            &self.bathroom_count,
            &self.guest_capacity,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }
}

/// Which branch of the upsert was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Inserted,
    Updated,
    None,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncAction::Inserted => "inserted",
            SyncAction::Updated => "updated",
            SyncAction::None => "none",
        };
        f.write_str(s)
    }
}

/// Outcome of one synchronization call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub action: SyncAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    pub fn done(action: SyncAction) -> Self {
        Self {
            success: true,
            action,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            action: SyncAction::None,
            error: Some(error.into()),
        }
    }
}

/// Row of the remote `rooms` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub room_id: ListingId,
    #[serde(default)]
    pub label: Option<String>,
}

/// Row appended to the remote `logs` table after a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Wall time of the run in seconds
    pub service_time: f64,
    pub room_ids: Vec<u64>,
    pub success_count: usize,
    pub total_count: usize,
}

impl RunSummary {
    pub fn success_rate(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.total_count as f64 * 100.0
        }
    }
}

/// JSON document written by the re-extraction pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub room_id: ListingId,
    pub timestamp: String,
    pub metadata: ExtractedMetadata,
    pub content: String,
    pub original_filename: String,
    pub extracted_at: DateTime<Utc>,
}
