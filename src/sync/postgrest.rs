//! Supabase / PostgREST implementation of [`RecordStore`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::models::{ListingId, RoomRecord, RunSummary};
use crate::sync::store::RecordStore;

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

pub struct PostgrestStore {
    client: Client,
    base_url: String,
    rooms_table: String,
    logs_table: String,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    room_id: ListingId,
}

/// Error body PostgREST sends with non-2xx responses
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

impl PostgrestStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.key).context("SUPABASE_KEY is not a valid header value")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.key))
                .context("SUPABASE_KEY is not a valid header value")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .context("Failed to create store HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            rooms_table: config.rooms_table.clone(),
            logs_table: config.logs_table.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn key_filter(id: &ListingId) -> (&'static str, String) {
        ("room_id", format!("eq.{}", id))
    }
}

async fn check(response: std::result::Result<Response, reqwest::Error>) -> Result<Response, StoreError> {
    let response = response.map_err(|e| StoreError::Transport(e.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify(status, &body))
}

/// Map a failed PostgREST response onto [`StoreError`], keeping the store's
/// own message text.
fn classify(status: StatusCode, body: &str) -> StoreError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let message = match (parsed.message, parsed.details) {
        (Some(m), Some(d)) if !d.is_empty() => format!("{m} ({d})"),
        (Some(m), _) => m,
        (None, _) if !body.trim().is_empty() => body.trim().to_string(),
        (None, _) => status.to_string(),
    };

    if status == StatusCode::CONFLICT || parsed.code.as_deref() == Some(UNIQUE_VIOLATION) {
        StoreError::Conflict(message)
    } else {
        StoreError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn find(&self, id: &ListingId) -> Result<Option<RoomRecord>, StoreError> {
        debug!("Selecting room {} from {}", id, self.rooms_table);
        let response = check(
            self.client
                .get(self.table_url(&self.rooms_table))
                .query(&[Self::key_filter(id), ("select", "room_id,label".to_string())])
                .send()
                .await,
        )
        .await?;

        let rows: Vec<RoomRecord> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, record: &RoomRecord) -> Result<(), StoreError> {
        check(
            self.client
                .post(self.table_url(&self.rooms_table))
                .header("Prefer", "return=minimal")
                .json(record)
                .send()
                .await,
        )
        .await?;
        Ok(())
    }

    async fn update_label(&self, id: &ListingId, label: &str) -> Result<(), StoreError> {
        check(
            self.client
                .patch(self.table_url(&self.rooms_table))
                .query(&[Self::key_filter(id)])
                .header("Prefer", "return=minimal")
                .json(&json!({ "label": label }))
                .send()
                .await,
        )
        .await?;
        Ok(())
    }

    async fn append_run(&self, summary: &RunSummary) -> Result<(), StoreError> {
        check(
            self.client
                .post(self.table_url(&self.logs_table))
                .header("Prefer", "return=minimal")
                .json(summary)
                .send()
                .await,
        )
        .await?;
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<ListingId>, StoreError> {
        let response = check(
            self.client
                .get(self.table_url(&self.rooms_table))
                .query(&[("select", "room_id")])
                .send()
                .await,
        )
        .await?;

        let rows: Vec<IdRow> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(rows.into_iter().map(|r| r.room_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StoreConfig {
        StoreConfig {
            url: "https://project.supabase.co".into(),
            key: "anon-key".into(),
            rooms_table: "rooms".into(),
            logs_table: "logs".into(),
        }
    }

    #[test]
    fn builds_table_urls() {
        let store = PostgrestStore::new(&config()).unwrap();
        assert_eq!(
            store.table_url("rooms"),
            "https://project.supabase.co/rest/v1/rooms"
        );
        let id = ListingId::parse("77").unwrap();
        assert_eq!(PostgrestStore::key_filter(&id), ("room_id", "eq.77".to_string()));
    }

    #[test]
    fn unique_violation_is_a_conflict() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint \"rooms_pkey\"","details":"Key (room_id)=(1) already exists."}"#;
        match classify(StatusCode::CONFLICT, body) {
            StoreError::Conflict(msg) => {
                assert!(msg.starts_with("duplicate key value"));
                assert!(msg.contains("already exists"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn other_failures_keep_the_store_message() {
        let body = r#"{"code":"42P01","message":"relation \"public.logs\" does not exist"}"#;
        assert_eq!(
            classify(StatusCode::NOT_FOUND, body),
            StoreError::Rejected {
                status: 404,
                message: "relation \"public.logs\" does not exist".into()
            }
        );
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, "Invalid API key"),
            StoreError::Rejected {
                status: 401,
                message: "Invalid API key".into()
            }
        );
    }

    #[test]
    fn rejects_keys_that_cannot_be_headers() {
        let mut cfg = config();
        cfg.key = "bad\nkey".into();
        assert!(PostgrestStore::new(&cfg).is_err());
    }
}
