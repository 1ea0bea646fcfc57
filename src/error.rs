//! Typed errors for the fetch / extract / sync pipeline.

use std::time::Duration;
use thiserror::Error;

/// Caller input is not a digits-only listing id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid listing id {input:?}: must be a non-empty string of digits")]
pub struct InvalidIdentifier {
    pub input: String,
}

/// One failed fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// Response arrived with a non-2xx status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Attempt did not finish within the per-attempt timeout
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, TLS or body read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Headless browser failure
    #[error("browser error: {0}")]
    Browser(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// All attempts failed; `last` is the final attempt's cause
    #[error("failed to fetch {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: AttemptError,
    },
}

/// Errors reported by a record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store's own "no such row" signal
    #[error("record not found")]
    NotFound,

    /// Uniqueness violation on insert
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store answered but refused the request
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("store transport error: {0}")]
    Transport(String),

    #[error("unexpected store response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Why one pipeline invocation stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("sync failed for {id}: {message}")]
    Sync { id: String, message: String },
}
