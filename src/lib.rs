//! Fetch short-term rental listing pages, extract their metadata and keep a
//! remote `rooms` table in step with the extracted titles.

pub mod archive;
pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod reextract;
pub mod sync;

#[cfg(test)]
mod testing;

pub use batch::{run_batch, BatchReport};
pub use config::StoreConfig;
pub use error::{FetchError, InvalidIdentifier, PipelineError, StoreError};
pub use extract::Extractor;
pub use fetch::{FetchOptions, Fetcher, ReqwestTransport, Transport};
pub use models::{ExtractedMetadata, ListingId, SyncAction, SyncResult};
pub use pipeline::{MissingTitlePolicy, Pipeline, PipelineOutcome};
pub use sync::{MemoryStore, PostgrestStore, RecordStore, Synchronizer};
