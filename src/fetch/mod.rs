#[cfg(feature = "browser")]
pub mod browser;
pub mod http;
pub mod traits;
pub mod types;

#[cfg(feature = "browser")]
pub use browser::BrowserTransport;
pub use http::ReqwestTransport;
pub use traits::Transport;
pub use types::FetchOptions;

use chrono::Utc;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::error::{AttemptError, FetchError};
use crate::models::{ListingId, RawDocument};

/// Fetches listing pages with a per-attempt timeout and fixed-interval retries.
///
/// Holds no state between calls; concurrent `fetch` calls for different ids
/// are independent.
pub struct Fetcher<T> {
    transport: T,
    options: FetchOptions,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, options: FetchOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub async fn fetch(&self, id: &ListingId) -> Result<RawDocument, FetchError> {
        let url = self.options.listing_url(id);
        let attempts = self.options.retries.max(1);
        let mut last = AttemptError::Transport("no attempt made".to_string());

        info!("Fetching {} via {}", url, self.transport.name());

        for attempt in 1..=attempts {
            let outcome = match timeout(self.options.timeout, self.transport.get(&url)).await {
                Ok(result) => result,
                Err(_) => Err(AttemptError::Timeout(self.options.timeout)),
            };

            match outcome {
                Ok(body) => {
                    info!(
                        "Fetched room {} on attempt {} ({} characters)",
                        id,
                        attempt,
                        body.len()
                    );
                    return Ok(RawDocument {
                        id: id.clone(),
                        url,
                        body,
                        fetched_at: Utc::now(),
                    });
                }
                Err(err) => {
                    warn!("Attempt {}/{} for room {} failed: {}", attempt, attempts, id, err);
                    last = err;
                    if attempt < attempts {
                        info!("Retrying in {:?}...", self.options.retry_delay);
                        sleep(self.options.retry_delay).await;
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            url,
            attempts,
            last,
        })
    }
}
