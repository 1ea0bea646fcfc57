use std::time::Duration;

use crate::error::ConfigError;
use crate::models::ListingId;

pub const DEFAULT_ORIGIN: &str = "www.airbnb.com.br";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Request and retry settings for fetching listing pages
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Host serving `/rooms/<id>`
    pub origin: String,
    /// Upper bound for a single attempt
    pub timeout: Duration,
    /// Total number of attempts, not additional retries
    pub retries: u32,
    /// Fixed pause between attempts
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            timeout: Duration::from_secs(30),
            retries: 3,
            retry_delay: Duration::from_secs(2),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchOptions {
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retries == 0 {
            return Err(ConfigError::Invalid {
                key: "retries",
                reason: "at least one attempt is required".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.origin.is_empty() || self.origin.contains('/') {
            return Err(ConfigError::Invalid {
                key: "origin",
                reason: format!("expected a bare host name, got {:?}", self.origin),
            });
        }
        Ok(())
    }

    /// `https://<origin>/rooms/<id>`; nothing else goes into the URL.
    pub fn listing_url(&self, id: &ListingId) -> String {
        format!("https://{}/rooms/{}", self.origin, id)
    }
}
