use dotenvy::dotenv;
use std::env;

use crate::error::ConfigError;

/// Connection settings for the remote record store, loaded from the environment.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key: String,
    pub rooms_table: String,
    pub logs_table: String,
}

impl StoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, so tests don't touch process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let url = required("SUPABASE_URL")?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "SUPABASE_URL",
                reason: format!("expected an http(s) URL, got {url:?}"),
            });
        }

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            key: required("SUPABASE_KEY")?,
            rooms_table: lookup("ROOMS_TABLE").unwrap_or_else(|| "rooms".to_string()),
            logs_table: lookup("LOGS_TABLE").unwrap_or_else(|| "logs".to_string()),
        })
    }
}
