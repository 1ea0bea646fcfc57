use crate::error::AttemptError;
use crate::fetch::traits::Transport;
use crate::fetch::types::FetchOptions;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Plain HTTP transport presenting a static desktop-browser header set
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(options: &FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .default_headers(default_headers())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            timeout: options.timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> AttemptError {
        if err.is_timeout() {
            AttemptError::Timeout(self.timeout)
        } else {
            AttemptError::Transport(err.to_string())
        }
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<String, AttemptError> {
        debug!("Sending HTTP request to {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        debug!("Downloaded {} bytes of HTML (status {})", body.len(), status);
        Ok(body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_identify_a_browser_client() {
        let headers = default_headers();
        assert_eq!(headers[CACHE_CONTROL], "no-cache");
        assert_eq!(headers[PRAGMA], "no-cache");
        assert!(headers[ACCEPT].to_str().unwrap().starts_with("text/html"));
        assert!(headers.contains_key(ACCEPT_LANGUAGE));
    }

    #[test]
    fn builds_with_default_options() {
        let transport = ReqwestTransport::new(&FetchOptions::default()).unwrap();
        assert_eq!(transport.name(), "http");
        assert_eq!(transport.timeout, Duration::from_secs(30));
    }
}
