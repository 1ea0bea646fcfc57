use crate::error::AttemptError;
use crate::fetch::traits::Transport;
use crate::fetch::types::FetchOptions;
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Renders listing pages in headless Chrome.
///
/// Drop-in replacement for [`crate::fetch::ReqwestTransport`] when the origin
/// only serves a usable document to a real browser. Retries and the
/// per-attempt timeout still come from the surrounding `Fetcher`.
pub struct BrowserTransport {
    browser: Browser,
    timeout: Duration,
    settle: Duration,
}

impl BrowserTransport {
    /// Launch a headless Chrome instance
    pub fn new(options: &FetchOptions) -> Result<Self> {
        info!("Launching headless Chrome...");

        let launch = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(launch).context("Failed to launch Chrome browser")?;

        Ok(Self {
            browser,
            timeout: options.timeout,
            settle: Duration::from_secs(2),
        })
    }

    /// Extra wait after navigation so client-side rendering can finish
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

fn render(browser: &Browser, url: &str, timeout: Duration, settle: Duration) -> Result<String> {
    let tab = browser.new_tab().context("Failed to open tab")?;
    tab.set_default_timeout(timeout);

    let html = close_after(load(&tab, url, settle), || tab.close(true), url)?;
    if html.trim().is_empty() {
        anyhow::bail!("rendered page is empty");
    }
    Ok(html)
}

/// Hand back `outcome` once the tab is closed, whether or not loading worked.
/// A failed close is logged; it never replaces the load result.
fn close_after<T>(outcome: Result<T>, close: impl FnOnce() -> Result<bool>, url: &str) -> Result<T> {
    if let Err(e) = close() {
        warn!("Failed to close tab for {}: {:#}", url, e);
    }
    outcome
}

/// Navigate `tab` and read the rendered markup. The caller owns closing it.
fn load(tab: &Tab, url: &str, settle: Duration) -> Result<String> {
    tab.navigate_to(url).context("Navigation failed")?;
    tab.wait_until_navigated().context("Page did not finish loading")?;
    thread::sleep(settle);
    tab.get_content().context("Failed to read page HTML")
}

#[async_trait]
impl Transport for BrowserTransport {
    async fn get(&self, url: &str) -> Result<String, AttemptError> {
        debug!("Opening {} in headless Chrome", url);

        let browser = self.browser.clone();
        let url = url.to_string();
        let (timeout, settle) = (self.timeout, self.settle);

        // headless_chrome is blocking; keep it off the async workers
        tokio::task::spawn_blocking(move || render(&browser, &url, timeout, settle))
            .await
            .map_err(|e| AttemptError::Browser(e.to_string()))?
            .map_err(|e| AttemptError::Browser(format!("{e:#}")))
    }

    fn name(&self) -> &'static str {
        "headless-chrome"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn tab_is_closed_when_loading_fails() {
        let closed = Cell::new(false);
        let outcome: Result<String> = close_after(
            Err(anyhow::anyhow!("Navigation failed")),
            || {
                closed.set(true);
                Ok(true)
            },
            "https://www.airbnb.com.br/rooms/1",
        );
        assert!(closed.get());
        assert_eq!(outcome.unwrap_err().to_string(), "Navigation failed");
    }

    #[test]
    fn close_failure_keeps_the_page() {
        let outcome = close_after(
            Ok("<html></html>".to_string()),
            || Err(anyhow::anyhow!("tab already gone")),
            "https://www.airbnb.com.br/rooms/1",
        );
        assert_eq!(outcome.unwrap(), "<html></html>");
    }
}
