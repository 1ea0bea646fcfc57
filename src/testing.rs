//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::AttemptError;
use crate::fetch::Transport;

/// What a scripted transport does on one call.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(String),
    Fail(AttemptError),
    /// Responds after the given delay
    Slow(Duration, String),
    /// Never completes; only the fetcher's timeout ends the attempt
    Hang,
}

/// Transport that replays a fixed script and records every call.
///
/// Once the script runs out the last step repeats.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    steps: Arc<Mutex<VecDeque<Step>>>,
    last: Arc<Mutex<Option<Step>>>,
    calls: Arc<AtomicU32>,
    call_times: Arc<Mutex<Vec<Instant>>>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
            ..Default::default()
        }
    }

    /// Fails `failures` times, then serves `body`.
    pub fn failing_then(failures: usize, body: &str) -> Self {
        let mut steps: Vec<Step> = (0..failures)
            .map(|_| Step::Fail(AttemptError::Status(503)))
            .collect();
        steps.push(Step::Respond(body.to_string()));
        Self::new(steps)
    }

    pub fn serving(body: &str) -> Self {
        Self::new([Step::Respond(body.to_string())])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        match steps.pop_front() {
            Some(step) => {
                *last = Some(step.clone());
                step
            }
            None => last
                .clone()
                .unwrap_or(Step::Fail(AttemptError::Transport("empty script".into()))),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<String, AttemptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        self.urls.lock().unwrap().push(url.to_string());

        match self.next_step() {
            Step::Respond(body) => Ok(body),
            Step::Fail(err) => Err(err),
            Step::Slow(delay, body) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Step::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Minimal listing page with an `og:title`.
pub fn listing_page(og_title: &str) -> String {
    format!(
        r#"<html><head><meta property="og:title" content="{og_title}"><title>Airbnb</title></head>
<body><main><h1>Heading</h1><p>"reviewCount":12,"starRating":4.87</p></main></body></html>"#
    )
}
