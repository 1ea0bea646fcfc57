use async_trait::async_trait;

use crate::error::AttemptError;

/// One way of pulling a listing page over the network.
///
/// Implementations perform exactly one attempt; retries and the per-attempt
/// timeout belong to [`crate::fetch::Fetcher`], so HTTP and browser
/// transports share the same retry contract.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the document at `url`, failing on any non-2xx status
    async fn get(&self, url: &str) -> Result<String, AttemptError>;

    /// Name of the transport, for logs
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn get(&self, url: &str) -> Result<String, AttemptError> {
        (**self).get(url).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
