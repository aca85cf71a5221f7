use url::Url;

use crate::errors::Result;

/// Contract for the interactive web-navigation surface that hosts the signin
/// page. The client depends only on this trait, not on any rendering stack.
///
/// `capture_redirect` replaces the original event-callback observation with an
/// awaitable, cancellable operation: it navigates, then resolves either with
/// the first observed address containing `marker` or with `None` once the user
/// closes the surface without completing the flow. Implementations close the
/// window themselves before returning.
#[async_trait::async_trait]
pub trait InteractiveSurface: Send + Sync {
    /// Delete all cookies scoped to `domain` before a fresh login.
    async fn delete_domain_cookies(&self, domain: &str) -> Result<()>;

    /// Open `url` with the given user agent and wait for a matching redirect.
    async fn capture_redirect(
        &self,
        url: Url,
        user_agent: &str,
        marker: &str,
    ) -> Result<Option<String>>;
}
