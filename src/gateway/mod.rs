//! Content gateway: network access to the poster content generation backend.
//!
//! The engine only ever sees the [`ContentGateway`] trait; the production
//! implementation is [`HttpGateway`]. Fetches never surface errors: an
//! exhausted request resolves to `None` and the caller tries local fallback.

mod http;

pub use http::HttpGateway;

use crate::context::ContextSnapshot;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Callback invoked with a user-facing progress message between retry
/// attempts, so the presentation layer can show that work is ongoing.
pub type ProgressFn = Arc<dyn Fn(String) + Send + Sync>;

/// Content resolved by the gateway for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    /// URL of the generated (lip-synced) video.
    pub video_url: String,
    /// The response text behind the video, when the fetch produced one.
    pub response_text: Option<String>,
}

/// Narrow seam to the content generation backend.
///
/// Implementations retry transient failures internally and must return
/// `None`, never an error, once retries are exhausted or the supplied
/// token is cancelled. Callers treat `None` as "try fallback", never as
/// fatal.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    /// Fetch the introductory video for a resolved object.
    async fn fetch_intro(
        &self,
        content_id: &str,
        progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> Option<GeneratedContent>;

    /// Fetch the response video for a spoken query.
    ///
    /// When `context` is supplied the query routes through the visual-query
    /// chain; the snapshot is consumed by that request and never reused.
    async fn fetch_response(
        &self,
        query: &str,
        content_id: &str,
        context: Option<ContextSnapshot>,
        progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> Option<GeneratedContent>;
}

/// A progress callback that discards messages.
pub fn noop_progress() -> ProgressFn {
    Arc::new(|_| {})
}
