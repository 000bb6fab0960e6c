//! HTTP implementation of the content gateway.
//!
//! Talks JSON to four backend endpoints (`generate-intro`, `process-query`,
//! `generate-lipsync`, `visual-query`). Every request gets up to
//! `max_attempts` tries with exponential backoff; a non-2xx status, a
//! transport error, a malformed body, or `success: false` all count as a
//! failed attempt. All waits race the cancellation token.

use crate::config::GatewayConfig;
use crate::context::ContextSnapshot;
use crate::error::{MuralError, Result};
use crate::gateway::{ContentGateway, GeneratedContent, ProgressFn};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Production gateway backed by `reqwest`.
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Create a gateway from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MuralError::Gateway(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn post_once<R: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<R, String> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        response.json::<R>().await.map_err(|e| e.to_string())
    }

    /// POST with bounded retries, returning the extracted payload string.
    ///
    /// `what` names the content being generated in progress messages.
    async fn post_with_retry<R, F>(
        &self,
        path: &str,
        what: &str,
        body: &serde_json::Value,
        extract: F,
        progress: &ProgressFn,
        cancel: &CancellationToken,
    ) -> Option<String>
    where
        R: DeserializeOwned,
        F: Fn(R) -> Option<String>,
    {
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        let max = self.config.max_attempts.max(1);

        for attempt in 1..=max {
            if cancel.is_cancelled() {
                debug!(path, "fetch cancelled");
                return None;
            }

            let outcome = tokio::select! {
                () = cancel.cancelled() => {
                    debug!(path, "fetch cancelled mid-request");
                    return None;
                }
                result = self.post_once::<R>(&url, body) => result,
            };

            match outcome {
                Ok(response) => match extract(response) {
                    Some(payload) => return Some(payload),
                    None => warn!(path, attempt, "backend reported failure"),
                },
                Err(e) => warn!(path, attempt, error = %e, "gateway request failed"),
            }

            if attempt < max {
                progress.as_ref()(format!(
                    "Still generating {what}\u{2026} (attempt {}/{max})",
                    attempt + 1
                ));
                tokio::select! {
                    () = cancel.cancelled() => return None,
                    () = tokio::time::sleep(backoff_delay(self.config.backoff_initial_ms, attempt)) => {}
                }
            }
        }

        warn!(path, attempts = max, "gateway retries exhausted");
        None
    }
}

#[async_trait]
impl ContentGateway for HttpGateway {
    async fn fetch_intro(
        &self,
        content_id: &str,
        progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> Option<GeneratedContent> {
        let body = json!({ "object_id": content_id });
        let video_url = self
            .post_with_retry(
                "/v1/generate-intro",
                "the introduction",
                &body,
                VideoResponse::into_payload,
                &progress,
                cancel,
            )
            .await?;
        Some(GeneratedContent {
            video_url,
            response_text: None,
        })
    }

    async fn fetch_response(
        &self,
        query: &str,
        content_id: &str,
        context: Option<ContextSnapshot>,
        progress: ProgressFn,
        cancel: &CancellationToken,
    ) -> Option<GeneratedContent> {
        // Step 1: text answer, visual chain when a snapshot was captured.
        // The snapshot is consumed here and must not survive this request.
        let response_text = match context {
            Some(snapshot) => {
                let image = BASE64.encode(&snapshot.data);
                drop(snapshot);
                self.post_with_retry(
                    "/v1/visual-query",
                    "an answer",
                    &json!({ "object_id": content_id, "query": query, "image": image }),
                    TextResponse::into_payload,
                    &progress,
                    cancel,
                )
                .await?
            }
            None => {
                self.post_with_retry(
                    "/v1/process-query",
                    "an answer",
                    &json!({ "object_id": content_id, "query": query }),
                    TextResponse::into_payload,
                    &progress,
                    cancel,
                )
                .await?
            }
        };

        // Step 2: lip-synced video for the answer text.
        let video_url = self
            .post_with_retry(
                "/v1/generate-lipsync",
                "the response video",
                &json!({ "object_id": content_id, "text": response_text }),
                VideoResponse::into_payload,
                &progress,
                cancel,
            )
            .await?;

        Some(GeneratedContent {
            video_url,
            response_text: Some(response_text),
        })
    }
}

/// Exponential backoff before attempt `attempt + 1`, doubling per attempt.
fn backoff_delay(initial_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(initial_ms.saturating_mul(1_u64 << attempt.saturating_sub(1).min(16)))
}

// ── Wire types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct VideoResponse {
    success: bool,
    #[serde(default)]
    video_url: Option<String>,
}

impl VideoResponse {
    fn into_payload(self) -> Option<String> {
        if self.success { self.video_url } else { None }
    }
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    success: bool,
    #[serde(default)]
    response_text: Option<String>,
}

impl TextResponse {
    fn into_payload(self) -> Option<String> {
        if self.success { self.response_text } else { None }
    }
}
