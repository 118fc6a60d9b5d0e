//! Compliance collector upload client.
//!
//! Implements [`pipeline::EvidenceSink`]: one `POST` per evidence document,
//! carrying a body already encoded by `pipeline::multipart`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Headers, authentication and response decoding live
//! here. The body bytes are sent exactly as encoded.
//!
//! ## Request
//!
//! | Header | Value |
//! |--------|-------|
//! | `Authorization` | `Basic base64(username:password)` |
//! | `X-API-KEY` | configured API key |
//! | `Content-Type` | `multipart/form-data; boundary=<token>` |
//! | `Charset` | `utf-8` |
//!
//! Only `201 Created` is a success; its body is `{"id": "<upload id>"}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use pipeline::{EvidenceSink, MultipartBody, UploadError, UploadResult};

/// Longest slice of a rejection body kept for diagnostics, in characters.
pub const SNIPPET_CHARS: usize = 256;

/// Collector endpoint settings.
#[derive(Clone, Deserialize)]
pub struct CollectorConfig {
    /// Full upload URL.
    pub url: String,
    pub username: String,
    pub password: String,
    pub api_key: String,
    /// Whole-request timeout. No timeout when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for CollectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Uploads evidence to the collector endpoint.
#[derive(Debug, Clone)]
pub struct CollectorClient {
    client: Client,
    config: CollectorConfig,
}

impl CollectorClient {
    pub fn new(config: CollectorConfig) -> Result<Self, UploadError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| UploadError::Transport {
            message: e.to_string(),
        })?;
        Ok(Self { client, config })
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

#[async_trait]
impl EvidenceSink for CollectorClient {
    #[instrument(skip(self, body), fields(url = %self.config.url, bytes = body.len()))]
    async fn upload(&self, body: MultipartBody) -> Result<UploadResult, UploadError> {
        let content_type = body.content_type();

        let response = self
            .client
            .post(&self.config.url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("X-API-KEY", &self.config.api_key)
            .header("Charset", "utf-8")
            .header(CONTENT_TYPE, content_type)
            .body(body.into_bytes())
            .send()
            .await
            .map_err(|e| UploadError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::CREATED {
            // Rejection bodies are kept for diagnostics only, never decoded.
            let text = match response.text().await {
                Ok(text) => text,
                Err(err) => {
                    debug!(error = %err, "Rejection body could not be read");
                    String::new()
                }
            };
            warn!(status = status.as_u16(), "Collector rejected upload");
            return Err(UploadError::UnexpectedStatus {
                status: status.as_u16(),
                body_snippet: snippet(&text),
            });
        }

        let bytes = response.bytes().await.map_err(|e| UploadError::Transport {
            message: e.to_string(),
        })?;
        let result: UploadResult =
            serde_json::from_slice(&bytes).map_err(|e| UploadError::MalformedResponse {
                status: status.as_u16(),
                message: e.to_string(),
            })?;
        if result.id.as_str().is_empty() {
            return Err(UploadError::MalformedResponse {
                status: status.as_u16(),
                message: "empty upload id".into(),
            });
        }

        debug!(upload_id = %result.id, "Upload accepted");
        Ok(result)
    }
}
