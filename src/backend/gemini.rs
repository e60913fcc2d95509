//! Gemini REST backend.
//!
//! # Endpoints
//!
//! - `models/{model}:generateContent` - one-shot generation (primer, axioms)
//! - `models/{model}:streamGenerateContent?alt=sse` - streamed chat replies
//!
//! Authentication is the `x-goog-api-key` header. The key is only required
//! when a request is actually sent.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, trace, warn};

use super::sse::SseDecoder;
use super::traits::{BackendError, ChatRequest, GenerationBackend, TokenStream};
use super::wire::{GenerateContentRequest, GenerateContentResponse};
use crate::config::Settings;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Channel depth between the HTTP task and the consumer.
const STREAM_BUFFER: usize = 64;

/// Gemini backend client
#[derive(Clone)]
pub struct GeminiBackend {
    base_url: String,
    model: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl GeminiBackend {
    /// Create a new Gemini backend.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            http_client: builder.build()?,
        })
    }

    /// Create from settings with an already-resolved API key.
    pub fn from_settings(settings: &Settings, api_key: Option<String>) -> Result<Self, BackendError> {
        Self::new(
            settings.base_url.clone(),
            settings.model.clone(),
            api_key,
            settings.connect_timeout_secs.map(Duration::from_secs),
        )
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    fn generate_url(&self) -> String {
        self.endpoint("generateContent")
    }

    fn stream_url(&self) -> String {
        format!("{}?alt=sse", self.endpoint("streamGenerateContent"))
    }

    async fn post(
        &self,
        url: &str,
        request: &ChatRequest,
    ) -> Result<reqwest::Response, BackendError> {
        let api_key = self.api_key.as_deref().ok_or(BackendError::MissingApiKey)?;
        let body = GenerateContentRequest::from(request);

        let response = self
            .http_client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, model = %self.model, "Gemini request failed");
            return Err(BackendError::Status { status, body });
        }

        Ok(response)
    }
}

/// Decode one SSE payload into its text delta.
fn decode_event(payload: &str) -> Result<String, BackendError> {
    let response: GenerateContentResponse =
        serde_json::from_str(payload).map_err(|e| BackendError::Decode(e.to_string()))?;
    if let Some(reason) = response.block_reason() {
        return Err(BackendError::Blocked(reason.to_string()));
    }
    Ok(response.text())
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: ChatRequest) -> Result<String, BackendError> {
        debug!(model = %self.model, turns = request.turns.len(), "generateContent");

        let response: GenerateContentResponse = self
            .post(&self.generate_url(), &request)
            .await?
            .json()
            .await?;

        if let Some(reason) = response.block_reason() {
            return Err(BackendError::Blocked(reason.to_string()));
        }
        trace!(finish_reason = ?response.finish_reason(), "generateContent finished");
        Ok(response.text())
    }

    async fn stream(&self, request: ChatRequest) -> Result<TokenStream, BackendError> {
        debug!(model = %self.model, turns = request.turns.len(), "streamGenerateContent");

        let response = self.post(&self.stream_url(), &request).await?;
        let mut bytes = response.bytes_stream();
        let (tx, stream) = TokenStream::channel(STREAM_BUFFER);

        // Spawn task to process stream
        tokio::spawn(async move {
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(BackendError::Http(e))).await;
                        return;
                    }
                };

                for payload in decoder.push(&chunk) {
                    match decode_event(&payload) {
                        Ok(text) if text.is_empty() => {}
                        Ok(text) => {
                            if tx.send(Ok(text)).await.is_err() {
                                // Receiver dropped, stop streaming
                                return;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            if let Some(payload) = decoder.finish() {
                match decode_event(&payload) {
                    Ok(text) if !text.is_empty() => {
                        let _ = tx.send(Ok(text)).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                    }
                }
            }
        });

        Ok(stream)
    }
}
