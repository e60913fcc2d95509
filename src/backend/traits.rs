//! Generation backend abstraction.
//!
//! The session engine talks to generative models only through
//! [`GenerationBackend`], so tests can script responses and the real client
//! can be swapped without touching chat or synthesis logic.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::session::Document;

/// Errors surfaced by a generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("No API key configured (set GEMINI_API_KEY or api_key in settings.json)")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Response was blocked: {0}")]
    Blocked(String),

    #[error("Stream closed unexpectedly")]
    StreamClosed,
}

/// Who authored a turn in the model conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

/// One part of a turn: plain text or an inline binary payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPart {
    Text(String),
    InlineData { mime_type: String, data: String },
}

/// A single conversation turn sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<TurnPart>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![TurnPart::Text(text.into())],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![TurnPart::Text(text.into())],
        }
    }

    /// A user turn carrying the document bytes followed by a text request.
    pub fn user_with_document(document: &Document, text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![
                TurnPart::InlineData {
                    mime_type: document.media_type.clone(),
                    data: document.data_base64.clone(),
                },
                TurnPart::Text(text.into()),
            ],
        }
    }

    /// Concatenated text parts, ignoring inline data.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                TurnPart::Text(t) => Some(t.as_str()),
                TurnPart::InlineData { .. } => None,
            })
            .collect()
    }
}

/// A model request: system instruction plus ordered turns.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub system_instruction: String,
    pub turns: Vec<Turn>,
    /// JSON schema constraining the response. `None` means free text.
    pub response_schema: Option<serde_json::Value>,
}

impl ChatRequest {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            ..Default::default()
        }
    }

    pub fn with_turns(mut self, turns: impl IntoIterator<Item = Turn>) -> Self {
        self.turns.extend(turns);
        self
    }

    pub fn with_turn(mut self, turn: Turn) -> Self {
        self.turns.push(turn);
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Receiver for streamed text chunks.
///
/// Wraps an mpsc receiver fed by the backend's streaming task. Chunks arrive
/// in the order the backend produced them.
pub struct TokenStream {
    rx: mpsc::Receiver<Result<String, BackendError>>,
}

impl TokenStream {
    pub fn new(rx: mpsc::Receiver<Result<String, BackendError>>) -> Self {
        Self { rx }
    }

    /// Create a connected sender/stream pair.
    pub fn channel(buffer: usize) -> (mpsc::Sender<Result<String, BackendError>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }

    /// Receive the next chunk. Returns `None` when the stream is complete.
    pub async fn recv(&mut self) -> Option<Result<String, BackendError>> {
        self.rx.recv().await
    }
}

/// A generative model the session can query.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Model identifier, for logging.
    fn model(&self) -> &str;

    /// Run a request to completion and return the response text.
    async fn generate(&self, request: ChatRequest) -> Result<String, BackendError>;

    /// Open a streaming response.
    async fn stream(&self, request: ChatRequest) -> Result<TokenStream, BackendError>;
}
