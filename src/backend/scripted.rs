//! Scripted backend for engine tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::traits::{BackendError, ChatRequest, GenerationBackend, TokenStream};

/// How a queued stream behaves once opened.
pub enum ScriptedStream {
    /// Emit chunks, then close cleanly.
    Chunks(Vec<String>),
    /// Emit chunks, then fail.
    FailAfter(Vec<String>),
    /// Fail to open.
    OpenError,
    /// Chunks are fed by the test through the paired sender.
    Manual(mpsc::Receiver<Result<String, BackendError>>),
}

/// A queued `generate` reply.
enum ScriptedReply {
    Ready(Result<String, BackendError>),
    /// Held until the test sends it through the paired sender.
    Gated(oneshot::Receiver<Result<String, BackendError>>),
}

/// Backend returning queued responses in order and recording every request.
#[derive(Default)]
pub struct ScriptedBackend {
    generations: Mutex<VecDeque<ScriptedReply>>,
    streams: Mutex<VecDeque<ScriptedStream>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_generate(&self, response: Result<String, BackendError>) -> &Self {
        self.generations
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Ready(response));
        self
    }

    /// Queue a `generate` reply that stays pending until the test sends it.
    pub fn push_gated_generate(&self) -> oneshot::Sender<Result<String, BackendError>> {
        let (tx, rx) = oneshot::channel();
        self.generations
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Gated(rx));
        tx
    }

    /// Yield until at least `count` requests have been recorded.
    pub async fn wait_for_requests(&self, count: usize) {
        while self.requests.lock().unwrap().len() < count {
            tokio::task::yield_now().await;
        }
    }

    pub fn push_stream(&self, stream: ScriptedStream) -> &Self {
        self.streams.lock().unwrap().push_back(stream);
        self
    }

    /// Queue a stream whose chunks the test sends by hand.
    pub fn push_manual_stream(&self) -> mpsc::Sender<Result<String, BackendError>> {
        let (tx, rx) = mpsc::channel(16);
        self.push_stream(ScriptedStream::Manual(rx));
        tx
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: ChatRequest) -> Result<String, BackendError> {
        self.requests.lock().unwrap().push(request);
        let next = self.generations.lock().unwrap().pop_front();
        match next {
            Some(ScriptedReply::Ready(response)) => response,
            Some(ScriptedReply::Gated(rx)) => rx.await.unwrap_or(Err(BackendError::StreamClosed)),
            None => Err(BackendError::Decode("no scripted response".into())),
        }
    }

    async fn stream(&self, request: ChatRequest) -> Result<TokenStream, BackendError> {
        self.requests.lock().unwrap().push(request);
        let script = self.streams.lock().unwrap().pop_front();

        let (chunks, fail) = match script {
            Some(ScriptedStream::Chunks(chunks)) => (chunks, false),
            Some(ScriptedStream::FailAfter(chunks)) => (chunks, true),
            Some(ScriptedStream::Manual(rx)) => return Ok(TokenStream::new(rx)),
            Some(ScriptedStream::OpenError) | None => {
                return Err(BackendError::Status {
                    status: 503,
                    body: "unavailable".into(),
                })
            }
        };

        let (tx, stream) = TokenStream::channel(chunks.len() + 1);
        for chunk in chunks {
            let _ = tx.send(Ok(chunk)).await;
        }
        if fail {
            let _ = tx.send(Err(BackendError::StreamClosed)).await;
        }
        Ok(stream)
    }
}
