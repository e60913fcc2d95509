//! Generation backends.
//!
//! - [`GenerationBackend`]: the trait the session engine depends on
//! - [`GeminiBackend`]: Gemini REST client with SSE streaming
//! - [`prompt`]: instruction profile and request texts

mod gemini;
pub mod prompt;
mod sse;
mod traits;
mod wire;

#[cfg(test)]
pub mod scripted;

pub use gemini::{GeminiBackend, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use sse::SseDecoder;
pub use traits::{
    BackendError, ChatRequest, GenerationBackend, TokenStream, Turn, TurnPart, TurnRole,
};
