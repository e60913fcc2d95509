//! Session state for one research session.
//!
//! A [`Session`] owns the active document, the current axiom set, the
//! visible transcript and the primed chat context. Every state replacement
//! (reset, new upload, language switch) bumps the session *generation*.
//! Long-running operations remember the generation they started under and
//! drop their results when it has moved on.
//!
//! ## Usage
//!
//! ```ignore
//! use knowledge_ai::session::{Language, Session};
//!
//! let mut session = Session::new(Language::English);
//! let generation = session.replace_document(document);
//! // ... later, after an await:
//! if session.is_current(generation) {
//!     session.set_axioms(generation, axioms);
//! }
//! ```

mod axioms;
mod document;
mod language;
mod message;

pub use axioms::{parse_axioms, Axiom, AxiomSet, AXIOM_COUNT};
pub use document::{has_pdf_header, is_pdf_file, Document, PDF_MEDIA_TYPE};
pub use language::{Labels, Language, ParseLanguageError};
pub use message::{ChatMessage, Conversation, MessageRole};

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::{BackendError, Turn};

/// Shown when an upload is not a PDF.
pub const UNSUPPORTED_UPLOAD_MESSAGE: &str = "Please upload a valid PDF document.";

/// Shown when axiom extraction fails.
pub const EXTRACTION_FAILED_MESSAGE: &str =
    "The synthesis process encountered an error. Please try again.";

/// Replaces the assistant message when its stream fails.
pub const STREAM_INTERRUPTED_MESSAGE: &str = "Analysis stream interrupted.";

/// Error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unsupported upload: only PDF documents are accepted")]
    UnsupportedMediaType,

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No document loaded")]
    NoDocument,

    #[error("The document is still being analyzed")]
    ChatNotReady,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("A response is already streaming")]
    StreamInFlight,

    #[error("Axiom synthesis already in progress")]
    Busy,

    #[error("Axiom extraction failed: {0}")]
    ExtractionFailed(#[source] BackendError),
}

impl SessionError {
    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::UnsupportedMediaType => UNSUPPORTED_UPLOAD_MESSAGE.to_string(),
            SessionError::ExtractionFailed(_) => EXTRACTION_FAILED_MESSAGE.to_string(),
            SessionError::NoDocument => "Upload a PDF first (/upload <path>).".to_string(),
            other => other.to_string(),
        }
    }
}

/// Identifies one streaming assistant message within one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTicket {
    pub generation: u64,
    pub index: usize,
}

/// How a chat stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    /// The stream failed; the message shows the interruption notice.
    Interrupted,
    /// The session moved on; nothing from the stream was applied.
    Discarded,
}

/// Primed model conversation backing the chat.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub system_instruction: String,
    /// Priming turns (document + initiation request, model reply). Never shown.
    pub primer: Vec<Turn>,
}

/// State of one research session.
#[derive(Debug)]
pub struct Session {
    generation: u64,
    language: Language,
    document: Option<Document>,
    axioms: Option<AxiomSet>,
    transcript: Conversation,
    chat: Option<ChatContext>,
    /// Generation of the outstanding synthesis, if any.
    synthesizing: Option<u64>,
    last_error: Option<String>,
}

impl Session {
    pub fn new(language: Language) -> Self {
        Self {
            generation: 0,
            language,
            document: None,
            axioms: None,
            transcript: Conversation::new(),
            chat: None,
            synthesizing: None,
            last_error: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn axioms(&self) -> Option<&AxiomSet> {
        self.axioms.as_ref()
    }

    pub fn transcript(&self) -> &Conversation {
        &self.transcript
    }

    pub fn chat_context(&self) -> Option<&ChatContext> {
        self.chat.as_ref()
    }

    pub fn is_synthesizing(&self) -> bool {
        self.synthesizing == Some(self.generation)
    }

    pub fn is_streaming(&self) -> bool {
        self.transcript.is_generating
    }

    /// Most recent user-facing error, cleared by the next state replacement.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_last_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Drop every derived piece of state and start a new generation.
    fn invalidate(&mut self) -> u64 {
        self.generation += 1;
        self.axioms = None;
        self.transcript.clear();
        self.chat = None;
        self.synthesizing = None;
        self.last_error = None;
        self.generation
    }

    /// Clear everything except the language.
    pub fn reset(&mut self) -> u64 {
        self.document = None;
        self.invalidate()
    }

    /// Install a new document, discarding all state derived from the old one.
    pub fn replace_document(&mut self, document: Document) -> u64 {
        let generation = self.invalidate();
        self.document = Some(document);
        generation
    }

    /// Switch language. Returns the new generation, or `None` if unchanged.
    pub fn switch_language(&mut self, language: Language) -> Option<u64> {
        if self.language == language {
            return None;
        }
        self.language = language;
        Some(self.invalidate())
    }

    // =========================================================================
    // Synthesis bookkeeping
    // =========================================================================

    /// Claim the synthesis slot for the current generation.
    pub fn begin_synthesis(&mut self) -> Result<u64, SessionError> {
        if self.document.is_none() {
            return Err(SessionError::NoDocument);
        }
        if self.is_synthesizing() {
            return Err(SessionError::Busy);
        }
        self.synthesizing = Some(self.generation);
        self.last_error = None;
        Ok(self.generation)
    }

    /// Release the synthesis slot if `generation` still holds it.
    pub fn finish_synthesis(&mut self, generation: u64) {
        if self.synthesizing == Some(generation) {
            self.synthesizing = None;
        }
    }

    /// Store the primed chat context. Ignored when stale.
    pub fn set_chat_context(&mut self, generation: u64, context: ChatContext) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.chat = Some(context);
        true
    }

    /// Replace the axiom set wholesale. Ignored when stale.
    pub fn set_axioms(&mut self, generation: u64, items: Vec<Axiom>) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        let Some(document) = self.document.as_ref() else {
            return false;
        };
        self.axioms = Some(AxiomSet {
            document: document.name.clone(),
            language: self.language,
            items,
        });
        true
    }

    // =========================================================================
    // Streaming bookkeeping
    // =========================================================================

    /// Append the user utterance and an empty streaming reply.
    pub fn begin_stream(&mut self, text: &str) -> Result<StreamTicket, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if self.transcript.is_generating {
            return Err(SessionError::StreamInFlight);
        }
        if self.document.is_none() {
            return Err(SessionError::NoDocument);
        }
        if self.chat.is_none() {
            return Err(SessionError::ChatNotReady);
        }

        self.transcript.add_user_message(text);
        let index = self.transcript.start_assistant_message();
        Ok(StreamTicket {
            generation: self.generation,
            index,
        })
    }

    /// Model turns for a request: primer, then the replayable exchanges
    /// before the ticket's reply.
    ///
    /// An exchange whose reply failed or came back empty is left out
    /// together with its question.
    pub fn request_turns(&self, ticket: StreamTicket) -> Vec<Turn> {
        let mut turns = self
            .chat
            .as_ref()
            .map(|c| c.primer.clone())
            .unwrap_or_default();

        let history = &self.transcript.messages[..ticket.index.min(self.transcript.len())];
        for (i, message) in history.iter().enumerate() {
            match message.role {
                MessageRole::User => {
                    let failed = history
                        .get(i + 1)
                        .is_some_and(|r| r.role == MessageRole::Assistant && !r.is_replayable());
                    if failed {
                        continue;
                    }
                    turns.push(Turn::user(message.text.clone()));
                }
                MessageRole::Assistant if message.is_replayable() => {
                    turns.push(Turn::model(message.text.clone()));
                }
                MessageRole::Assistant => {}
            }
        }
        turns
    }

    /// Apply one chunk. Returns the updated text, or `None` when stale.
    pub fn apply_chunk(&mut self, ticket: StreamTicket, chunk: &str) -> Option<String> {
        if !self.is_current(ticket.generation) {
            return None;
        }
        self.transcript
            .append_to(ticket.index, chunk)
            .map(str::to_string)
    }

    /// Finalize the ticket's message. Returns `false` when stale.
    pub fn finish_stream(&mut self, ticket: StreamTicket) -> bool {
        if !self.is_current(ticket.generation) {
            return false;
        }
        self.transcript.finish(ticket.index)
    }

    /// Finalize the ticket's message as failed, showing `notice` in its
    /// place. Returns `false` when stale.
    pub fn interrupt_stream(&mut self, ticket: StreamTicket, notice: &str) -> bool {
        if !self.is_current(ticket.generation) {
            return false;
        }
        self.transcript.interrupt(ticket.index, notice)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Language::default())
    }
}
