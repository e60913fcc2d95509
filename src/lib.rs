//! Knowledge AI Library
//!
//! Terminal research companion: upload a PDF, extract its conceptual axioms
//! and chat with a streaming model grounded in the document.
//!
//! ## Main Components
//!
//! - [`backend`] - Generation backend trait and the Gemini client
//! - [`cli`] - Command-line interface (REPL, commands, runner)
//! - [`config`] - Configuration and settings management
//! - [`engine`] - Session controller (upload, synthesis, chat streams)
//! - [`format`] - Streaming text formatter (Markdown, LaTeX, code)
//! - [`messaging`] - Event bus between the engine and views
//! - [`render`] - Terminal and HTML renderers
//! - [`session`] - Session state, documents, axioms and transcript
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use knowledge_ai::{EventBus, GeminiBackend, Language, SessionController, Settings};
//!
//! let settings = Settings::load()?;
//! let backend = GeminiBackend::from_settings(&settings, settings.api_key_from_env()?)?;
//! let bus = EventBus::new();
//! let controller = SessionController::new(Arc::new(backend), bus.sender(), Language::English);
//! controller.upload("paper.pdf".as_ref()).await?;
//! controller.send_message("What is the central claim?").await?;
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod format;
pub mod messaging;
pub mod render;
pub mod session;

// Re-export commonly used types
pub use backend::{BackendError, ChatRequest, GeminiBackend, GenerationBackend, TokenStream, Turn};
pub use config::{Settings, XdgDirs};
pub use engine::{SessionController, SessionSnapshot};
pub use format::{format_text, Block, CodeBlock, Inline, MathRenderer, RenderTree};
pub use messaging::{EventBus, EventReceiver, EventSender, NoticeLevel, UiEvent};
pub use render::{render_transcript, TerminalRenderer, TrustedHtml};
pub use session::{
    Axiom, AxiomSet, ChatMessage, Conversation, Document, Language, MessageRole, Session,
    SessionError, StreamOutcome,
};
