//! Session controller: drives uploads, axiom synthesis and chat streams.
//!
//! The controller owns the shared [`Session`] and the generation backend.
//! State is guarded by an async mutex that is only held for short, synchronous
//! updates; it is never held across a backend await. Results of a backend
//! call are applied only if the session generation they started under is
//! still current, so a reset or a new upload silently wins over stale work.
//!
//! Every visible change is published on the event bus as a [`UiEvent`].

mod chat;
mod synthesis;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::backend::GenerationBackend;
use crate::messaging::{EventSender, UiEvent};
use crate::session::{AxiomSet, Conversation, Document, Language, Session, SessionError};

/// Point-in-time copy of the session for views.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub language: Language,
    pub document: Option<String>,
    /// Where the manuscript can be opened from.
    pub document_path: Option<PathBuf>,
    pub axioms: Option<AxiomSet>,
    pub transcript: Conversation,
    pub is_synthesizing: bool,
    pub chat_ready: bool,
    pub last_error: Option<String>,
}

/// Handle to one research session. Cheap to clone.
#[derive(Clone)]
pub struct SessionController {
    session: Arc<Mutex<Session>>,
    backend: Arc<dyn GenerationBackend>,
    events: EventSender,
}

impl SessionController {
    pub fn new(backend: Arc<dyn GenerationBackend>, events: EventSender, language: Language) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new(language))),
            backend,
            events,
        }
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock().await;
        SessionSnapshot {
            generation: session.generation(),
            language: session.language(),
            document: session.document().map(|d| d.name.clone()),
            document_path: session.document().map(|d| d.path.clone()),
            axioms: session.axioms().cloned(),
            transcript: session.transcript().clone(),
            is_synthesizing: session.is_synthesizing(),
            chat_ready: session.chat_context().is_some(),
            last_error: session.last_error().map(str::to_string),
        }
    }

    pub async fn language(&self) -> Language {
        self.session.lock().await.language()
    }

    /// Load a PDF from disk and make it the active document.
    ///
    /// A rejected upload leaves the session untouched. An accepted one
    /// replaces all derived state and runs axiom synthesis.
    pub async fn upload(&self, path: &Path) -> Result<(), SessionError> {
        let document = match Document::load(path).await {
            Ok(document) => document,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Upload rejected");
                self.events.publish(UiEvent::UploadRejected {
                    message: err.user_message(),
                });
                return Err(err);
            }
        };

        let name = document.name.clone();
        let size = document.size();
        let generation = self.session.lock().await.replace_document(document);
        info!(document = %name, size, generation, "Document loaded");
        self.events
            .publish(UiEvent::DocumentLoaded { generation, name });

        self.refresh_axioms().await.map(|_| ())
    }

    /// Switch the output language. Clears the transcript and, with a
    /// document loaded, re-synthesizes axioms in the new language.
    pub async fn set_language(&self, language: Language) -> Result<(), SessionError> {
        let (generation, has_document) = {
            let mut session = self.session.lock().await;
            match session.switch_language(language) {
                Some(generation) => (generation, session.document().is_some()),
                None => return Ok(()),
            }
        };
        info!(language = %language, generation, "Language changed");
        self.events.publish(UiEvent::LanguageChanged {
            generation,
            language,
        });

        if has_document {
            self.refresh_axioms().await.map(|_| ())
        } else {
            Ok(())
        }
    }

    /// Drop the document, the axioms and the transcript. The language stays.
    pub async fn reset(&self) -> u64 {
        let generation = self.session.lock().await.reset();
        info!(generation, "Session reset");
        self.events.publish(UiEvent::SessionReset { generation });
        generation
    }
}
