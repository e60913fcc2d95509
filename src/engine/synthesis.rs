//! Chat priming and axiom synthesis for the active document.

use tracing::{debug, error, info, warn};

use super::SessionController;
use crate::backend::prompt::{axiom_request, axiom_schema, chat_system_instruction, initiation_request};
use crate::backend::{BackendError, ChatRequest, Turn};
use crate::messaging::{NoticeLevel, UiEvent};
use crate::session::{parse_axioms, ChatContext, Document, SessionError, AXIOM_COUNT};

impl SessionController {
    /// Prime the chat on the active document and extract its axiom set.
    ///
    /// Returns the number of axioms stored, or `None` when the session moved
    /// on while the backend was working.
    pub async fn refresh_axioms(&self) -> Result<Option<usize>, SessionError> {
        let generation = self.session.lock().await.begin_synthesis()?;
        let result = self.run_synthesis(generation).await;
        self.session.lock().await.finish_synthesis(generation);
        result
    }

    pub(super) async fn run_synthesis(&self, generation: u64) -> Result<Option<usize>, SessionError> {
        let (document, language) = {
            let session = self.session.lock().await;
            if !session.is_current(generation) {
                debug!(generation, "Synthesis superseded before start");
                return Ok(None);
            }
            let document = session.document().cloned().ok_or(SessionError::NoDocument)?;
            (document, session.language())
        };

        self.events
            .publish(UiEvent::AxiomsSynthesizing { generation });
        info!(document = %document.name, language = %language, "Synthesizing axioms");

        let system_instruction = chat_system_instruction(language);

        let primer = match self.prime_chat(&system_instruction, &document).await {
            Ok(primer) => primer,
            Err(err) => return self.fail_synthesis(generation, err).await,
        };
        let primed = self.session.lock().await.set_chat_context(
            generation,
            ChatContext {
                system_instruction: system_instruction.clone(),
                primer,
            },
        );
        if !primed {
            debug!(generation, "Dropping primer for replaced session");
            return Ok(None);
        }

        let request = ChatRequest::new(system_instruction)
            .with_turn(Turn::user_with_document(&document, axiom_request(language)))
            .with_schema(axiom_schema());
        let raw = match self.backend.generate(request).await {
            Ok(raw) => raw,
            Err(err) => return self.fail_synthesis(generation, err).await,
        };

        let items = parse_axioms(&raw);
        let count = items.len();
        if !self.session.lock().await.set_axioms(generation, items) {
            debug!(generation, "Dropping axioms for replaced session");
            return Ok(None);
        }

        info!(count, "Axioms ready");
        if count != AXIOM_COUNT {
            warn!(count, expected = AXIOM_COUNT, "Unexpected axiom count");
        }
        if count == 0 {
            self.events
                .notice(NoticeLevel::Warning, "No axioms could be read from the response.");
        }
        self.events
            .publish(UiEvent::AxiomsReady { generation, count });
        Ok(Some(count))
    }

    /// Run the initiation exchange. The returned turns are replayed ahead of
    /// every chat request.
    async fn prime_chat(
        &self,
        system_instruction: &str,
        document: &Document,
    ) -> Result<Vec<Turn>, BackendError> {
        let opening = Turn::user_with_document(document, initiation_request(&document.name));
        let request = ChatRequest::new(system_instruction).with_turn(opening.clone());
        let reply = self.backend.generate(request).await?;
        debug!(reply_len = reply.len(), "Chat primed");
        Ok(vec![opening, Turn::model(reply)])
    }

    async fn fail_synthesis(
        &self,
        generation: u64,
        err: BackendError,
    ) -> Result<Option<usize>, SessionError> {
        error!(error = %err, generation, "Axiom synthesis failed");
        let err = SessionError::ExtractionFailed(err);
        let message = err.user_message();
        {
            let mut session = self.session.lock().await;
            if !session.is_current(generation) {
                return Ok(None);
            }
            session.set_last_error(message.clone());
        }
        self.events
            .publish(UiEvent::AxiomsFailed { generation, message });
        Err(err)
    }
}
