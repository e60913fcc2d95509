//! Streaming chat replies.

use tracing::{debug, info, warn};

use super::SessionController;
use crate::backend::{ChatRequest, TokenStream};
use crate::messaging::UiEvent;
use crate::session::{
    MessageRole, SessionError, StreamOutcome, StreamTicket, STREAM_INTERRUPTED_MESSAGE,
};

impl SessionController {
    /// Send a user message and stream the assistant reply into the transcript.
    ///
    /// Each applied chunk publishes `MessageUpdated` with the reply's full
    /// text. Chunks that arrive after the session was replaced are dropped
    /// and the call returns [`StreamOutcome::Discarded`].
    pub async fn send_message(&self, text: &str) -> Result<StreamOutcome, SessionError> {
        let (ticket, request) = {
            let mut session = self.session.lock().await;
            let ticket = session.begin_stream(text)?;
            let system_instruction = session
                .chat_context()
                .map(|c| c.system_instruction.clone())
                .unwrap_or_default();
            let request =
                ChatRequest::new(system_instruction).with_turns(session.request_turns(ticket));
            (ticket, request)
        };

        self.events.publish(UiEvent::MessageStarted {
            generation: ticket.generation,
            index: ticket.index - 1,
            role: MessageRole::User,
        });
        self.events.publish(UiEvent::MessageStarted {
            generation: ticket.generation,
            index: ticket.index,
            role: MessageRole::Assistant,
        });
        info!(turns = request.turns.len(), "Streaming reply");

        let outcome = match self.backend.stream(request).await {
            Ok(stream) => self.consume(ticket, stream).await,
            Err(err) => {
                warn!(error = %err, "Failed to open stream");
                self.interrupt(ticket).await
            }
        };

        self.events.publish(UiEvent::StreamFinished {
            generation: ticket.generation,
            index: ticket.index,
            outcome,
        });
        Ok(outcome)
    }

    async fn consume(&self, ticket: StreamTicket, mut stream: TokenStream) -> StreamOutcome {
        let mut chunks = 0usize;
        while let Some(chunk) = stream.recv().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(error = %err, chunks, "Stream failed");
                    return self.interrupt(ticket).await;
                }
            };

            let Some(text) = self.session.lock().await.apply_chunk(ticket, &chunk) else {
                debug!(chunks, "Session replaced mid-stream, discarding reply");
                return StreamOutcome::Discarded;
            };
            chunks += 1;
            self.events.publish(UiEvent::MessageUpdated {
                generation: ticket.generation,
                index: ticket.index,
                text,
            });
        }

        if self.session.lock().await.finish_stream(ticket) {
            debug!(chunks, "Stream completed");
            StreamOutcome::Completed
        } else {
            StreamOutcome::Discarded
        }
    }

    /// Replace the reply with the interruption notice.
    async fn interrupt(&self, ticket: StreamTicket) -> StreamOutcome {
        if !self
            .session
            .lock()
            .await
            .interrupt_stream(ticket, STREAM_INTERRUPTED_MESSAGE)
        {
            return StreamOutcome::Discarded;
        }
        self.events.publish(UiEvent::MessageUpdated {
            generation: ticket.generation,
            index: ticket.index,
            text: STREAM_INTERRUPTED_MESSAGE.to_string(),
        });
        StreamOutcome::Interrupted
    }
}
