//! Chat transcript types.

use chrono::{DateTime, Utc};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub is_streaming: bool,
    /// The reply failed and its text is the interruption notice.
    pub interrupted: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::User,
            text: text.into(),
            created_at: Utc::now(),
            is_streaming: false,
            interrupted: false,
        }
    }

    pub fn assistant() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            text: String::new(),
            created_at: Utc::now(),
            is_streaming: true,
            interrupted: false,
        }
    }

    pub fn finish_streaming(&mut self) {
        self.is_streaming = false;
    }

    /// Whether this message belongs in the model's chat history.
    ///
    /// Failed and empty replies are visible in the transcript only.
    pub fn is_replayable(&self) -> bool {
        match self.role {
            MessageRole::User => true,
            MessageRole::Assistant => {
                !self.is_streaming && !self.interrupted && !self.text.trim().is_empty()
            }
        }
    }
}

/// The visible transcript (ordered, append-only during a session).
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    pub messages: Vec<ChatMessage>,
    pub is_generating: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) -> usize {
        self.messages.push(ChatMessage::user(text));
        self.messages.len() - 1
    }

    /// Push an empty streaming assistant message and return its index.
    pub fn start_assistant_message(&mut self) -> usize {
        self.messages.push(ChatMessage::assistant());
        self.is_generating = true;
        self.messages.len() - 1
    }

    /// Append to a streaming message; returns the updated full text.
    ///
    /// Finished messages are immutable, so this is a no-op for them.
    pub fn append_to(&mut self, index: usize, text: &str) -> Option<&str> {
        let msg = self.messages.get_mut(index)?;
        if !msg.is_streaming {
            return None;
        }
        msg.text.push_str(text);
        Some(&msg.text)
    }

    /// Finalize a streaming message.
    pub fn finish(&mut self, index: usize) -> bool {
        self.close(index, None)
    }

    /// Finalize a streaming message whose reply failed, replacing its text
    /// with `notice`.
    pub fn interrupt(&mut self, index: usize, notice: &str) -> bool {
        self.close(index, Some(notice))
    }

    fn close(&mut self, index: usize, notice: Option<&str>) -> bool {
        let Some(msg) = self.messages.get_mut(index) else {
            return false;
        };
        if !msg.is_streaming {
            return false;
        }
        if let Some(text) = notice {
            msg.text = text.to_string();
            msg.interrupted = true;
        }
        msg.finish_streaming();
        self.is_generating = false;
        true
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.is_generating = false;
    }
}
