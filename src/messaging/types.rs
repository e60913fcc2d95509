//! Event types for engine-UI communication.

use crate::session::{Language, MessageRole, StreamOutcome};

/// Notice levels for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Events published by the session engine.
///
/// Every variant tied to session state carries the generation it was
/// produced under, so a view can ignore events from a replaced session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A document passed validation and became active.
    DocumentLoaded { generation: u64, name: String },
    /// An upload was refused; state is unchanged.
    UploadRejected { message: String },
    AxiomsSynthesizing { generation: u64 },
    AxiomsReady { generation: u64, count: usize },
    AxiomsFailed { generation: u64, message: String },
    LanguageChanged { generation: u64, language: Language },
    MessageStarted {
        generation: u64,
        index: usize,
        role: MessageRole,
    },
    /// Re-render trigger: the message's full text after a chunk was applied.
    MessageUpdated {
        generation: u64,
        index: usize,
        text: String,
    },
    StreamFinished {
        generation: u64,
        index: usize,
        outcome: StreamOutcome,
    },
    SessionReset { generation: u64 },
    /// Free-form status line.
    Notice { level: NoticeLevel, text: String },
}

impl UiEvent {
    pub fn notice(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self::Notice {
            level,
            text: text.into(),
        }
    }

    /// Generation the event belongs to, if it is tied to session state.
    pub fn generation(&self) -> Option<u64> {
        match self {
            UiEvent::DocumentLoaded { generation, .. }
            | UiEvent::AxiomsSynthesizing { generation }
            | UiEvent::AxiomsReady { generation, .. }
            | UiEvent::AxiomsFailed { generation, .. }
            | UiEvent::LanguageChanged { generation, .. }
            | UiEvent::MessageStarted { generation, .. }
            | UiEvent::MessageUpdated { generation, .. }
            | UiEvent::StreamFinished { generation, .. }
            | UiEvent::SessionReset { generation } => Some(*generation),
            UiEvent::UploadRejected { .. } | UiEvent::Notice { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_constructor() {
        assert_eq!(
            UiEvent::notice(NoticeLevel::Warning, "careful"),
            UiEvent::Notice {
                level: NoticeLevel::Warning,
                text: "careful".into()
            }
        );
    }

    #[test]
    fn test_generation_accessor() {
        let event = UiEvent::MessageUpdated {
            generation: 7,
            index: 1,
            text: "hi".into(),
        };
        assert_eq!(event.generation(), Some(7));
        assert_eq!(UiEvent::notice(NoticeLevel::Info, "x").generation(), None);
        assert_eq!(
            UiEvent::UploadRejected {
                message: "no".into()
            }
            .generation(),
            None
        );
    }
}
