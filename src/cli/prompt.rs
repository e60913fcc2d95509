//! KnowledgePrompt and KnowledgeHighlighter for Reedline.

use nu_ansi_term::{Color, Style};
use reedline::{
    Highlighter, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, StyledText,
};
use std::borrow::Cow;

use super::commands::COMMANDS;
use crate::session::Language;

/// Prompt showing the active document and language.
pub struct KnowledgePrompt {
    pub document: Option<String>,
    pub language: Language,
    pub is_synthesizing: bool,
}

impl KnowledgePrompt {
    pub fn new(document: Option<&str>, language: Language) -> Self {
        Self {
            document: document.map(str::to_string),
            language,
            is_synthesizing: false,
        }
    }
}

impl Prompt for KnowledgePrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let document = match &self.document {
            Some(name) => Style::new().fg(Color::Yellow).bold().paint(name.as_str()),
            None => Style::new().dimmed().paint("no document"),
        };
        let language = Style::new()
            .dimmed()
            .paint(format!("[{}]", self.language.code()));
        Cow::Owned(format!("{document} {language}"))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        if self.is_synthesizing {
            Cow::Owned(
                Style::new()
                    .fg(Color::Cyan)
                    .paint(self.language.labels().synthesizing)
                    .to_string(),
            )
        } else {
            Cow::Borrowed("")
        }
    }

    fn render_prompt_indicator(&self, _mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed(" ❯ ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(&self, hs: PromptHistorySearch) -> Cow<'_, str> {
        let prefix = match hs.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!("({}search: {}) ", prefix, hs.term))
    }
}

/// Syntax highlighter for slash commands
#[derive(Clone)]
pub struct KnowledgeHighlighter;

impl Highlighter for KnowledgeHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled = StyledText::new();

        if line.starts_with('/') {
            let cmd_end = line.find(' ').unwrap_or(line.len());
            let cmd = &line[..cmd_end];
            let is_valid = COMMANDS.iter().any(|(c, _)| *c == cmd);

            if is_valid {
                styled.push((Style::new().fg(Color::Cyan).bold(), cmd.to_string()));
            } else {
                styled.push((Style::new().fg(Color::Yellow), cmd.to_string()));
            }

            if cmd_end < line.len() {
                styled.push((Style::default(), line[cmd_end..].to_string()));
            }
        } else {
            styled.push((Style::default(), line.to_string()));
        }

        styled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== KnowledgePrompt tests ====================

    #[test]
    fn test_prompt_shows_document_and_language() {
        let prompt = KnowledgePrompt::new(Some("paper.pdf"), Language::Arabic);
        let left = prompt.render_prompt_left();
        assert!(left.contains("paper.pdf"));
        assert!(left.contains("[AR]"));
    }

    #[test]
    fn test_prompt_without_document() {
        let prompt = KnowledgePrompt::new(None, Language::English);
        assert!(prompt.render_prompt_left().contains("no document"));
        assert_eq!(prompt.render_prompt_right(), "");
    }

    #[test]
    fn test_prompt_right_while_synthesizing() {
        let mut prompt = KnowledgePrompt::new(Some("a.pdf"), Language::English);
        prompt.is_synthesizing = true;
        assert!(prompt
            .render_prompt_right()
            .contains("Deconstructing stylometry..."));
    }

    #[test]
    fn test_history_search_indicator() {
        let prompt = KnowledgePrompt::new(None, Language::English);
        let hs = PromptHistorySearch::new(PromptHistorySearchStatus::Failing, "axiom".into());
        assert_eq!(
            prompt.render_prompt_history_search_indicator(hs),
            "(failing search: axiom) "
        );
    }

    // ==================== KnowledgeHighlighter tests ====================

    #[test]
    fn test_highlight_valid_command() {
        let styled = KnowledgeHighlighter.highlight("/upload paper.pdf", 0);
        assert_eq!(styled.buffer.len(), 2);
        assert_eq!(styled.buffer[0].0.foreground, Some(Color::Cyan));
        assert!(styled.buffer[0].0.is_bold);
        assert_eq!(styled.buffer[0].1, "/upload");
        assert_eq!(styled.buffer[1].1, " paper.pdf");
    }

    #[test]
    fn test_highlight_unknown_command() {
        let styled = KnowledgeHighlighter.highlight("/nope", 0);
        assert_eq!(styled.buffer[0].0.foreground, Some(Color::Yellow));
    }

    #[test]
    fn test_highlight_plain_text() {
        let styled = KnowledgeHighlighter.highlight("what is entropy?", 0);
        assert_eq!(styled.buffer.len(), 1);
        assert_eq!(styled.buffer[0].0.foreground, None);
    }
}
