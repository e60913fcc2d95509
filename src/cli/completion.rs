//! Reedline completion with Tab-triggered menu.
//!
//! Type "/" then Tab to see commands. `/upload` completes PDF paths and
//! `/lang` completes language codes.

use std::path::Path;

use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, Emacs, KeyCode, KeyModifiers, MenuBuilder, Reedline, ReedlineEvent,
    ReedlineMenu, Span, Suggestion,
};

use super::commands::COMMANDS;
use super::prompt::KnowledgeHighlighter;
use crate::session::{is_pdf_file, Language};

/// Maximum number of path suggestions shown at once.
const MAX_PATH_SUGGESTIONS: usize = 20;

/// Completer for slash commands and their arguments.
#[derive(Clone, Default)]
pub struct KnowledgeCompleter;

impl KnowledgeCompleter {
    pub fn new() -> Self {
        Self
    }
}

impl Completer for KnowledgeCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if pos > line.len() || !line.is_char_boundary(pos) {
            return Vec::new();
        }

        let input = &line[..pos];

        if input.is_empty() || !input.starts_with('/') {
            return Vec::new();
        }

        // Command completion (no space yet)
        if !input.contains(' ') {
            return complete_command(input, pos);
        }

        if let Some(arg) = input.strip_prefix("/upload ") {
            return complete_pdf_path(arg, pos);
        }

        if let Some(arg) = input.strip_prefix("/lang ") {
            return complete_language(arg, pos);
        }

        Vec::new()
    }
}

fn complete_command(input: &str, pos: usize) -> Vec<Suggestion> {
    let prefix = input.to_lowercase();
    COMMANDS
        .iter()
        .filter(|(cmd, _)| cmd.to_lowercase().starts_with(&prefix))
        .take(10)
        .map(|(cmd, desc)| Suggestion {
            value: cmd.to_string(),
            description: Some(desc.to_string()),
            extra: None,
            span: Span::new(0, pos),
            append_whitespace: true,
            style: None,
        })
        .collect()
}

fn complete_language(arg: &str, pos: usize) -> Vec<Suggestion> {
    let prefix = arg.trim().to_lowercase();
    Language::ALL
        .iter()
        .map(|lang| (lang, lang.code().to_lowercase()))
        .filter(|(_, code)| code.starts_with(&prefix))
        .map(|(lang, code)| Suggestion {
            value: code,
            description: Some(lang.name().to_string()),
            extra: None,
            span: Span::new(pos - arg.len(), pos),
            append_whitespace: false,
            style: None,
        })
        .collect()
}

/// Suggest directories and `.pdf` files matching the typed path prefix.
fn complete_pdf_path(arg: &str, pos: usize) -> Vec<Suggestion> {
    let expanded = shellexpand::tilde(arg).into_owned();
    let (dir, file_prefix) = match expanded.rfind('/') {
        Some(i) => (&expanded[..=i], &expanded[i + 1..]),
        None => ("", expanded.as_str()),
    };
    let read_from = if dir.is_empty() { Path::new(".") } else { Path::new(dir) };

    let Ok(entries) = std::fs::read_dir(read_from) else {
        return Vec::new();
    };

    let mut suggestions: Vec<Suggestion> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            if !name.starts_with(file_prefix) || name.starts_with('.') {
                return None;
            }
            let path = entry.path();
            let is_dir = path.is_dir();
            if !is_dir && !is_pdf_file(&path) {
                return None;
            }
            let value = if is_dir {
                format!("{dir}{name}/")
            } else {
                format!("{dir}{name}")
            };
            Some(Suggestion {
                value,
                description: None,
                extra: None,
                span: Span::new(pos - arg.len(), pos),
                append_whitespace: !is_dir,
                style: None,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| a.value.cmp(&b.value));
    suggestions.truncate(MAX_PATH_SUGGESTIONS);
    suggestions
}

/// Create a line editor with completion and highlighting.
pub fn create_reedline() -> Reedline {
    // Clean menu style - no heavy borders
    let completion_menu = Box::new(
        ColumnarMenu::default()
            .with_name("completion_menu")
            .with_columns(1)
            .with_column_padding(2)
            .with_text_style(Style::new().fg(Color::Default))
            .with_selected_text_style(Style::new().fg(Color::Black).on(Color::Cyan))
            .with_description_text_style(Style::new().fg(Color::DarkGray)),
    );

    let mut keybindings = reedline::default_emacs_keybindings();

    // Tab to show/navigate menu
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );

    // Shift+Tab to go back
    keybindings.add_binding(
        KeyModifiers::SHIFT,
        KeyCode::BackTab,
        ReedlineEvent::MenuPrevious,
    );

    Reedline::create()
        .with_completer(Box::new(KnowledgeCompleter::new()))
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_quick_completions(true)
        .with_partial_completions(true)
        .with_highlighter(Box::new(KnowledgeHighlighter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)))
}
