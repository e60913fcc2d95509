//! Terminal renderer for render trees, axioms and notices.

use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};

use crate::format::{
    format_text, highlight, render_math, Block, CodeBlock, Inline, MathRenderer, RenderTree,
    TokenKind, UnicodeMathRenderer,
};
use crate::messaging::NoticeLevel;
use crate::session::{AxiomSet, ChatMessage, Labels, MessageRole};

/// Render style configuration.
#[derive(Debug, Clone)]
pub struct RenderStyle {
    pub info_color: Color,
    pub success_color: Color,
    pub warning_color: Color,
    pub error_color: Color,
    pub heading_color: Color,
    pub emphasis_color: Color,
    pub math_color: Color,
    pub gutter_color: Color,
    pub user_color: Color,
    pub assistant_color: Color,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            info_color: Color::White,
            success_color: Color::Green,
            warning_color: Color::Yellow,
            error_color: Color::Red,
            heading_color: Color::Cyan,
            emphasis_color: Color::Yellow,
            math_color: Color::Magenta,
            gutter_color: Color::DarkGrey,
            user_color: Color::Blue,
            assistant_color: Color::Green,
        }
    }
}

impl RenderStyle {
    fn token_color(&self, kind: TokenKind) -> Option<Color> {
        match kind {
            TokenKind::Plain => None,
            TokenKind::String => Some(Color::Green),
            TokenKind::Comment => Some(Color::DarkGrey),
            TokenKind::Number => Some(Color::DarkYellow),
            TokenKind::Keyword => Some(Color::Magenta),
            TokenKind::Function => Some(Color::Blue),
            TokenKind::Operator => Some(Color::Cyan),
        }
    }
}

/// Writes formatted output to any [`Write`] sink.
pub struct TerminalRenderer {
    style: RenderStyle,
    math: Box<dyn MathRenderer>,
}

impl TerminalRenderer {
    /// Create a new renderer.
    pub fn new() -> Self {
        Self::with_style(RenderStyle::default())
    }

    /// Create with custom style.
    pub fn with_style(style: RenderStyle) -> Self {
        Self {
            style,
            math: Box::new(UnicodeMathRenderer),
        }
    }

    pub fn with_math_renderer(mut self, math: Box<dyn MathRenderer>) -> Self {
        self.math = math;
        self
    }

    /// Format `text` and render it.
    pub fn render_text<W: Write>(&self, out: &mut W, text: &str) -> io::Result<()> {
        self.render_tree(out, &format_text(text))
    }

    /// Every block occupies its own line (or lines, for math and code).
    pub fn render_tree<W: Write>(&self, out: &mut W, tree: &RenderTree) -> io::Result<()> {
        for block in &tree.blocks {
            match block {
                Block::Paragraph(spans) => {
                    for span in spans {
                        self.render_inline(out, span)?;
                    }
                    queue!(out, Print("\n"))?;
                }
                Block::Heading(text) => queue!(
                    out,
                    SetForegroundColor(self.style.heading_color),
                    SetAttribute(Attribute::Bold),
                    Print(text),
                    SetAttribute(Attribute::Reset),
                    ResetColor,
                    Print("\n")
                )?,
                Block::LineBreak => queue!(out, Print("\n"))?,
                Block::Math(tex) => self.render_display_math(out, tex)?,
                Block::Code(code) => self.render_code_block(out, code)?,
            }
        }
        out.flush()
    }

    fn render_inline<W: Write>(&self, out: &mut W, span: &Inline) -> io::Result<()> {
        match span {
            Inline::Text(text) => queue!(out, Print(text)),
            Inline::BoldItalic(text) => queue!(
                out,
                SetForegroundColor(self.style.emphasis_color),
                SetAttribute(Attribute::Bold),
                SetAttribute(Attribute::Italic),
                Print(text),
                SetAttribute(Attribute::Reset),
                ResetColor
            ),
            Inline::Math(tex) => {
                let output = render_math(self.math.as_ref(), tex, false);
                if output.is_fallback() {
                    queue!(
                        out,
                        SetForegroundColor(self.style.gutter_color),
                        Print(format!("${}$", output.text())),
                        ResetColor
                    )
                } else {
                    queue!(
                        out,
                        SetForegroundColor(self.style.math_color),
                        Print(output.text()),
                        ResetColor
                    )
                }
            }
        }
    }

    fn render_display_math<W: Write>(&self, out: &mut W, tex: &str) -> io::Result<()> {
        let output = render_math(self.math.as_ref(), tex, true);
        let (color, text) = if output.is_fallback() {
            (self.style.gutter_color, format!("$${}$$", output.text()))
        } else {
            (self.style.math_color, output.text().to_string())
        };
        queue!(
            out,
            Print("    "),
            SetForegroundColor(color),
            Print(text),
            ResetColor,
            Print("\n")
        )
    }

    /// Render a code block with a language label and a gutter.
    pub fn render_code_block<W: Write>(&self, out: &mut W, code: &CodeBlock) -> io::Result<()> {
        let label = code.language.as_deref().unwrap_or("code");
        queue!(
            out,
            SetForegroundColor(self.style.gutter_color),
            Print(format!("╭─ {label}\n")),
            Print("│ "),
            ResetColor
        )?;

        for token in highlight(&code.content) {
            let color = self.style.token_color(token.kind);
            // Tokens may span lines; every newline reopens the gutter.
            let mut lines = token.text.split('\n').peekable();
            while let Some(piece) = lines.next() {
                if !piece.is_empty() {
                    match color {
                        Some(color) => {
                            queue!(out, SetForegroundColor(color), Print(piece), ResetColor)?
                        }
                        None => queue!(out, Print(piece))?,
                    }
                }
                if lines.peek().is_some() {
                    queue!(
                        out,
                        Print("\n"),
                        SetForegroundColor(self.style.gutter_color),
                        Print("│ "),
                        ResetColor
                    )?;
                }
            }
        }

        queue!(
            out,
            Print("\n"),
            SetForegroundColor(self.style.gutter_color),
            Print("╰─\n"),
            ResetColor
        )
    }

    /// Render one transcript message with its speaker label.
    pub fn render_message<W: Write>(
        &self,
        out: &mut W,
        message: &ChatMessage,
        labels: &Labels,
    ) -> io::Result<()> {
        let (label, color) = match message.role {
            MessageRole::User => (labels.user, self.style.user_color),
            MessageRole::Assistant => (labels.assistant, self.style.assistant_color),
        };
        queue!(
            out,
            SetForegroundColor(color),
            SetAttribute(Attribute::Bold),
            Print(label),
            SetAttribute(Attribute::Reset),
            ResetColor,
            Print("\n")
        )?;

        match message.role {
            MessageRole::User => queue!(out, Print(&message.text), Print("\n"))?,
            MessageRole::Assistant => {
                if message.text.is_empty() && message.is_streaming {
                    queue!(
                        out,
                        SetForegroundColor(self.style.gutter_color),
                        Print("…\n"),
                        ResetColor
                    )?;
                } else {
                    self.render_text(out, &message.text)?;
                }
            }
        }
        out.flush()
    }

    /// Render the axiom panel.
    pub fn render_axioms<W: Write>(
        &self,
        out: &mut W,
        axioms: &AxiomSet,
        labels: &Labels,
    ) -> io::Result<()> {
        queue!(
            out,
            SetForegroundColor(self.style.heading_color),
            SetAttribute(Attribute::Bold),
            Print(labels.axioms_heading),
            SetAttribute(Attribute::Reset),
            ResetColor,
            SetForegroundColor(self.style.gutter_color),
            Print(format!("  {} {}\n", labels.extracted_from, axioms.document)),
            ResetColor
        )?;

        for (i, axiom) in axioms.items.iter().enumerate() {
            queue!(
                out,
                SetForegroundColor(self.style.emphasis_color),
                Print(format!("{} {:02}  ", labels.axiom, i + 1)),
                ResetColor,
                SetAttribute(Attribute::Bold)
            )?;
            self.render_inline_line(out, &axiom.title)?;
            queue!(out, SetAttribute(Attribute::Reset), Print("    "))?;
            self.render_inline_line(out, &axiom.definition)?;
        }
        out.flush()
    }

    /// Axiom text is formatted like chat text but kept on one line.
    fn render_inline_line<W: Write>(&self, out: &mut W, text: &str) -> io::Result<()> {
        for span in format_text(text).inlines() {
            self.render_inline(out, span)?;
        }
        queue!(out, Print("\n"))
    }

    /// Render a one-line notice.
    pub fn render_notice<W: Write>(
        &self,
        out: &mut W,
        level: NoticeLevel,
        text: &str,
    ) -> io::Result<()> {
        let (color, prefix) = match level {
            NoticeLevel::Info => (self.style.info_color, ""),
            NoticeLevel::Success => (self.style.success_color, "✓ "),
            NoticeLevel::Warning => (self.style.warning_color, "⚠ "),
            NoticeLevel::Error => (self.style.error_color, "✗ "),
        };
        queue!(
            out,
            SetForegroundColor(color),
            Print(prefix),
            Print(text),
            Print("\n"),
            ResetColor
        )?;
        out.flush()
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip ANSI escape sequences, leaving only printable text.
pub fn strip_ansi(rendered: &str) -> String {
    let mut out = String::with_capacity(rendered.len());
    let mut chars = rendered.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        // CSI: ESC [ params final-byte
        if let Some('[') = chars.next() {
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        }
    }
    out
}

/// Number of terminal rows `rendered` occupies at `width` columns.
pub fn visible_rows(rendered: &str, width: usize) -> usize {
    let width = width.max(1);
    let text = strip_ansi(rendered);
    let mut lines: Vec<&str> = text.split('\n').collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
        .iter()
        .map(|line| line.chars().count().max(1).div_ceil(width))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::MathError;
    use crate::session::{Axiom, Language};

    fn render(text: &str) -> String {
        let mut out = Vec::new();
        TerminalRenderer::new().render_text(&mut out, text).unwrap();
        strip_ansi(&String::from_utf8(out).unwrap())
    }

    struct FailingMath;

    impl MathRenderer for FailingMath {
        fn render(&self, tex: &str, _display: bool) -> Result<String, MathError> {
            Err(MathError::UnknownCommand(tex.to_string()))
        }
    }

    // =========================================================================
    // Tree Rendering Tests
    // =========================================================================

    #[test]
    fn test_render_heading_and_emphasis() {
        let output = render("### Title\nThis is ***bold***.");
        assert_eq!(output, "Title\nThis is bold.\n");
    }

    #[test]
    fn test_render_inline_math_as_unicode() {
        let output = render("Energy $x^2$ here");
        assert_eq!(output, "Energy x² here\n");
    }

    #[test]
    fn test_math_fallback_shows_source() {
        let renderer = TerminalRenderer::new().with_math_renderer(Box::new(FailingMath));
        let mut out = Vec::new();
        renderer.render_text(&mut out, "see $\\foo$ and").unwrap();
        let output = strip_ansi(&String::from_utf8(out).unwrap());
        assert_eq!(output, "see $\\foo$ and\n");
    }

    #[test]
    fn test_render_display_math() {
        let output = render("before\n$$\\alpha + \\beta$$\nafter");
        assert!(output.contains("α"));
        assert!(output.contains("β"));
        assert!(output.starts_with("before\n"));
        assert!(output.ends_with("after\n"));
    }

    #[test]
    fn test_render_code_block_with_gutter() {
        let output = render("```py\nx = 1\nprint(x)\n```");
        assert_eq!(output, "╭─ py\n│ x = 1\n│ print(x)\n╰─\n");
    }

    #[test]
    fn test_render_unlabelled_code_block() {
        let output = render("```\nfoo\n```");
        assert!(output.starts_with("╭─ code\n"));
    }

    #[test]
    fn test_render_unterminated_fence_stays_literal() {
        let output = render("```py\nprint(");
        assert_eq!(output, "```py\nprint(\n");
    }

    // =========================================================================
    // Message and Axiom Tests
    // =========================================================================

    #[test]
    fn test_render_streaming_placeholder() {
        let mut out = Vec::new();
        let message = ChatMessage::assistant();
        TerminalRenderer::new()
            .render_message(&mut out, &message, Language::English.labels())
            .unwrap();
        let output = strip_ansi(&String::from_utf8(out).unwrap());
        assert_eq!(output, "The Sanctuary\n…\n");
    }

    #[test]
    fn test_render_user_message_is_not_formatted() {
        let mut out = Vec::new();
        let message = ChatMessage::user("what is ***this***");
        TerminalRenderer::new()
            .render_message(&mut out, &message, Language::English.labels())
            .unwrap();
        let output = strip_ansi(&String::from_utf8(out).unwrap());
        assert_eq!(output, "Researcher\nwhat is ***this***\n");
    }

    #[test]
    fn test_render_axioms_numbered() {
        let set = AxiomSet {
            document: "paper.pdf".into(),
            language: Language::English,
            items: vec![
                Axiom {
                    title: "Entropy".into(),
                    definition: "Disorder $S$ grows.".into(),
                },
                Axiom {
                    title: "Order".into(),
                    definition: "Rare.".into(),
                },
            ],
        };
        let mut out = Vec::new();
        TerminalRenderer::new()
            .render_axioms(&mut out, &set, Language::English.labels())
            .unwrap();
        let output = strip_ansi(&String::from_utf8(out).unwrap());
        assert!(output.starts_with("Conceptual Axioms  Extracted Wisdom paper.pdf\n"));
        assert!(output.contains("AXIOM 01  Entropy\n    Disorder S grows.\n"));
        assert!(output.contains("AXIOM 02  Order\n"));
    }

    #[test]
    fn test_render_notice_prefix() {
        let mut out = Vec::new();
        TerminalRenderer::new()
            .render_notice(&mut out, NoticeLevel::Error, "failed")
            .unwrap();
        assert_eq!(strip_ansi(&String::from_utf8(out).unwrap()), "✗ failed\n");
    }

    // =========================================================================
    // Layout Helper Tests
    // =========================================================================

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[38;5;1mred\x1b[0m plain"), "red plain");
        assert_eq!(strip_ansi("no escapes"), "no escapes");
    }

    #[test]
    fn test_visible_rows_wraps() {
        assert_eq!(visible_rows("abc\n", 10), 1);
        assert_eq!(visible_rows("abcdefghij\n", 5), 2);
        assert_eq!(visible_rows("a\n\nb\n", 80), 3);
        assert_eq!(visible_rows("\x1b[1mabc\x1b[0m\n", 3), 1);
    }
}
