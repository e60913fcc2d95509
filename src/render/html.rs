//! HTML export of a research session.
//!
//! All model and user text is escaped. The only markup that reaches the
//! page unescaped is built here from the render tree, wrapped in
//! [`TrustedHtml`].

use std::fmt::{self, Write as _};

use crate::format::{
    format_text, has_arabic, highlight, render_math, Block, Inline, MathRenderer, RenderTree,
    TokenKind,
};
use crate::session::{AxiomSet, Conversation, Language, MessageRole};

/// Markup produced by this module. Cannot be built from arbitrary strings
/// outside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TrustedHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escape text for element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn token_class(kind: TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Plain => None,
        TokenKind::String => Some("tok-string"),
        TokenKind::Comment => Some("tok-comment"),
        TokenKind::Number => Some("tok-number"),
        TokenKind::Keyword => Some("tok-keyword"),
        TokenKind::Function => Some("tok-function"),
        TokenKind::Operator => Some("tok-operator"),
    }
}

fn push_math(out: &mut String, math: &dyn MathRenderer, tex: &str, display: bool) {
    let output = render_math(math, tex, display);
    let (tag, class) = if display {
        ("div", "math display")
    } else {
        ("span", "math inline")
    };
    if output.is_fallback() {
        let delimiter = if display { "$$" } else { "$" };
        let _ = write!(
            out,
            "<{tag} class=\"{class} fallback\"><code>{delimiter}{}{delimiter}</code></{tag}>",
            escape(output.text())
        );
    } else {
        let _ = write!(
            out,
            "<{tag} class=\"{class}\" title=\"{}\">{}</{tag}>",
            escape(tex),
            escape(output.text())
        );
    }
}

fn push_inline(out: &mut String, math: &dyn MathRenderer, span: &Inline) {
    match span {
        Inline::Text(text) => out.push_str(&escape(text)),
        Inline::BoldItalic(text) => {
            let _ = write!(out, "<strong><em>{}</em></strong>", escape(text));
        }
        Inline::Math(tex) => push_math(out, math, tex, false),
    }
}

/// Render a tree to markup.
pub fn render_tree(tree: &RenderTree, math: &dyn MathRenderer) -> TrustedHtml {
    let mut out = String::new();
    for block in &tree.blocks {
        match block {
            Block::Paragraph(spans) => {
                out.push_str("<p dir=\"auto\">");
                for span in spans {
                    push_inline(&mut out, math, span);
                }
                out.push_str("</p>\n");
            }
            Block::Heading(text) => {
                let _ = writeln!(out, "<h3 dir=\"auto\">{}</h3>", escape(text));
            }
            Block::LineBreak => out.push_str("<br>\n"),
            Block::Math(tex) => {
                push_math(&mut out, math, tex, true);
                out.push('\n');
            }
            Block::Code(code) => {
                let language = code.language.as_deref().unwrap_or("code");
                let _ = write!(
                    out,
                    "<figure class=\"code\"><figcaption>{}</figcaption><pre dir=\"ltr\"><code>",
                    escape(language)
                );
                for token in highlight(&code.content) {
                    match token_class(token.kind) {
                        Some(class) => {
                            let _ = write!(out, "<span class=\"{class}\">{}</span>", escape(token.text));
                        }
                        None => out.push_str(&escape(token.text)),
                    }
                }
                out.push_str("</code></pre></figure>\n");
            }
        }
    }
    TrustedHtml(out)
}

const PAGE_STYLE: &str = "\
body{max-width:52rem;margin:2rem auto;padding:0 1rem;font-family:Georgia,serif;line-height:1.6;color:#1c1917;background:#fafaf9}\
h1{font-size:1.4rem}h2{font-size:1.1rem;text-transform:uppercase;letter-spacing:.2em}\
.axiom{border-left:3px solid #78716c;padding-left:1rem;margin:1rem 0}\
.message{margin:1.5rem 0}.role{font-size:.75rem;text-transform:uppercase;letter-spacing:.2em;color:#78716c}\
.arabic-text{font-family:'Amiri','Noto Naskh Arabic',serif;font-size:1.1em}\
.math{font-family:'Latin Modern Math','STIX Two Math',serif}.math.display{text-align:center;margin:1rem 0}\
.fallback code{color:#a8a29e}\
figure.code{background:#1c1917;color:#e7e5e4;padding:.75rem;border-radius:.5rem;overflow-x:auto}\
figcaption{font-size:.7rem;color:#a8a29e}.tok-string{color:#86efac}.tok-comment{color:#78716c}\
.tok-number{color:#fdba74}.tok-keyword{color:#c4b5fd}.tok-function{color:#93c5fd}.tok-operator{color:#67e8f9}";

fn text_class(base: &str, text: &str) -> String {
    if has_arabic(text) {
        format!("{base} arabic-text")
    } else {
        base.to_string()
    }
}

/// Render a standalone page with the axiom set and the transcript.
pub fn render_transcript(
    language: Language,
    document: Option<&str>,
    axioms: Option<&AxiomSet>,
    transcript: &Conversation,
    math: &dyn MathRenderer,
) -> TrustedHtml {
    let labels = language.labels();
    let dir = if language.is_rtl() { "rtl" } else { "ltr" };
    let title = document.unwrap_or("Knowledge AI");

    let mut out = String::new();
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html lang=\"{}\" dir=\"{dir}\">", language.code());
    let _ = writeln!(
        out,
        "<head><meta charset=\"utf-8\"><title>{}</title><style>{PAGE_STYLE}</style></head>",
        escape(title)
    );
    out.push_str("<body>\n");
    let _ = writeln!(out, "<h1 dir=\"auto\">{}</h1>", escape(title));

    if let Some(axioms) = axioms.filter(|a| !a.is_empty()) {
        let _ = writeln!(
            out,
            "<section class=\"axioms\"><h2>{}</h2>",
            escape(labels.axioms_heading)
        );
        for (i, axiom) in axioms.items.iter().enumerate() {
            let _ = write!(
                out,
                "<div class=\"{}\" dir=\"auto\"><div class=\"role\">{} {:02}</div><h3>",
                text_class("axiom", &axiom.definition),
                escape(labels.axiom),
                i + 1
            );
            for span in format_text(&axiom.title).inlines() {
                push_inline(&mut out, math, span);
            }
            out.push_str("</h3><p>");
            for span in format_text(&axiom.definition).inlines() {
                push_inline(&mut out, math, span);
            }
            out.push_str("</p></div>\n");
        }
        out.push_str("</section>\n");
    }

    out.push_str("<section class=\"transcript\">\n");
    for message in &transcript.messages {
        let label = match message.role {
            MessageRole::User => labels.user,
            MessageRole::Assistant => labels.assistant,
        };
        let _ = write!(
            out,
            "<div class=\"{}\" dir=\"auto\"><div class=\"role\">{}</div>",
            text_class("message", &message.text),
            escape(label)
        );
        match message.role {
            MessageRole::User => {
                let _ = write!(out, "<p>{}</p>", escape(&message.text));
            }
            MessageRole::Assistant => {
                out.push_str(render_tree(&format_text(&message.text), math).as_str());
            }
        }
        out.push_str("</div>\n");
    }
    out.push_str("</section>\n</body>\n</html>\n");
    TrustedHtml(out)
}
