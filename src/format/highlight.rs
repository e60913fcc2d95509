//! Language-agnostic code tokenizer for fenced blocks.
//!
//! Cosmetic only: the token texts always concatenate back to the input.

/// Token classes understood by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Plain,
    String,
    Comment,
    Number,
    Keyword,
    Function,
    Operator,
}

/// A slice of the source with a token class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeToken<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Keywords shared across the languages models usually answer in.
const KEYWORDS: &[&str] = &[
    // JavaScript / TypeScript
    "const", "let", "var", "function", "return", "if", "else", "for", "while", "import", "from",
    "export", "class", "extends", "await", "async", "try", "catch", "new", "null", "true",
    "false", "type", "interface", "static",
    // Python
    "def", "elif", "yield", "with", "as", "lambda", "int", "float", "str", "bool", "list",
    "dict", "set", "print", "break", "continue", "pass", "in", "not", "and", "or", "None",
    "True", "False",
    // Rust / C family
    "fn", "pub", "struct", "enum", "impl", "match", "mut", "use", "mod", "void", "public",
    "private",
];

/// Operators, longest first so matching is greedy.
const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", ">=", "<=", "&&", "||", "=>", "->", "+=", "-=", "*=", "/=", "%=",
    "+", "-", "*", "/", "%", "=", "!", "<", ">", "&", "|", "^", "?", ":",
];

/// Split `code` into classified tokens.
pub fn highlight(code: &str) -> Vec<CodeToken<'_>> {
    let mut tokens: Vec<CodeToken<'_>> = Vec::new();
    let mut i = 0;

    while let Some(c) = code[i..].chars().next() {
        let rest = &code[i..];
        let (kind, len) = if rest.starts_with("//") || c == '#' {
            (TokenKind::Comment, rest.find('\n').unwrap_or(rest.len()))
        } else if rest.starts_with("/*") {
            let len = rest[2..].find("*/").map(|p| p + 4).unwrap_or(rest.len());
            (TokenKind::Comment, len)
        } else if matches!(c, '"' | '\'' | '`') {
            (TokenKind::String, string_len(rest, c))
        } else if c.is_ascii_digit() {
            (TokenKind::Number, number_len(rest))
        } else if c.is_alphabetic() || c == '_' {
            let len = rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                .unwrap_or(rest.len());
            (word_kind(&rest[..len], &rest[len..]), len)
        } else if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            (TokenKind::Operator, op.len())
        } else {
            (TokenKind::Plain, c.len_utf8())
        };

        push(&mut tokens, code, kind, i, i + len);
        i += len;
    }

    tokens
}

/// Append a token, widening the previous one when both are plain.
fn push<'a>(
    tokens: &mut Vec<CodeToken<'a>>,
    code: &'a str,
    kind: TokenKind,
    start: usize,
    end: usize,
) {
    if kind == TokenKind::Plain {
        if let Some(last) = tokens.last_mut() {
            if last.kind == TokenKind::Plain {
                last.text = &code[start - last.text.len()..end];
                return;
            }
        }
    }
    tokens.push(CodeToken {
        kind,
        text: &code[start..end],
    });
}

fn string_len(rest: &str, quote: char) -> usize {
    let mut chars = rest.char_indices().skip(1);
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '\n' if quote != '`' => return idx,
            ch if ch == quote => return idx + ch.len_utf8(),
            _ => {}
        }
    }
    rest.len()
}

fn number_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let mut len = 0;
    while len < bytes.len() {
        let b = bytes[len];
        let decimal_point = b == b'.' && bytes.get(len + 1).is_some_and(u8::is_ascii_digit);
        if b.is_ascii_alphanumeric() || b == b'_' || decimal_point {
            len += 1;
        } else {
            break;
        }
    }
    len
}

fn word_kind(word: &str, after: &str) -> TokenKind {
    if KEYWORDS.contains(&word) {
        TokenKind::Keyword
    } else if after.trim_start_matches([' ', '\t']).starts_with('(') {
        TokenKind::Function
    } else {
        TokenKind::Plain
    }
}
