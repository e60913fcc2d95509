//! Full-buffer parser for streamed assistant text.
//!
//! The whole buffer is re-parsed on every call. Special segments are only
//! produced once their closing delimiter is present, so a buffer observed
//! mid-stream renders its unterminated tail as plain text.

use super::tree::{Block, CodeBlock, Inline, RenderTree};

const FENCE: &str = "```";
const DISPLAY_MATH: &str = "$$";
const BOLD_ITALIC: &str = "***";

/// Longest first line accepted as a fence language tag.
const MAX_LANGUAGE_TAG_LEN: usize = 24;

/// A piece of text either outside or inside a delimiter pair.
#[derive(Debug, PartialEq, Eq)]
enum Span<'a> {
    Plain(&'a str),
    Delimited(&'a str),
}

/// Parse a text buffer into an ordered render tree.
pub fn format_text(buffer: &str) -> RenderTree {
    let mut tree = TreeBuilder::default();

    for span in split_delimited(buffer, FENCE) {
        match span {
            Span::Delimited(inner) => tree.push_block(Block::Code(parse_code_block(inner))),
            Span::Plain(text) => {
                for piece in split_delimited(text, DISPLAY_MATH) {
                    match piece {
                        Span::Delimited(tex) if !tex.trim().is_empty() => {
                            tree.push_block(Block::Math(tex.to_string()))
                        }
                        // `$$$$` has nothing to render; keep the source visible
                        Span::Delimited(tex) => {
                            tree.push_lines(&format!("{DISPLAY_MATH}{tex}{DISPLAY_MATH}"))
                        }
                        Span::Plain(text) => tree.push_lines(text),
                    }
                }
            }
        }
    }

    tree.finish()
}

/// Accumulates blocks while tracking whether the source line is still open.
#[derive(Default)]
struct TreeBuilder {
    tree: RenderTree,
    /// The last pushed text did not end with a newline.
    open_line: bool,
}

impl TreeBuilder {
    fn mark(&mut self, joined: bool) {
        if joined && !self.tree.blocks.is_empty() {
            self.tree.same_line.push(self.tree.blocks.len());
        }
    }

    fn push_block(&mut self, block: Block) {
        self.mark(self.open_line);
        self.tree.blocks.push(block);
        self.open_line = true;
    }

    /// Split a plain span into line-level blocks.
    fn push_lines(&mut self, text: &str) {
        let mut text = text;
        if self.tree.blocks.last().is_some_and(Block::is_block_level) {
            if let Some(rest) = text.strip_prefix("\r\n").or_else(|| text.strip_prefix('\n')) {
                text = rest;
                self.open_line = false;
            }
        }
        if text.is_empty() {
            return;
        }

        let ends_open = !text.ends_with('\n');
        let count = text.lines().count();
        for (n, line) in text.lines().enumerate() {
            let joined = n == 0 && self.open_line;
            // Whitespace beside a block on the same source line is not a
            // blank line.
            let partial = joined || (ends_open && n + 1 == count);
            let trimmed = line.trim();
            if trimmed.is_empty() && !partial {
                self.tree.blocks.push(Block::LineBreak);
            } else if trimmed.starts_with("###") && !joined {
                let title = trimmed.trim_start_matches('#').trim();
                self.tree.blocks.push(Block::Heading(title.to_string()));
            } else {
                let spans = parse_inline(line);
                match self.tree.blocks.last_mut() {
                    // Text resuming a paragraph, e.g. after a literal `$$$$`.
                    Some(Block::Paragraph(existing)) if joined => {
                        for span in spans {
                            match span {
                                Inline::Text(t) => push_text(existing, &t),
                                other => existing.push(other),
                            }
                        }
                    }
                    _ => {
                        self.mark(joined);
                        self.tree.blocks.push(Block::Paragraph(spans));
                    }
                }
            }
        }
        self.open_line = ends_open;
    }

    fn finish(self) -> RenderTree {
        self.tree
    }
}

/// Split `text` on balanced `delim` pairs. An opening delimiter without a
/// matching close stays in the trailing plain span.
fn split_delimited<'a>(text: &'a str, delim: &str) -> Vec<Span<'a>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(delim) {
        let after_open = &rest[open + delim.len()..];
        let Some(close) = after_open.find(delim) else {
            break;
        };

        if open > 0 {
            spans.push(Span::Plain(&rest[..open]));
        }
        spans.push(Span::Delimited(&after_open[..close]));
        rest = &after_open[close + delim.len()..];
    }

    if !rest.is_empty() {
        spans.push(Span::Plain(rest));
    }
    spans
}

fn parse_code_block(inner: &str) -> CodeBlock {
    let body = strip_leading_blank_lines(inner).trim_end();

    if let Some((first, rest)) = body.split_once('\n') {
        let tag = first.trim().to_lowercase();
        if is_language_tag(&tag) {
            return CodeBlock {
                language: Some(tag),
                content: rest.to_string(),
            };
        }
    }

    CodeBlock {
        language: None,
        content: body.to_string(),
    }
}

fn strip_leading_blank_lines(text: &str) -> &str {
    let mut rest = text;
    while let Some(newline) = rest.find('\n') {
        if rest[..newline].trim().is_empty() {
            rest = &rest[newline + 1..];
        } else {
            break;
        }
    }
    rest
}

fn is_language_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag.len() <= MAX_LANGUAGE_TAG_LEN
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '#' || c == '+')
}

/// Split one line into inline math, bold-italic and plain spans.
fn parse_inline(line: &str) -> Vec<Inline> {
    let bytes = line.as_bytes();
    let mut spans = Vec::new();
    let mut pending = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'$' => {
                if let Some(close) = find_math_close(bytes, i) {
                    push_emphasis(&mut spans, &line[pending..i]);
                    spans.push(Inline::Math(line[i + 1..close].to_string()));
                    i = close + 1;
                    pending = i;
                    continue;
                }
                if bytes.get(i + 1) == Some(&b'$') {
                    i += 2;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    if pending < line.len() {
        push_emphasis(&mut spans, &line[pending..]);
    }
    spans
}

/// Find the closing `$` for an inline math span opened at `open`.
///
/// The opener must not be followed by whitespace or another `$`; the closer
/// must not be preceded by whitespace nor followed by a digit. The first
/// unescaped `$` after the opener decides: if it cannot close, the span is
/// not math and that `$` is tried as an opener instead.
fn find_math_close(bytes: &[u8], open: usize) -> Option<usize> {
    let first = *bytes.get(open + 1)?;
    if first == b'$' || first.is_ascii_whitespace() {
        return None;
    }

    let mut j = open + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => {
                j += 2;
                continue;
            }
            b'$' => {
                let prev_is_space = bytes[j - 1].is_ascii_whitespace();
                let next_is_digit = bytes.get(j + 1).is_some_and(u8::is_ascii_digit);
                return (!prev_is_space && !next_is_digit).then_some(j);
            }
            _ => {}
        }
        j += 1;
    }
    None
}

fn push_emphasis(spans: &mut Vec<Inline>, text: &str) {
    let mut rest = text;

    while let Some(open) = rest.find(BOLD_ITALIC) {
        let after_open = &rest[open + BOLD_ITALIC.len()..];
        match after_open.find(BOLD_ITALIC) {
            Some(close) if close > 0 => {
                push_text(spans, &rest[..open]);
                spans.push(Inline::BoldItalic(after_open[..close].to_string()));
                rest = &after_open[close + BOLD_ITALIC.len()..];
            }
            _ => break,
        }
    }

    push_text(spans, rest);
}

fn push_text(spans: &mut Vec<Inline>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(existing)) = spans.last_mut() {
        existing.push_str(text);
    } else {
        spans.push(Inline::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    // =========================================================================
    // Mixed document
    // =========================================================================

    #[test]
    fn test_heading_paragraph_and_code_block() {
        let tree = format_text("### Title\ntext ***bold*** $x^2$\n```py\nprint(1)\n```");

        assert_eq!(
            tree.blocks,
            vec![
                Block::Heading("Title".into()),
                Block::Paragraph(vec![
                    text("text "),
                    Inline::BoldItalic("bold".into()),
                    text(" "),
                    Inline::Math("x^2".into()),
                ]),
                Block::Code(CodeBlock {
                    language: Some("py".into()),
                    content: "print(1)".into(),
                }),
            ]
        );
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let input = "### A\n$$\\sum_i x_i$$\nsome ***text***\n\n```rust\nfn main() {}\n```\ntail $y$";
        assert_eq!(format_text(input), format_text(input));
    }

    #[test]
    fn test_empty_buffer() {
        assert!(format_text("").is_empty());
    }

    // =========================================================================
    // Code fences
    // =========================================================================

    #[test]
    fn test_code_block_contents_are_not_parsed() {
        let tree = format_text("```\nlet total = $a + ***b***;\n```");
        assert_eq!(
            tree.blocks,
            vec![Block::Code(CodeBlock {
                language: None,
                content: "let total = $a + ***b***;".into(),
            })]
        );
    }

    #[test]
    fn test_language_tag_is_lowercased() {
        let tree = format_text("```Python\nx = 1\n```");
        assert_eq!(
            tree.blocks,
            vec![Block::Code(CodeBlock {
                language: Some("python".into()),
                content: "x = 1".into(),
            })]
        );
    }

    #[test]
    fn test_language_tag_with_symbols() {
        let tree = format_text("```c#\nvar x = 1;\n```\n```c++\nint x;\n```");
        let languages: Vec<_> = tree
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Code(c) => c.language.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(languages, vec!["c#".to_string(), "c++".to_string()]);
    }

    #[test]
    fn test_single_line_fence_has_no_language() {
        let tree = format_text("```ls```");
        assert_eq!(
            tree.blocks,
            vec![Block::Code(CodeBlock {
                language: None,
                content: "ls".into(),
            })]
        );
    }

    #[test]
    fn test_first_line_that_is_code_is_kept() {
        let tree = format_text("```\nprint(1)\nprint(2)\n```");
        assert_eq!(
            tree.blocks,
            vec![Block::Code(CodeBlock {
                language: None,
                content: "print(1)\nprint(2)".into(),
            })]
        );
    }

    #[test]
    fn test_indentation_preserved_in_code() {
        let tree = format_text("```py\ndef f():\n    return 1\n```");
        match &tree.blocks[0] {
            Block::Code(code) => assert_eq!(code.content, "def f():\n    return 1"),
            other => panic!("expected code block, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_fence_is_literal() {
        let tree = format_text("intro\n```py\nprint(");
        assert!(tree.blocks.iter().all(|b| !matches!(b, Block::Code(_))));
        assert_eq!(
            tree.blocks,
            vec![
                Block::Paragraph(vec![text("intro")]),
                Block::Paragraph(vec![text("```py")]),
                Block::Paragraph(vec![text("print(")]),
            ]
        );
    }

    #[test]
    fn test_text_after_code_block_drops_one_newline() {
        let tree = format_text("```\nx\n```\nafter");
        assert_eq!(
            tree.blocks,
            vec![
                Block::Code(CodeBlock {
                    language: None,
                    content: "x".into(),
                }),
                Block::Paragraph(vec![text("after")]),
            ]
        );
    }

    // =========================================================================
    // Math
    // =========================================================================

    #[test]
    fn test_block_math() {
        let tree = format_text("Energy:\n$$E = mc^2$$\ndone");
        assert_eq!(
            tree.blocks,
            vec![
                Block::Paragraph(vec![text("Energy:")]),
                Block::Math("E = mc^2".into()),
                Block::Paragraph(vec![text("done")]),
            ]
        );
    }

    #[test]
    fn test_block_math_is_not_two_inline_spans() {
        let tree = format_text("$$a$$");
        assert_eq!(tree.blocks, vec![Block::Math("a".into())]);
        assert_eq!(tree.inlines().count(), 0);
    }

    #[test]
    fn test_unterminated_block_math_is_literal() {
        let tree = format_text("$$x^2 + y");
        assert_eq!(tree.blocks, vec![Block::Paragraph(vec![text("$$x^2 + y")])]);
    }

    #[test]
    fn test_empty_block_math_stays_literal() {
        let tree = format_text("$$$$");
        assert_eq!(tree.blocks, vec![Block::Paragraph(vec![text("$$$$")])]);
    }

    #[test]
    fn test_currency_is_not_math() {
        let tree = format_text("cost is $5 and $10");
        assert_eq!(tree.inlines().filter(|s| matches!(s, Inline::Math(_))).count(), 0);
        assert_eq!(
            tree.blocks,
            vec![Block::Paragraph(vec![text("cost is $5 and $10")])]
        );
    }

    #[test]
    fn test_currency_before_math_does_not_capture_it() {
        let tree = format_text("costs $5, then $x+y$ too");
        assert_eq!(
            tree.blocks,
            vec![Block::Paragraph(vec![
                text("costs $5, then "),
                Inline::Math("x+y".into()),
                text(" too"),
            ])]
        );

        let tree = format_text("I paid $5 for $x$");
        assert_eq!(
            tree.blocks,
            vec![Block::Paragraph(vec![
                text("I paid $5 for "),
                Inline::Math("x".into()),
            ])]
        );
    }

    #[test]
    fn test_math_segments_never_contain_a_dollar() {
        for input in ["$a $b$ c$", "x $1 $2$ $y$", "$p$5 and $q$"] {
            for span in format_text(input).inlines() {
                if let Inline::Math(tex) = span {
                    assert!(!tex.contains('$'), "input {:?} gave {:?}", input, tex);
                }
            }
        }
    }

    #[test]
    fn test_unterminated_inline_math_is_literal() {
        let tree = format_text("where $x + y");
        assert_eq!(tree.blocks, vec![Block::Paragraph(vec![text("where $x + y")])]);
    }

    #[test]
    fn test_inline_math_does_not_span_lines() {
        let tree = format_text("a $x\ny$ b");
        assert_eq!(tree.inlines().filter(|s| matches!(s, Inline::Math(_))).count(), 0);
    }

    #[test]
    fn test_escaped_dollar_is_not_a_delimiter() {
        let tree = format_text(r"price \$3 and $x$");
        assert_eq!(
            tree.blocks,
            vec![Block::Paragraph(vec![
                text(r"price \$3 and "),
                Inline::Math("x".into()),
            ])]
        );
    }

    #[test]
    fn test_math_shields_asterisks() {
        let tree = format_text("$a***b***c$");
        assert_eq!(
            tree.blocks,
            vec![Block::Paragraph(vec![Inline::Math("a***b***c".into())])]
        );
    }

    // =========================================================================
    // Lines, headings, emphasis
    // =========================================================================

    #[test]
    fn test_blank_lines_become_line_breaks() {
        let tree = format_text("one\n\ntwo");
        assert_eq!(
            tree.blocks,
            vec![
                Block::Paragraph(vec![text("one")]),
                Block::LineBreak,
                Block::Paragraph(vec![text("two")]),
            ]
        );
    }

    #[test]
    fn test_heading_with_indentation_and_extra_hashes() {
        let tree = format_text("   #### Deep Title  ");
        assert_eq!(tree.blocks, vec![Block::Heading("Deep Title".into())]);
    }

    #[test]
    fn test_two_hashes_are_not_a_heading() {
        let tree = format_text("## not a heading");
        assert_eq!(
            tree.blocks,
            vec![Block::Paragraph(vec![text("## not a heading")])]
        );
    }

    #[test]
    fn test_multiple_bold_italic_spans() {
        let tree = format_text("***a*** and ***b***");
        assert_eq!(
            tree.blocks,
            vec![Block::Paragraph(vec![
                Inline::BoldItalic("a".into()),
                text(" and "),
                Inline::BoldItalic("b".into()),
            ])]
        );
    }

    #[test]
    fn test_unterminated_bold_italic_is_literal() {
        let tree = format_text("a ***partial");
        assert_eq!(tree.blocks, vec![Block::Paragraph(vec![text("a ***partial")])]);
    }

    #[test]
    fn test_arabic_text_passes_through() {
        let tree = format_text("### العنوان\nنص ***مهم***");
        assert_eq!(
            tree.blocks,
            vec![
                Block::Heading("العنوان".into()),
                Block::Paragraph(vec![text("نص "), Inline::BoldItalic("مهم".into())]),
            ]
        );
    }

    // =========================================================================
    // Stream truncation
    // =========================================================================

    #[test]
    fn test_every_prefix_is_well_formed() {
        let input = "### Heading\nSome ***bold*** and $a_i$ here.\n$$\\frac{1}{2}$$\n```rust\nlet s = \"$\";\n```\nend — نص";

        for (offset, _) in input.char_indices().chain(std::iter::once((input.len(), ' '))) {
            let prefix = &input[..offset];
            let tree = format_text(prefix);

            let fences = prefix.matches(FENCE).count();
            let code_blocks = tree
                .blocks
                .iter()
                .filter(|b| matches!(b, Block::Code(_)))
                .count();
            assert!(code_blocks <= fences / 2, "prefix {:?}", prefix);

            for span in tree.inlines() {
                match span {
                    Inline::Math(tex) | Inline::BoldItalic(tex) => {
                        assert!(!tex.is_empty(), "prefix {:?}", prefix);
                        assert!(!tex.contains('\n'), "prefix {:?}", prefix);
                    }
                    Inline::Text(_) => {}
                }
            }

            // No segment may claim text beyond the prefix.
            assert!(tree.plain_text().len() <= prefix.len());
        }
    }

    #[test]
    fn test_prefix_inside_open_fence_has_no_code_block() {
        let prefix = "before\n```rust\nfn main() {";
        let tree = format_text(prefix);
        assert!(!tree.blocks.iter().any(|b| matches!(b, Block::Code(_))));
        assert!(tree.plain_text().contains("fn main() {"));
    }

    // =========================================================================
    // Markup removal
    // =========================================================================

    #[test]
    fn test_plain_text_equals_input_without_inline_delimiters() {
        let inputs = [
            "plain words only",
            "a ***b*** c",
            "sum $x_1+x_2$ of ***parts***",
            "two\nlines with $z$",
        ];
        for input in inputs {
            let tree = format_text(input);
            let expected = input.replace(BOLD_ITALIC, "").replace('$', "");
            assert_eq!(tree.plain_text(), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_plain_text_with_blocks_on_own_lines() {
        let tree = format_text("intro\n$$x$$\n```\ncode\n```\noutro");
        assert_eq!(tree.plain_text(), "intro\nx\ncode\noutro");
    }

    #[test]
    fn test_plain_text_with_blocks_mid_line() {
        let tree = format_text("a $$x$$ b");
        assert_eq!(
            tree.blocks,
            vec![
                Block::Paragraph(vec![text("a ")]),
                Block::Math("x".into()),
                Block::Paragraph(vec![text(" b")]),
            ]
        );
        assert_eq!(tree.plain_text(), "a x b");

        assert_eq!(format_text("see ```ls``` now").plain_text(), "see ls now");
        assert_eq!(format_text("$$x$$ $$y$$").plain_text(), "x y");
    }

    #[test]
    fn test_plain_text_mixes_shared_and_new_lines() {
        let input = "one $$x$$\ntwo\n\n```\nls\n``` three";
        assert_eq!(format_text(input).plain_text(), "one x\ntwo\n\nls three");
    }

    #[test]
    fn test_heading_marker_mid_line_is_text() {
        let tree = format_text("$$x$$ ### not a title");
        assert_eq!(
            tree.blocks,
            vec![
                Block::Math("x".into()),
                Block::Paragraph(vec![text(" ### not a title")]),
            ]
        );
    }

    #[test]
    fn test_empty_block_math_literal_joins_its_line() {
        let tree = format_text("a $$$$ b");
        assert_eq!(tree.blocks, vec![Block::Paragraph(vec![text("a $$$$ b")])]);
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn test_split_delimited_unbalanced() {
        assert_eq!(
            split_delimited("a```b```c```d", FENCE),
            vec![Span::Plain("a"), Span::Delimited("b"), Span::Plain("c```d")]
        );
    }

    #[test]
    fn test_is_language_tag() {
        assert!(is_language_tag("py"));
        assert!(is_language_tag("c++"));
        assert!(is_language_tag("f#"));
        assert!(!is_language_tag("print(1)"));
        assert!(!is_language_tag("two words"));
        assert!(!is_language_tag(""));
        assert!(!is_language_tag(&"x".repeat(MAX_LANGUAGE_TAG_LEN + 1)));
    }
}
