//! Render tree produced by the streaming formatter.

/// A fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language hint from the fence's first line, lowercased.
    pub language: Option<String>,
    pub content: String,
}

/// Inline span inside a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    BoldItalic(String),
    /// Inline LaTeX without the surrounding `$`.
    Math(String),
}

impl Inline {
    /// The span's content with markup removed.
    pub fn content(&self) -> &str {
        match self {
            Inline::Text(s) | Inline::BoldItalic(s) | Inline::Math(s) => s,
        }
    }
}

/// Block-level segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading(String),
    /// A blank source line.
    LineBreak,
    /// Display LaTeX without the surrounding `$$`.
    Math(String),
    Code(CodeBlock),
}

impl Block {
    /// True for segments that interrupt the line flow (math and code blocks).
    pub fn is_block_level(&self) -> bool {
        matches!(self, Block::Math(_) | Block::Code(_))
    }
}

/// Ordered segments for one message buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderTree {
    pub blocks: Vec<Block>,
    /// Indices of blocks that continue the previous block's source line,
    /// as in `a $$x$$ b`.
    pub(crate) same_line: Vec<usize>,
}

impl RenderTree {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            same_line: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whether block `index` sits on the same source line as the block
    /// before it.
    pub fn continues_line(&self, index: usize) -> bool {
        self.same_line.binary_search(&index).is_ok()
    }

    /// Concatenate all content with markup removed.
    ///
    /// Blocks are joined with `\n` unless they shared a source line.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();

        for (index, block) in self.blocks.iter().enumerate() {
            if index > 0 && !self.continues_line(index) {
                out.push('\n');
            }
            match block {
                Block::Paragraph(spans) => {
                    for span in spans {
                        out.push_str(span.content());
                    }
                }
                Block::Heading(text) | Block::Math(text) => out.push_str(text),
                Block::LineBreak => {}
                Block::Code(code) => out.push_str(&code.content),
            }
        }

        out
    }

    /// Iterate over every inline span in paragraph blocks.
    pub fn inlines(&self) -> impl Iterator<Item = &Inline> {
        self.blocks.iter().flat_map(|block| match block {
            Block::Paragraph(spans) => spans.as_slice(),
            _ => &[],
        })
    }
}

/// Whether the text contains characters from the Arabic block (U+0600..U+06FF).
pub fn has_arabic(text: &str) -> bool {
    text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
}
