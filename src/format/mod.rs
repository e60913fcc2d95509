//! Streaming text formatter.
//!
//! Turns a (possibly incomplete) assistant message buffer into an ordered
//! [`RenderTree`] of structural segments. Parsing is stateless: callers
//! re-run [`format_text`] on the full buffer after every appended chunk.

mod highlight;
mod math;
mod parser;
mod tree;

pub use highlight::{highlight, CodeToken, TokenKind};
pub use math::{render_math, MathError, MathOutput, MathRenderer, UnicodeMathRenderer};
pub use parser::format_text;
pub use tree::{has_arabic, Block, CodeBlock, Inline, RenderTree};
