//! Output renderers for formatted text.
//!
//! - [`terminal`]: crossterm styling for the REPL and one-shot runner
//! - [`html`]: escaped, standalone page export

pub mod html;
pub mod terminal;

pub use html::{escape, render_transcript, TrustedHtml};
pub use terminal::{strip_ansi, visible_rows, RenderStyle, TerminalRenderer};
