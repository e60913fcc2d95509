//! CLI components.

pub mod commands;
pub mod completion;
pub mod export;
pub mod live;
pub mod prompt;
pub mod repl;
pub mod runner;
pub mod spinner;

pub use commands::{parse_input, Command, COMMANDS};
pub use completion::{create_reedline, KnowledgeCompleter};
pub use live::{drive, LiveView, RedrawMode};
pub use prompt::{KnowledgeHighlighter, KnowledgePrompt};
pub use repl::Repl;
pub use runner::{run, run_interactive, run_single_question, RunOptions};
