//! Slash command parsing.

use std::path::PathBuf;

use crate::session::Language;

/// All slash commands with descriptions
pub const COMMANDS: &[(&str, &str)] = &[
    ("/about", "About Knowledge AI"),
    ("/axioms", "Show the axiom set"),
    ("/clear", "Clear screen"),
    ("/exit", "Exit"),
    ("/export", "Export session (.html, or .txt/.md as plain text)"),
    ("/help", "Show help"),
    ("/lang", "Switch language (en, ar)"),
    ("/new", "Start a new session"),
    ("/open", "Open the session in a browser"),
    ("/q", "Exit"),
    ("/quit", "Exit"),
    ("/status", "Show session status"),
    ("/upload", "Upload a PDF document"),
    ("/view", "Open the manuscript in a viewer"),
];

pub const ABOUT: &str = "\
Knowledge AI is an elite research terminal that combines philosophical rigour
with scientific precision. Upload a PDF and it extracts the axioms that hold
the text together, then answers questions grounded in the document itself.";

/// A parsed line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(PathBuf),
    /// `None` toggles between English and Arabic.
    Language(Option<Language>),
    Axioms,
    New,
    Open,
    /// Open the uploaded PDF itself.
    View,
    Export(Option<PathBuf>),
    Status,
    Help,
    About,
    Clear,
    Quit,
    /// Anything that is not a slash command.
    Chat(String),
    Unknown(String),
    Usage(&'static str),
}

/// Expand `~` and strip the quotes terminals add to dropped paths.
fn parse_path(arg: &str) -> PathBuf {
    let arg = arg.trim().trim_matches(|c| c == '"' || c == '\'');
    PathBuf::from(shellexpand::tilde(arg).into_owned())
}

/// Parse one input line. Returns `None` for blank input.
pub fn parse_input(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Chat(line.to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "upload" | "u" => {
            if args.is_empty() {
                Command::Usage("/upload <path-to-pdf>")
            } else {
                Command::Upload(parse_path(args))
            }
        }
        "lang" | "language" => {
            if args.is_empty() {
                Command::Language(None)
            } else {
                match args.parse::<Language>() {
                    Ok(language) => Command::Language(Some(language)),
                    Err(_) => Command::Usage("/lang [en|ar]"),
                }
            }
        }
        "axioms" => Command::Axioms,
        "new" | "reset" => Command::New,
        "open" => Command::Open,
        "view" | "pdf" => Command::View,
        "export" => Command::Export((!args.is_empty()).then(|| parse_path(args))),
        "status" => Command::Status,
        "help" | "h" | "?" => Command::Help,
        "about" => Command::About,
        "clear" | "cls" => Command::Clear,
        "quit" | "exit" | "q" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    };
    Some(command)
}

/// The other supported language.
pub fn toggled(language: Language) -> Language {
    match language {
        Language::English => Language::Arabic,
        Language::Arabic => Language::English,
    }
}

pub fn help_text() -> String {
    let mut out = String::from("\nCommands:\n");
    for (cmd, desc) in COMMANDS {
        if matches!(*cmd, "/q" | "/exit") {
            continue;
        }
        out.push_str(&format!("  {:<10} {}\n", cmd, desc));
    }
    out.push_str("\nAnything else is sent to the document as a question.\n");
    out
}
