//! Interactive REPL implementation.

use std::io::{stdout, Stdout, Write};
use std::path::{Path, PathBuf};

use reedline::{FileBackedHistory, Signal};
use tracing::{debug, error, warn};

use super::commands::{help_text, parse_input, toggled, Command, ABOUT};
use super::completion::create_reedline;
use super::export::{default_export_name, export_session};
use super::live::{drive, LiveView};
use super::prompt::KnowledgePrompt;
use crate::config::XdgDirs;
use crate::engine::{SessionController, SessionSnapshot};
use crate::messaging::{EventBus, EventReceiver, NoticeLevel};
use crate::render::TerminalRenderer;
use crate::session::{Language, SessionError};

/// Lines kept in the on-disk history.
const HISTORY_SIZE: usize = 500;

const NO_DOCUMENT_HINT: &str = "No document loaded. Use /upload <path>.";

/// The uploaded manuscript, or the hint shown when there is none.
fn manuscript_path(snapshot: &SessionSnapshot) -> Result<&Path, &'static str> {
    snapshot.document_path.as_deref().ok_or(NO_DOCUMENT_HINT)
}

/// Errors a view has already shown through an event.
fn reported_by_event(err: &SessionError) -> bool {
    matches!(
        err,
        SessionError::UnsupportedMediaType
            | SessionError::Io { .. }
            | SessionError::ExtractionFailed(_)
    )
}

/// REPL state.
pub struct Repl {
    controller: SessionController,
    events: EventReceiver,
    view: LiveView<Stdout>,
    renderer: TerminalRenderer,
    dirs: XdgDirs,
}

impl Repl {
    /// Create a REPL over `controller`, listening on `bus`.
    pub fn new(controller: SessionController, bus: &EventBus, dirs: XdgDirs, language: Language) -> Self {
        Self {
            controller,
            events: bus.subscribe(),
            view: LiveView::stdout(language),
            renderer: TerminalRenderer::new(),
            dirs,
        }
    }

    /// Upload a document before the first prompt.
    pub async fn preload(&mut self, path: &Path) -> anyhow::Result<()> {
        self.upload(path).await
    }

    /// Run the REPL loop.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut line_editor = create_reedline();
        let history_path = self.dirs.history_file();
        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match FileBackedHistory::with_file(HISTORY_SIZE, history_path) {
            Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
            Err(e) => warn!(error = %e, "History unavailable"),
        }

        self.print_banner().await?;

        loop {
            let snapshot = self.controller.snapshot().await;
            let mut prompt = KnowledgePrompt::new(snapshot.document.as_deref(), snapshot.language);
            prompt.is_synthesizing = snapshot.is_synthesizing;

            match line_editor.read_line(&prompt) {
                Ok(Signal::Success(line)) => {
                    let Some(command) = parse_input(&line) else {
                        continue;
                    };
                    match self.handle_command(command).await {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(e) => {
                            error!(error = %e, "Command failed");
                            self.notice(NoticeLevel::Error, &format!("Error: {e:#}"))?;
                        }
                    }
                }
                Ok(Signal::CtrlC) => {
                    println!("^C");
                    continue;
                }
                Ok(Signal::CtrlD) => break,
                Err(err) => {
                    self.notice(NoticeLevel::Error, &format!("Readline error: {err}"))?;
                    break;
                }
            }
        }

        Ok(())
    }

    fn notice(&self, level: NoticeLevel, text: &str) -> std::io::Result<()> {
        self.renderer.render_notice(&mut stdout(), level, text)
    }

    /// Report an engine error unless an event already did.
    fn report(&self, err: &SessionError) -> std::io::Result<()> {
        if reported_by_event(err) {
            debug!(error = %err, "Error already shown");
            return Ok(());
        }
        self.notice(NoticeLevel::Warning, &err.user_message())
    }

    async fn print_banner(&self) -> std::io::Result<()> {
        let snapshot = self.controller.snapshot().await;
        let labels = snapshot.language.labels();
        let mut out = stdout();
        writeln!(out, "Knowledge AI · {}", self.controller.model())?;
        self.renderer
            .render_notice(&mut out, NoticeLevel::Info, labels.disclaimer)?;
        let hint = if snapshot.chat_ready {
            labels.inquiry_hint
        } else {
            "Upload a PDF with /upload <path>. Type /help for commands."
        };
        self.renderer.render_notice(&mut out, NoticeLevel::Info, hint)
    }

    /// Handle one command. Returns `true` when the REPL should exit.
    async fn handle_command(&mut self, command: Command) -> anyhow::Result<bool> {
        match command {
            Command::Chat(text) => {
                let controller = self.controller.clone();
                let result =
                    drive(&mut self.view, &mut self.events, controller.send_message(&text)).await?;
                if let Err(e) = result {
                    self.report(&e)?;
                }
            }
            Command::Upload(path) => self.upload(&path).await?,
            Command::Language(target) => {
                let current = self.controller.language().await;
                let language = target.unwrap_or_else(|| toggled(current));
                let controller = self.controller.clone();
                let result =
                    drive(&mut self.view, &mut self.events, controller.set_language(language))
                        .await?;
                match result {
                    Ok(()) if language != current => self.show_axioms(false).await?,
                    Ok(()) => self.notice(
                        NoticeLevel::Info,
                        &format!("Already using {}", language.name()),
                    )?,
                    Err(e) => self.report(&e)?,
                }
            }
            Command::Axioms => self.show_axioms(true).await?,
            Command::New => {
                let controller = self.controller.clone();
                drive(&mut self.view, &mut self.events, controller.reset()).await?;
            }
            Command::Export(path) => {
                let path = path.unwrap_or_else(|| PathBuf::from(default_export_name(chrono::Local::now())));
                let written = export_session(&self.controller, &path).await?;
                self.notice(
                    NoticeLevel::Success,
                    &format!("Exported to {}", written.display()),
                )?;
            }
            Command::Open => {
                let path = self
                    .dirs
                    .state
                    .join(default_export_name(chrono::Local::now()));
                let written = export_session(&self.controller, &path).await?;
                match webbrowser::open(&written.to_string_lossy()) {
                    Ok(()) => self.notice(
                        NoticeLevel::Success,
                        &format!("Opened {}", written.display()),
                    )?,
                    Err(e) => self.notice(
                        NoticeLevel::Warning,
                        &format!("Could not open a browser ({e}); page saved to {}", written.display()),
                    )?,
                }
            }
            Command::View => {
                let snapshot = self.controller.snapshot().await;
                match manuscript_path(&snapshot) {
                    Ok(path) => match webbrowser::open(&path.to_string_lossy()) {
                        Ok(()) => self.notice(
                            NoticeLevel::Success,
                            &format!("Opened {}", path.display()),
                        )?,
                        Err(e) => self.notice(
                            NoticeLevel::Warning,
                            &format!("Could not open a viewer ({e}): {}", path.display()),
                        )?,
                    },
                    Err(hint) => self.notice(NoticeLevel::Info, hint)?,
                }
            }
            Command::Status => self.show_status().await?,
            Command::Help => print!("{}", help_text()),
            Command::About => {
                let labels = self.controller.language().await.labels();
                println!("\n{ABOUT}\n");
                self.notice(NoticeLevel::Info, labels.disclaimer)?;
            }
            Command::Clear => {
                print!("\x1b[2J\x1b[1;1H");
                stdout().flush()?;
            }
            Command::Quit => return Ok(true),
            Command::Unknown(name) => self.notice(
                NoticeLevel::Warning,
                &format!("Unknown command: /{name}. Type /help for commands."),
            )?,
            Command::Usage(usage) => {
                self.notice(NoticeLevel::Info, &format!("Usage: {usage}"))?
            }
        }
        Ok(false)
    }

    async fn upload(&mut self, path: &Path) -> anyhow::Result<()> {
        let controller = self.controller.clone();
        let result = drive(&mut self.view, &mut self.events, controller.upload(path)).await?;
        match result {
            Ok(()) => self.show_axioms(false).await?,
            Err(e) => self.report(&e)?,
        }
        Ok(())
    }

    /// Print the axiom panel. With `explain`, say why it is missing.
    async fn show_axioms(&self, explain: bool) -> std::io::Result<()> {
        let snapshot = self.controller.snapshot().await;
        let labels = snapshot.language.labels();
        match &snapshot.axioms {
            Some(axioms) if !axioms.is_empty() => {
                let mut out = stdout();
                writeln!(out)?;
                self.renderer.render_axioms(&mut out, axioms, labels)?;
                writeln!(out)?;
                if snapshot.chat_ready {
                    self.renderer
                        .render_notice(&mut out, NoticeLevel::Info, labels.inquiry_hint)?;
                }
                Ok(())
            }
            _ if !explain => Ok(()),
            _ => {
                let reason = match (&snapshot.document, &snapshot.last_error) {
                    (None, _) => NO_DOCUMENT_HINT.to_string(),
                    (Some(_), Some(err)) => err.clone(),
                    (Some(_), None) if snapshot.is_synthesizing => labels.synthesizing.to_string(),
                    (Some(_), None) => "No axioms were extracted.".to_string(),
                };
                self.notice(NoticeLevel::Info, &reason)
            }
        }
    }

    async fn show_status(&self) -> std::io::Result<()> {
        let snapshot = self.controller.snapshot().await;
        let mut out = stdout();
        writeln!(out)?;
        writeln!(
            out,
            "  Document:  {}",
            snapshot.document.as_deref().unwrap_or("none")
        )?;
        writeln!(out, "  Language:  {}", snapshot.language.name())?;
        writeln!(out, "  Model:     {}", self.controller.model())?;
        writeln!(
            out,
            "  Axioms:    {}",
            snapshot.axioms.as_ref().map_or(0, |a| a.items.len())
        )?;
        writeln!(out, "  Messages:  {}", snapshot.transcript.len())?;
        writeln!(
            out,
            "  Chat:      {}",
            if snapshot.chat_ready { "ready" } else { "not ready" }
        )?;
        if let Some(err) = &snapshot.last_error {
            writeln!(out, "  Last error: {err}")?;
        }
        writeln!(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::scripted::ScriptedBackend;
    use crate::backend::BackendError;
    use std::sync::Arc;

    #[test]
    fn test_reported_by_event() {
        assert!(reported_by_event(&SessionError::UnsupportedMediaType));
        assert!(reported_by_event(&SessionError::ExtractionFailed(
            BackendError::StreamClosed
        )));
        assert!(!reported_by_event(&SessionError::NoDocument));
        assert!(!reported_by_event(&SessionError::StreamInFlight));
    }

    #[tokio::test]
    async fn test_manuscript_path_needs_a_document() {
        let backend = Arc::new(ScriptedBackend::new());
        let bus = EventBus::new();
        let controller = SessionController::new(backend.clone(), bus.sender(), Language::English);

        let snapshot = controller.snapshot().await;
        assert_eq!(manuscript_path(&snapshot), Err(NO_DOCUMENT_HINT));

        backend.push_generate(Ok("Ready.".into()));
        backend.push_generate(Ok("[]".into()));
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.4\n").unwrap();
        controller.upload(file.path()).await.unwrap();

        let snapshot = controller.snapshot().await;
        let expected = std::fs::canonicalize(file.path()).unwrap();
        assert_eq!(manuscript_path(&snapshot), Ok(expected.as_path()));

        controller.reset().await;
        let snapshot = controller.snapshot().await;
        assert_eq!(manuscript_path(&snapshot), Err(NO_DOCUMENT_HINT));
    }
}
