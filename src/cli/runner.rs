//! CLI runner for interactive and single-question modes.

use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};

use super::export::export_session;
use super::live::{drive, LiveView};
use super::repl::Repl;
use crate::backend::{BackendError, GeminiBackend};
use crate::config::{Settings, XdgDirs};
use crate::engine::SessionController;
use crate::messaging::{EventBus, NoticeLevel};
use crate::render::TerminalRenderer;
use crate::session::{ChatMessage, Language, StreamOutcome};

/// Options shared by both modes.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Document to upload before anything else.
    pub pdf: Option<PathBuf>,
    /// Ask one question and exit.
    pub question: Option<String>,
    /// Write the session page here before exiting (single-question mode).
    pub export: Option<PathBuf>,
    pub language: Option<Language>,
    pub model: Option<String>,
}

/// Everything a mode needs to talk to the engine.
struct Runtime {
    controller: SessionController,
    bus: EventBus,
    dirs: XdgDirs,
    language: Language,
}

fn build_runtime(options: &RunOptions) -> anyhow::Result<Runtime> {
    let dirs = XdgDirs::new();
    let mut settings = Settings::load_from(&dirs.settings_file())
        .with_context(|| format!("Failed to load {}", dirs.settings_file().display()))?;
    settings.apply_env(|key| std::env::var(key).ok());
    if let Some(model) = &options.model {
        settings.model = model.clone();
    }

    let api_key = settings.api_key_from_env()?;
    if api_key.is_none() {
        warn!("No API key configured");
        let _ = TerminalRenderer::new().render_notice(
            &mut std::io::stderr(),
            NoticeLevel::Warning,
            &BackendError::MissingApiKey.to_string(),
        );
    }

    let backend = GeminiBackend::from_settings(&settings, api_key)?;
    let language = options.language.unwrap_or(settings.language);
    let bus = EventBus::new();
    let controller = SessionController::new(Arc::new(backend), bus.sender(), language);
    info!(model = %settings.model, language = %language, "Session controller ready");

    Ok(Runtime {
        controller,
        bus,
        dirs,
        language,
    })
}

/// Upload `options.pdf`, ask `question` and exit.
pub async fn run_single_question(options: RunOptions, question: &str) -> anyhow::Result<()> {
    let Some(pdf) = options.pdf.clone() else {
        bail!("--ask needs a document (--pdf <path>)");
    };
    let runtime = build_runtime(&options)?;
    let controller = runtime.controller.clone();
    let mut events = runtime.bus.subscribe();
    let mut view = LiveView::stdout(runtime.language);
    let renderer = TerminalRenderer::new();
    let labels = runtime.language.labels();

    let uploaded = drive(&mut view, &mut events, controller.upload(&pdf)).await?;
    let snapshot = controller.snapshot().await;
    if let Err(e) = uploaded {
        // A failed axiom pass still leaves a primed chat usable.
        if !snapshot.chat_ready {
            bail!(e);
        }
        warn!(error = %e, "Continuing without axioms");
    }

    if let Some(axioms) = snapshot.axioms.as_ref().filter(|a| !a.is_empty()) {
        renderer.render_axioms(&mut stdout(), axioms, labels)?;
        println!();
    }

    renderer.render_message(&mut stdout(), &ChatMessage::user(question), labels)?;
    let outcome = match drive(&mut view, &mut events, controller.send_message(question)).await? {
        Ok(outcome) => outcome,
        Err(e) => {
            renderer.render_notice(&mut stdout(), NoticeLevel::Error, &e.user_message())?;
            bail!(e);
        }
    };

    if let Some(path) = &options.export {
        let written = export_session(&controller, path).await?;
        renderer.render_notice(
            &mut stdout(),
            NoticeLevel::Success,
            &format!("Exported to {}", written.display()),
        )?;
    }

    if outcome == StreamOutcome::Interrupted {
        bail!("The reply stream was interrupted");
    }
    Ok(())
}

/// Run in interactive mode.
pub async fn run_interactive(options: RunOptions) -> anyhow::Result<()> {
    let runtime = build_runtime(&options)?;
    if let Err(e) = runtime.dirs.ensure_dirs() {
        warn!(error = %e, "Could not create state directories");
    }

    let mut repl = Repl::new(
        runtime.controller,
        &runtime.bus,
        runtime.dirs,
        runtime.language,
    );
    if let Some(pdf) = &options.pdf {
        repl.preload(pdf).await?;
    }
    repl.run().await
}

/// Dispatch to the mode `options` selects.
pub async fn run(options: RunOptions) -> anyhow::Result<()> {
    match options.question.clone() {
        Some(question) => run_single_question(options, &question).await,
        None => run_interactive(options).await,
    }
}

/// Get the application version string.
pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
