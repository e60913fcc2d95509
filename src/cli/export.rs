//! Export of the current session as an HTML page or plain text.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::info;

use crate::engine::{SessionController, SessionSnapshot};
use crate::format::{format_text, UnicodeMathRenderer};
use crate::render::render_transcript;
use crate::session::MessageRole;

/// File name used when `/export` gets no path.
pub fn default_export_name(now: DateTime<Local>) -> String {
    format!("knowledge-{}.html", now.format("%Y%m%d-%H%M%S"))
}

/// Whether `path` asks for a plain-text export (`.txt` or `.md`).
pub fn wants_plain_text(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("md"))
}

/// The session as plain text with all formatting markup removed.
pub fn plain_transcript(snapshot: &SessionSnapshot) -> String {
    let labels = snapshot.language.labels();
    let mut out = String::from("Knowledge AI");
    if let Some(name) = &snapshot.document {
        let _ = write!(out, " · {name}");
    }
    out.push_str("\n");

    if let Some(axioms) = snapshot.axioms.as_ref().filter(|a| !a.is_empty()) {
        let _ = write!(out, "\n{}\n", labels.axioms_heading);
        for (n, axiom) in axioms.items.iter().enumerate() {
            let _ = writeln!(out, "{}. {}: {}", n + 1, axiom.title, axiom.definition);
        }
    }

    for message in &snapshot.transcript.messages {
        let speaker = match message.role {
            MessageRole::User => labels.user,
            MessageRole::Assistant => labels.assistant,
        };
        let _ = write!(out, "\n{speaker}:\n{}\n", format_text(&message.text).plain_text());
    }
    out
}

/// Write the session to `path`, creating parent directories.
///
/// `.txt` and `.md` paths get [`plain_transcript`]; anything else gets the
/// HTML page.
pub async fn export_session(controller: &SessionController, path: &Path) -> Result<PathBuf> {
    let snapshot = controller.snapshot().await;
    let contents = if wants_plain_text(path) {
        plain_transcript(&snapshot)
    } else {
        render_transcript(
            snapshot.language,
            snapshot.document.as_deref(),
            snapshot.axioms.as_ref(),
            &snapshot.transcript,
            &UnicodeMathRenderer,
        )
        .into_string()
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), messages = snapshot.transcript.len(), "Session exported");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::scripted::{ScriptedBackend, ScriptedStream};
    use crate::messaging::EventBus;
    use crate::session::Language;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_default_export_name() {
        let now = Local.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(default_export_name(now), "knowledge-20260309-140507.html");
    }

    #[tokio::test]
    async fn test_export_empty_session() {
        let bus = EventBus::new();
        let controller = SessionController::new(
            Arc::new(ScriptedBackend::new()),
            bus.sender(),
            Language::Arabic,
        );
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.html");

        let written = export_session(&controller, &path).await.unwrap();

        assert_eq!(written, path);
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("dir=\"rtl\""));
        assert!(html.contains("<title>Knowledge AI</title>"));
    }

    #[test]
    fn test_wants_plain_text() {
        assert!(wants_plain_text(Path::new("notes.txt")));
        assert!(wants_plain_text(Path::new("dir/notes.MD")));
        assert!(!wants_plain_text(Path::new("page.html")));
        assert!(!wants_plain_text(Path::new("no-extension")));
    }

    #[tokio::test]
    async fn test_plain_export_strips_markup() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_generate(Ok("Ready.".into()));
        backend.push_generate(Ok(r#"[{"title":"Order","definition":"Form precedes sense."}]"#.into()));
        backend.push_stream(ScriptedStream::Chunks(vec![
            "The ***core*** is $x^2$ ".into(),
            "and $$y$$ too.".into(),
        ]));
        let bus = EventBus::new();
        let controller = SessionController::new(backend, bus.sender(), Language::English);

        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.7\n").unwrap();
        controller.upload(&pdf).await.unwrap();
        controller.send_message("What is central?").await.unwrap();

        let path = dir.path().join("notes.txt");
        export_session(&controller, &path).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "Knowledge AI · paper.pdf\n\
             \nConceptual Axioms\n\
             1. Order: Form precedes sense.\n\
             \nResearcher:\nWhat is central?\n\
             \nThe Sanctuary:\nThe core is x^2 and y too.\n"
        );
    }
}
