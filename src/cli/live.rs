//! Live view: renders engine events as they arrive.
//!
//! The streaming reply is re-rendered in place on every `MessageUpdated`.
//! On a terminal the previous frame is erased by moving the cursor up over
//! the rows it occupied; when output is piped the view only appends the new
//! suffix of the raw text.

use std::future::Future;
use std::io::{self, IsTerminal, Stdout, Write};

use crossterm::{
    cursor::MoveToPreviousLine,
    queue,
    terminal::{Clear, ClearType},
};
use tracing::{debug, warn};

use super::spinner::{Spinner, SpinnerHandle};
use crate::messaging::{BusError, EventReceiver, NoticeLevel, UiEvent};
use crate::render::{visible_rows, TerminalRenderer};
use crate::session::{ChatMessage, Language, MessageRole, StreamOutcome};

/// Fallback when the terminal width is unknown.
const DEFAULT_WIDTH: usize = 80;

/// How the in-flight reply is kept up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawMode {
    /// Erase the previous frame and render the formatted text again.
    Redraw,
    /// Write only what was appended since the last update.
    Append,
}

/// The assistant message currently being drawn.
struct LiveMessage {
    generation: u64,
    index: usize,
    rows: usize,
    printed: String,
}

pub struct LiveView<W: Write> {
    out: W,
    renderer: TerminalRenderer,
    language: Language,
    width: usize,
    mode: RedrawMode,
    spinner: Option<SpinnerHandle>,
    live: Option<LiveMessage>,
}

impl LiveView<Stdout> {
    /// View on stdout, redrawing in place when stdout is a terminal.
    pub fn stdout(language: Language) -> Self {
        let out = io::stdout();
        let mode = if out.is_terminal() {
            RedrawMode::Redraw
        } else {
            RedrawMode::Append
        };
        let width = terminal_size::terminal_size()
            .map(|(terminal_size::Width(w), _)| w as usize)
            .unwrap_or(DEFAULT_WIDTH);
        Self::new(out, language, width, mode)
    }
}

impl<W: Write> LiveView<W> {
    pub fn new(out: W, language: Language, width: usize, mode: RedrawMode) -> Self {
        Self {
            out,
            renderer: TerminalRenderer::new(),
            language,
            width,
            mode,
            spinner: None,
            live: None,
        }
    }

    pub fn renderer(&self) -> &TerminalRenderer {
        &self.renderer
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    async fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop().await;
        }
    }

    fn notice(&mut self, level: NoticeLevel, text: &str) -> io::Result<()> {
        self.renderer.render_notice(&mut self.out, level, text)
    }

    /// Render one event.
    pub async fn handle(&mut self, event: UiEvent) -> io::Result<()> {
        let labels = self.language.labels();
        match event {
            UiEvent::DocumentLoaded { name, .. } => {
                self.notice(NoticeLevel::Success, &format!("Loaded {name}"))?
            }
            UiEvent::UploadRejected { message } => self.notice(NoticeLevel::Error, &message)?,
            UiEvent::AxiomsSynthesizing { .. } => {
                if self.mode == RedrawMode::Redraw && self.spinner.is_none() {
                    self.spinner = Some(Spinner::new().start(labels.synthesizing));
                } else {
                    self.notice(NoticeLevel::Info, labels.synthesizing)?;
                }
            }
            UiEvent::AxiomsReady { count, .. } => {
                self.stop_spinner().await;
                self.notice(
                    NoticeLevel::Success,
                    &format!("{} · {count} {}", labels.ready, labels.axioms_heading),
                )?;
            }
            UiEvent::AxiomsFailed { message, .. } => {
                self.stop_spinner().await;
                self.notice(NoticeLevel::Error, &message)?;
            }
            UiEvent::LanguageChanged { language, .. } => {
                self.language = language;
                self.notice(NoticeLevel::Info, &format!("Language: {}", language.name()))?;
            }
            UiEvent::MessageStarted {
                generation,
                index,
                role: MessageRole::Assistant,
            } => {
                let placeholder = ChatMessage::assistant();
                let header = self.language.labels();
                if self.mode == RedrawMode::Redraw {
                    self.renderer
                        .render_message(&mut self.out, &placeholder, header)?;
                    self.live = Some(LiveMessage {
                        generation,
                        index,
                        rows: 1,
                        printed: String::new(),
                    });
                } else {
                    writeln!(self.out, "{}", header.assistant)?;
                    self.live = Some(LiveMessage {
                        generation,
                        index,
                        rows: 0,
                        printed: String::new(),
                    });
                }
            }
            UiEvent::MessageStarted { .. } => {}
            UiEvent::MessageUpdated {
                generation,
                index,
                text,
            } => self.update(generation, index, &text)?,
            UiEvent::StreamFinished {
                generation,
                index,
                outcome,
            } => {
                let is_current = self
                    .live
                    .as_ref()
                    .is_some_and(|l| l.generation == generation && l.index == index);
                if is_current {
                    if self.mode == RedrawMode::Append {
                        writeln!(self.out)?;
                    }
                    self.live = None;
                }
                if outcome == StreamOutcome::Discarded {
                    self.notice(NoticeLevel::Warning, "Reply discarded: the session changed")?;
                }
            }
            UiEvent::SessionReset { .. } => {
                self.stop_spinner().await;
                self.live = None;
                self.notice(NoticeLevel::Info, "New session")?;
            }
            UiEvent::Notice { level, text } => self.notice(level, &text)?,
        }
        self.out.flush()
    }

    fn update(&mut self, generation: u64, index: usize, text: &str) -> io::Result<()> {
        let Some(live) = self
            .live
            .as_mut()
            .filter(|l| l.generation == generation && l.index == index)
        else {
            debug!(generation, index, "Ignoring update for inactive message");
            return Ok(());
        };

        match self.mode {
            RedrawMode::Redraw => {
                let mut frame = Vec::new();
                self.renderer.render_text(&mut frame, text)?;
                if live.rows > 0 {
                    let rows = u16::try_from(live.rows).unwrap_or(u16::MAX);
                    queue!(self.out, MoveToPreviousLine(rows), Clear(ClearType::FromCursorDown))?;
                }
                self.out.write_all(&frame)?;
                live.rows = visible_rows(&String::from_utf8_lossy(&frame), self.width);
            }
            RedrawMode::Append => match text.strip_prefix(live.printed.as_str()) {
                Some(suffix) => write!(self.out, "{suffix}")?,
                // Replaced rather than extended, e.g. by the interruption notice.
                None => write!(self.out, "\n{text}")?,
            },
        }
        live.printed = text.to_string();
        Ok(())
    }
}

/// Run `work` to completion while rendering the events it publishes.
///
/// `events` must be subscribed before `work` starts so nothing it publishes
/// is missed. Events still queued when `work` finishes are rendered before
/// returning.
pub async fn drive<W, F, T>(
    view: &mut LiveView<W>,
    events: &mut EventReceiver,
    work: F,
) -> io::Result<T>
where
    W: Write,
    F: Future<Output = T>,
{
    tokio::pin!(work);
    let mut open = true;
    let result = loop {
        tokio::select! {
            biased;
            event = events.recv(), if open => match event {
                Ok(event) => view.handle(event).await?,
                Err(BusError::Lagged(skipped)) => warn!(skipped, "Live view fell behind"),
                Err(BusError::Closed) => open = false,
            },
            result = &mut work => break result,
        }
    };
    for event in events.drain() {
        view.handle(event).await?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::strip_ansi;
    use crate::messaging::EventBus;
    use crate::session::STREAM_INTERRUPTED_MESSAGE;

    fn view(mode: RedrawMode) -> LiveView<Vec<u8>> {
        LiveView::new(Vec::new(), Language::English, 80, mode)
    }

    fn started(generation: u64, index: usize) -> UiEvent {
        UiEvent::MessageStarted {
            generation,
            index,
            role: MessageRole::Assistant,
        }
    }

    fn updated(generation: u64, index: usize, text: &str) -> UiEvent {
        UiEvent::MessageUpdated {
            generation,
            index,
            text: text.into(),
        }
    }

    fn output(view: LiveView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    // =========================================================================
    // Append Mode Tests
    // =========================================================================

    #[tokio::test]
    async fn test_append_mode_writes_suffixes() {
        let mut view = view(RedrawMode::Append);
        view.handle(started(1, 1)).await.unwrap();
        for text in ["Hel", "Hello, ", "Hello, world"] {
            view.handle(updated(1, 1, text)).await.unwrap();
        }
        view.handle(UiEvent::StreamFinished {
            generation: 1,
            index: 1,
            outcome: StreamOutcome::Completed,
        })
        .await
        .unwrap();

        assert_eq!(output(view), "The Sanctuary\nHello, world\n");
    }

    #[tokio::test]
    async fn test_append_mode_rewrites_on_replacement() {
        let mut view = view(RedrawMode::Append);
        view.handle(started(1, 1)).await.unwrap();
        view.handle(updated(1, 1, "Partial")).await.unwrap();
        view.handle(updated(1, 1, STREAM_INTERRUPTED_MESSAGE))
            .await
            .unwrap();

        assert_eq!(
            output(view),
            "The Sanctuary\nPartial\nAnalysis stream interrupted."
        );
    }

    #[tokio::test]
    async fn test_updates_for_other_messages_are_ignored() {
        let mut view = view(RedrawMode::Append);
        view.handle(started(2, 1)).await.unwrap();
        view.handle(updated(1, 1, "stale")).await.unwrap();
        view.handle(updated(2, 3, "other")).await.unwrap();
        view.handle(updated(2, 1, "fresh")).await.unwrap();

        assert_eq!(output(view), "The Sanctuary\nfresh");
    }

    // =========================================================================
    // Redraw Mode Tests
    // =========================================================================

    #[tokio::test]
    async fn test_redraw_mode_erases_previous_frame() {
        let mut view = view(RedrawMode::Redraw);
        view.handle(started(1, 1)).await.unwrap();
        view.handle(updated(1, 1, "### Ti")).await.unwrap();
        view.handle(updated(1, 1, "### Title\nBody")).await.unwrap();

        let raw = output(view);
        // Placeholder row, then the one-row first frame, are erased in turn.
        assert_eq!(raw.matches("\x1b[1F").count(), 2);
        assert!(raw.contains("\x1b[J"));
        assert!(strip_ansi(&raw).ends_with("Title\nBody\n"));
    }

    // =========================================================================
    // Notice Tests
    // =========================================================================

    #[tokio::test]
    async fn test_lifecycle_notices() {
        let mut view = view(RedrawMode::Append);
        view.handle(UiEvent::UploadRejected {
            message: "Please upload a valid PDF document.".into(),
        })
        .await
        .unwrap();
        view.handle(UiEvent::AxiomsSynthesizing { generation: 1 })
            .await
            .unwrap();
        view.handle(UiEvent::AxiomsReady {
            generation: 1,
            count: 6,
        })
        .await
        .unwrap();

        let text = strip_ansi(&output(view));
        assert!(text.contains("✗ Please upload a valid PDF document.\n"));
        assert!(text.contains("Deconstructing stylometry...\n"));
        assert!(text.contains("✓ Analysis Protocol Ready · 6 Conceptual Axioms\n"));
    }

    #[tokio::test]
    async fn test_language_change_switches_labels() {
        let mut view = view(RedrawMode::Append);
        view.handle(UiEvent::LanguageChanged {
            generation: 2,
            language: Language::Arabic,
        })
        .await
        .unwrap();
        view.handle(started(2, 1)).await.unwrap();

        let text = strip_ansi(&output(view));
        assert!(text.contains("Language: Arabic\n"));
        assert!(text.ends_with("المعرفة\n"));
    }

    #[tokio::test]
    async fn test_discarded_stream_warns() {
        let mut view = view(RedrawMode::Append);
        view.handle(UiEvent::StreamFinished {
            generation: 1,
            index: 1,
            outcome: StreamOutcome::Discarded,
        })
        .await
        .unwrap();
        assert!(strip_ansi(&output(view)).contains("Reply discarded"));
    }

    // =========================================================================
    // Drive Tests
    // =========================================================================

    #[tokio::test]
    async fn test_drive_renders_events_published_by_work() {
        let bus = EventBus::new();
        let mut events = bus.subscribe();
        let sender = bus.sender();
        let mut view = view(RedrawMode::Append);

        let result = drive(&mut view, &mut events, async move {
            sender.publish(started(1, 1));
            tokio::task::yield_now().await;
            sender.publish(updated(1, 1, "Hello"));
            sender.publish(UiEvent::StreamFinished {
                generation: 1,
                index: 1,
                outcome: StreamOutcome::Completed,
            });
            42
        })
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(output(view), "The Sanctuary\nHello\n");
    }

    #[test]
    fn test_drive_without_events() {
        let bus = EventBus::new();
        let mut events = bus.subscribe();
        let mut view = view(RedrawMode::Append);

        let result = tokio_test::block_on(drive(&mut view, &mut events, async { "done" }));

        assert_eq!(result.unwrap(), "done");
        assert!(output(view).is_empty());
    }
}
