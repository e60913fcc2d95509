//! Activity indicator shown while a document is being analyzed.
//!
//! The label comes from the session language and the line is redrawn in
//! place with the elapsed time, e.g. `⠹ Deconstructing stylometry... 4s`.

use std::io::{stdout, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor::{Hide, MoveToColumn, Show},
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Braille frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Frame period.
const TICK: Duration = Duration::from_millis(80);

#[derive(Debug, Clone)]
pub struct SpinnerConfig {
    pub frames: Vec<&'static str>,
    pub tick: Duration,
    pub color: Color,
    /// Append whole elapsed seconds once the first one has passed.
    pub show_elapsed: bool,
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            frames: FRAMES.to_vec(),
            tick: TICK,
            color: Color::Cyan,
            show_elapsed: true,
        }
    }
}

/// Text of one frame.
pub fn frame_line(config: &SpinnerConfig, tick: usize, label: &str, elapsed: Duration) -> String {
    let frame = config
        .frames
        .get(tick % config.frames.len().max(1))
        .copied()
        .unwrap_or("");
    let secs = elapsed.as_secs();
    if config.show_elapsed && secs > 0 {
        format!("{frame} {label} {secs}s")
    } else {
        format!("{frame} {label}")
    }
}

fn draw(config: &SpinnerConfig, line: &str) -> std::io::Result<()> {
    let mut out = stdout();
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        SetForegroundColor(config.color),
        Print(line),
        ResetColor
    )?;
    out.flush()
}

fn clear_line() -> std::io::Result<()> {
    let mut out = stdout();
    queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine), Show)?;
    out.flush()
}

/// A running indicator. Stopping or dropping it restores the cursor.
pub struct SpinnerHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SpinnerHandle {
    /// Stop the animation and erase its line.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        let _ = clear_line();
    }
}

impl Drop for SpinnerHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.stop_tx.send(true);
            let _ = clear_line();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Spinner {
    config: SpinnerConfig,
}

impl Spinner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SpinnerConfig) -> Self {
        Self { config }
    }

    /// Start animating `label` on stdout.
    pub fn start(&self, label: impl Into<String>) -> SpinnerHandle {
        let config = self.config.clone();
        let label = label.into();
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut interval = tokio::time::interval(config.tick);
            let _ = queue!(stdout(), Hide);
            for tick in 0usize.. {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = stop_rx.changed() => break,
                }
                if *stop_rx.borrow() {
                    break;
                }
                let _ = draw(&config, &frame_line(&config, tick, &label, started.elapsed()));
            }
        });

        SpinnerHandle {
            stop_tx,
            task: Some(task),
        }
    }
}
