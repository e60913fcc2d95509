//! XDG Base Directory support.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "knowledge-ai";

/// XDG directory paths for Knowledge AI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XdgDirs {
    /// Config directory (~/.config/knowledge-ai or XDG_CONFIG_HOME/knowledge-ai)
    pub config: PathBuf,
    /// State directory (~/.local/state/knowledge-ai or XDG_STATE_HOME/knowledge-ai)
    pub state: PathBuf,
}

impl XdgDirs {
    /// Get XDG directories, respecting environment variables.
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::resolve(&home, |key| std::env::var(key).ok())
    }

    /// Resolve directories against `home` using `lookup` for the XDG variables.
    pub fn resolve(home: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let dir = |var: &str, fallback: &str| {
            lookup(var)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| home.join(fallback))
                .join(APP_DIR)
        };

        Self {
            config: dir("XDG_CONFIG_HOME", ".config"),
            state: dir("XDG_STATE_HOME", ".local/state"),
        }
    }

    /// Ensure all directories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.config, &self.state] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// `settings.json` inside the config directory.
    pub fn settings_file(&self) -> PathBuf {
        self.config.join("settings.json")
    }

    /// Line-editor history inside the state directory.
    pub fn history_file(&self) -> PathBuf {
        self.state.join("history.txt")
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}
