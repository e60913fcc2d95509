//! Settings loaded from `settings.json` with environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::XdgDirs;
use crate::backend::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::session::Language;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
}

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Environment variable overriding the model id.
pub const MODEL_VAR: &str = "KNOWLEDGE_MODEL";

/// User settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model id, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// REST base URL up to and including the API version.
    pub base_url: String,
    /// Literal key or a `$VAR` / `${VAR}` reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Research language used at startup.
    pub language: Language,
    /// Upper bound on connection setup. Streams themselves are never timed out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            language: Language::default(),
            connect_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load from the XDG settings file and apply environment overrides.
    pub fn load() -> Result<Self, SettingsError> {
        let mut settings = Self::load_from(&XdgDirs::new().settings_file())?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating the parent directory.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply environment overrides that replace file values.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup(MODEL_VAR).filter(|m| !m.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
    }

    /// Resolve the API key: environment first, then the settings value.
    ///
    /// Returns `Ok(None)` when no key is configured anywhere.
    pub fn resolve_api_key(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<String>, SettingsError> {
        for var in API_KEY_VARS {
            if let Some(key) = lookup(var).filter(|k| !k.trim().is_empty()) {
                return Ok(Some(key));
            }
        }

        let Some(raw) = self.api_key.as_deref() else {
            return Ok(None);
        };

        // shellexpand handles both $VAR and ${VAR}
        let expanded = shellexpand::env_with_context(raw, |var| {
            lookup(var)
                .map(Some)
                .ok_or(std::env::VarError::NotPresent)
        })
        .map_err(|e| SettingsError::EnvVarNotFound(e.var_name))?;

        let key = expanded.trim().to_string();
        Ok((!key.is_empty()).then_some(key))
    }

    /// [`resolve_api_key`](Self::resolve_api_key) against the process environment.
    pub fn api_key_from_env(&self) -> Result<Option<String>, SettingsError> {
        self.resolve_api_key(|key| std::env::var(key).ok())
    }
}
