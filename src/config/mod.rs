//! Configuration management.

mod settings;
mod xdg;

pub use settings::{Settings, SettingsError, API_KEY_VARS, MODEL_VAR};
pub use xdg::XdgDirs;
