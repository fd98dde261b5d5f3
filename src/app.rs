use adw::Application;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ChatError;

/// Server address and session token, stored as TOML in the user config dir.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    pub base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("webchat.toml"))
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }

    pub fn load() -> Self {
        match Self::toml_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|err| {
                log::warn!("Ignoring config {}: {err}", path.display());
                Self::new()
            }),
            None => Self::new(),
        }
    }

    /// A missing file is an empty config, not an error.
    pub fn load_from(path: &Path) -> Result<Self, ChatError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(err) => return Err(err.into()),
        };
        toml::from_str(&text).map_err(|e| ChatError::Config(e.to_string()))
    }

    pub fn save(&self) -> Result<(), ChatError> {
        let path = Self::toml_path().ok_or_else(|| ChatError::Config("No config dir".into()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ChatError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self).map_err(|e| ChatError::Config(e.to_string()))?;
        fs::write(path, toml)?;
        Ok(())
    }
}

pub fn build_ui(app: &Application) {
    let config = AppConfig::load();
    if config.is_configured() {
        crate::ui::main_window::show_main_window(app, config);
    } else {
        crate::ui::login::show_login_window(app);
    }
}
