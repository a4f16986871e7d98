//! Client settings with TOML persistence

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::secret::TransportAlgorithm;

/// Directory below the user configuration directory
pub const CONFIG_DIR_NAME: &str = "simplesecret";

/// Settings file name
pub const CONFIG_FILE_NAME: &str = "client.toml";

/// Client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// How long to wait for the user to answer a prompt
    #[serde(with = "humantime_serde")]
    pub prompt_timeout: Duration,
    /// How long to wait for a lock to show up in the collection state
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    /// How long to wait for a creation signal when a reply carries no path
    #[serde(with = "humantime_serde")]
    pub notification_wait: Duration,
    /// Transport algorithm to negotiate
    pub algorithm: TransportAlgorithm,
    /// Parent window id for prompts; empty for none
    pub window_id: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            prompt_timeout: Duration::from_secs(120),
            settle_delay: Duration::from_millis(100),
            notification_wait: Duration::from_millis(500),
            algorithm: TransportAlgorithm::Dh,
            window_id: String::new(),
        }
    }
}

impl ClientSettings {
    /// Default location of the settings file
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Parses settings from TOML
    ///
    /// Missing keys take their default values.
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::Validation` for invalid values.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a file
    ///
    /// # Errors
    /// Returns `ConfigError::NotFound` if the file does not exist, or any
    /// error from [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        let settings = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded client settings");
        Ok(settings)
    }

    /// Loads settings from the default location, falling back to defaults
    #[must_use]
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(settings) => settings,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid client settings");
                Self::default()
            }
        }
    }

    /// Writes settings to a file, creating parent directories
    ///
    /// # Errors
    /// Returns `ConfigError::Serialize` or `ConfigError::Write` on failure.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write(e.to_string()))?;
        debug!(path = %path.display(), "Saved client settings");
        Ok(())
    }

    /// Checks the values
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` for a zero prompt timeout.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.prompt_timeout.is_zero() {
            return Err(ConfigError::Validation {
                field: "prompt_timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Sets the prompt timeout
    #[must_use]
    pub const fn with_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    /// Sets the transport algorithm
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: TransportAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}
