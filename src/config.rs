// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{FacingMode, VideoResolution};
use crate::constants::app_info::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use crate::constants::timing::DEFAULT_SCAN_TIMEOUT;
use crate::errors::ConfigError;
use crate::frame_processor::RecognizerSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// User configuration
///
/// Missing fields fall back to their defaults, so older config files keep
/// loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stream resolution preset
    pub resolution: VideoResolution,
    /// Facing used when no camera has been selected yet
    pub preferred_facing: FacingMode,
    /// Acceptable facings; `None` entries match cameras of unknown facing
    pub facing_filter: Option<Vec<Option<FacingMode>>>,
    /// How long a searching state may persist before the scan times out
    pub scan_timeout_ms: u64,
    /// Mirror the preview of user-facing cameras (selfie mode)
    pub mirror_front_camera: bool,
    /// Recognizer configuration applied when the worker starts
    pub recognizer: RecognizerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolution: VideoResolution::default(),
            preferred_facing: FacingMode::Back,
            facing_filter: None,
            scan_timeout_ms: DEFAULT_SCAN_TIMEOUT.as_millis() as u64,
            mirror_front_camera: true,
            recognizer: RecognizerSettings::default(),
        }
    }
}

impl Config {
    /// Default location: `<config dir>/document-capture/config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Write to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }
}
