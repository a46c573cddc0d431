// SPDX-License-Identifier: GPL-3.0-only

//! Application configuration
//!
//! Loaded once at startup from `config.json` under the user config
//! directory. A missing or malformed file falls back to defaults; the
//! scanner must come up even with a broken config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::{audio, timing};

const DEFAULT_CAPTION: &str = "Scan result";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Caption drawn above the magnified code
    pub caption: String,
    /// Date line drawn under the caption
    pub caption_date: String,
    /// Feedback sound played on detection; None selects the system sound
    pub cue_sound: Option<PathBuf>,
    /// Directory for saved code images; None selects the pictures directory
    pub save_dir: Option<PathBuf>,
    /// Capture device node to attach; None lets the platform pick
    pub device_path: Option<String>,
    /// Milliseconds between decode attempts on the analyzer thread
    pub scan_interval_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            caption: DEFAULT_CAPTION.to_string(),
            caption_date: String::new(),
            cue_sound: None,
            save_dir: None,
            device_path: None,
            scan_interval_ms: None,
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults on any problem
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            debug!("No config directory; using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load from an explicit path; a missing file is not an error
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Config not read; using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => {
                debug!(path = %path.display(), "Config loaded");
                config
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Config malformed; using defaults");
                Self::default()
            }
        }
    }

    /// Default config file location
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qr-mirror").join("config.json"))
    }

    /// Feedback cue to play on detection
    pub fn cue_path(&self) -> PathBuf {
        self.cue_sound
            .clone()
            .unwrap_or_else(|| PathBuf::from(audio::DEFAULT_CUE))
    }

    /// Decode pace for the analyzer thread
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.unwrap_or(timing::SCAN_INTERVAL_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.caption, "Scan result");
        assert!(config.caption_date.is_empty());
        assert!(config.cue_sound.is_none());
        assert!(config.save_dir.is_none());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Config::load_from(Path::new("/nonexistent-qr-mirror/config.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"caption": "Library card"}"#).expect("parse");
        assert_eq!(config.caption, "Library card");
        assert_eq!(config.caption_date, "");
        assert!(config.cue_sound.is_none());
    }

    #[test]
    fn test_cue_path_falls_back_to_system_sound() {
        let config = Config::default();
        assert_eq!(config.cue_path(), PathBuf::from(audio::DEFAULT_CUE));

        let config = Config {
            cue_sound: Some(PathBuf::from("/tmp/beep.oga")),
            ..Config::default()
        };
        assert_eq!(config.cue_path(), PathBuf::from("/tmp/beep.oga"));
    }

    #[test]
    fn test_scan_interval_falls_back_to_default() {
        let config = Config::default();
        assert_eq!(
            config.scan_interval(),
            Duration::from_millis(timing::SCAN_INTERVAL_MS)
        );

        let config = Config {
            scan_interval_ms: Some(250),
            ..Config::default()
        };
        assert_eq!(config.scan_interval(), Duration::from_millis(250));
    }
}
