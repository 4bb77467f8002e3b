//! Configuration management for the relay.
//!
//! Loads configuration from a TOML file and provides runtime defaults.
//! The source mode and sink target are kept as strings here and validated
//! into typed values at startup, so a misconfigured sink fails loudly
//! before the first poll tick.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where to read images from: "clipboard" or a directory path
    #[serde(default = "default_source")]
    pub source: String,

    /// Where to write recognized text: "clipboard", "live-broadcast",
    /// or a path to a .txt file
    #[serde(default = "default_sink")]
    pub sink: String,

    /// How often to check for new images, in seconds
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,

    /// Log transient source errors as warnings instead of swallowing them
    #[serde(default)]
    pub verbose: bool,

    /// Local address the subscriber push channel listens on
    #[serde(default = "default_broadcast_addr")]
    pub broadcast_addr: String,

    /// Path to the OCR engine binary; searched for in common locations
    /// when unset
    #[serde(default)]
    pub ocr_binary: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: default_source(),
            sink: default_sink(),
            delay_secs: default_delay_secs(),
            verbose: false,
            broadcast_addr: default_broadcast_addr(),
            ocr_binary: None,
        }
    }
}

// Default value functions for serde
fn default_source() -> String {
    "clipboard".to_string()
}

fn default_sink() -> String {
    "live-broadcast".to_string()
}

fn default_delay_secs() -> f64 {
    0.1
}

fn default_broadcast_addr() -> String {
    "127.0.0.1:6699".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ocr-relay")
            .join("config.toml")
    }

    /// Poll delay as a [`Duration`]
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs)
    }
}
