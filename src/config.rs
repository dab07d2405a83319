// src/config.rs

//! Defines the configuration structures for the painter.
//!
//! Settings are deserialized from a JSON file named by the `PAINTER_CONFIG`
//! environment variable. Every section carries `#[serde(default)]`, so a file
//! only needs to mention the values it overrides. A missing or unreadable file
//! falls back to the defaults.

use crate::renderer::RenderStyle;
use anyhow::{Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the path of the JSON config file.
pub const CONFIG_ENV_VAR: &str = "PAINTER_CONFIG";

/// Process-wide configuration, loaded on first use.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

// --- Top-Level Configuration Structure ---

/// Represents the complete configuration for the painter.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Processing loop settings.
    #[serde(rename = "loop")]
    pub loop_settings: LoopConfig,
    /// Colors and coordinate mapping used when rendering scenes.
    pub render: RenderStyle,
}

impl Config {
    /// Reads and parses a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Loads the file named by `PAINTER_CONFIG`, or the defaults.
    pub fn from_env() -> Self {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)).unwrap_or_else(|e| {
                warn!("{:#}. Using default configuration.", e);
                Config::default()
            }),
            None => {
                info!("{} not set, using default configuration", CONFIG_ENV_VAR);
                Config::default()
            }
        }
    }
}

// --- Loop Configuration ---

/// Settings for the processing loop and the buffers it allocates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoopConfig {
    /// Interval between polling ticks, in milliseconds.
    pub tick_interval_ms: u64,
    /// Width of each frame buffer in pixels.
    pub frame_width: u32,
    /// Height of each frame buffer in pixels.
    pub frame_height: u32,
}

impl LoopConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            tick_interval_ms: 10,
            frame_width: 400,
            frame_height: 400,
        }
    }
}
