//! CLI configuration loading.
//!
//! Consolidates the scheduler and link configurations into a single TOML
//! file. Every field falls back to its default, so a partial file (or no
//! file at all) is fine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use roverlink_ble::BleLinkConfig;
use roverlink_core::SchedulerConfig;

use crate::error::Result;

/// Complete configuration for the roverlink CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Command pacing and keep-alive settings.
    pub scheduler: SchedulerConfig,

    /// BLE serial link settings.
    pub ble: BleLinkConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)?;
        Ok(config)
    }
}
