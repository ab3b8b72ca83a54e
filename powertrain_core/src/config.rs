//! TOML configuration loading for the powertrain core and runner.
//!
//! A vehicle file holds the powertrain tunables at the top level plus an
//! optional `[runner]` table used by the scenario runner:
//!
//! ```toml
//! [gearbox]
//! final_drive = 4.1
//!
//! [engine]
//! idle_rpm = 850.0
//!
//! [runner]
//! step_hz = 250
//! ```
//!
//! Malformed tunables are repaired later by the core and never fail here.
//! Only unreadable files, TOML syntax errors, an unknown layout version and
//! an unusable runner step are errors.

use std::path::Path;

use serde::{Deserialize, Serialize};

use powertrain_common::config::{ConfigError, ConfigLoader, LogLevel};
use powertrain_common::powertrain::config::{CONFIG_VERSION, PowertrainConfig};

use crate::sim::BodyConfig;

// ─── Runner Config ──────────────────────────────────────────────────

/// Scenario runner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub log_level: LogLevel,
    /// Fixed simulation rate [Hz].
    pub step_hz: u32,
    /// Ticks between two summary log lines.
    pub summary_interval: u32,
    pub body: BodyConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            step_hz: 250,
            summary_interval: 250,
            body: BodyConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Fixed step length [s].
    #[inline]
    pub fn step_s(&self) -> f64 {
        1.0 / f64::from(self.step_hz.max(1))
    }
}

// ─── Loaded Config Bundle ───────────────────────────────────────────

/// Parsed vehicle file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadedConfig {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(flatten)]
    pub powertrain: PowertrainConfig,
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and check a vehicle file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let loaded = LoadedConfig::load(path)?;
    validate(&loaded)?;
    tracing::debug!(path = %path.display(), version = loaded.powertrain.version, "config loaded");
    Ok(loaded)
}

/// Parse and check an in-memory vehicle file.
pub fn load_config_str(content: &str) -> Result<LoadedConfig, ConfigError> {
    let loaded = LoadedConfig::from_toml(content)?;
    validate(&loaded)?;
    Ok(loaded)
}

fn validate(loaded: &LoadedConfig) -> Result<(), ConfigError> {
    let version = loaded.powertrain.version;
    if version == 0 || version > CONFIG_VERSION {
        return Err(ConfigError::ValidationError(format!(
            "unsupported config version {version} (supported: 1..={CONFIG_VERSION})"
        )));
    }
    if loaded.runner.step_hz == 0 {
        return Err(ConfigError::ValidationError("runner.step_hz must be positive".into()));
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────
