//! Configuration types for the guardian engine.

use crate::error::{GuardianError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the guardian engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardianConfig {
    /// Remote reasoning gateway settings.
    pub gateway: GatewayConfig,
    /// Sensor collection settings.
    pub sensors: SensorConfig,
    /// Emergency contact and alert relay settings.
    pub emergency: EmergencyConfig,
    /// Inbound HTTP surface settings.
    pub server: ServerConfig,
}

/// Remote reasoning gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the remote reasoning service.
    pub base_url: String,
    /// Bearer token for the reasoning service (empty = no auth header).
    pub api_key: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Hard deadline for one reasoning attempt, in milliseconds.
    pub timeout_ms: u64,
    /// Retries allowed after the initial attempt.
    pub max_retries: u32,
    /// Backoff before retrying a generic transient failure, in milliseconds.
    pub base_backoff_ms: u64,
    /// Backoff before retrying a service-unavailable failure, in milliseconds.
    pub unavailable_backoff_ms: u64,
    /// Substitute a canned guardian reply when every attempt fails.
    pub canned_fallback: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8600".into(),
            api_key: String::new(),
            model: "gemini-2.5-flash".into(),
            timeout_ms: 15_000,
            max_retries: 2,
            base_backoff_ms: 1_500,
            unavailable_backoff_ms: 3_000,
            canned_fallback: true,
        }
    }
}

/// Sensor collection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    /// Deadline for a geolocation fix, in milliseconds. A slow fix is
    /// abandoned and the analysis proceeds with null coordinates.
    pub location_timeout_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            location_timeout_ms: 5_000,
        }
    }
}

/// Emergency contact and alert relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Display name of the emergency contact.
    pub contact_name: String,
    /// Phone number of the emergency contact.
    pub contact_phone: String,
    /// Optional upstream alert relay; when set, lockdown entry POSTs the
    /// live location there (single attempt, fire-and-forget).
    pub alert_relay_url: Option<String>,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            contact_name: "Mom".into(),
            contact_phone: "+91-1234567890".into(),
            alert_relay_url: None,
        }
    }
}

/// Inbound HTTP surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the guardian server binds to.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".into(),
        }
    }
}

impl GuardianConfig {
    /// Default config file location (`<config dir>/sentinel/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sentinel").join("config.toml"))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| GuardianError::Config(format!("{}: {e}", path.display())))
    }

    /// Load from the default path, falling back to defaults when the file
    /// does not exist.
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|e| GuardianError::Config(format!("serialize config: {e}")))?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}
