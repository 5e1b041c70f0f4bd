//! Configuration management

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub reconnect: ReconnectConfig,
    pub focus: FocusConfig,
    pub session: SessionConfig,
}

/// Server endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP(S) base URL of the session service; the WebSocket endpoint is
    /// derived from it.
    pub base_url: String,

    /// Bearer token passed to both the REST API and the WebSocket endpoint.
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            token: None,
        }
    }
}

/// Reconnection backoff settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// First retry delay in milliseconds.
    pub base_delay_ms: u64,

    /// Backoff cap in milliseconds; delays never grow past this.
    pub max_delay_ms: u64,

    /// Consecutive failed attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 5000,
            max_attempts: 5,
        }
    }
}

/// Focus telemetry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Minimum milliseconds between outbound focus updates, bounding
    /// bandwidth regardless of how fast the score source samples.
    pub min_send_interval_ms: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            min_send_interval_ms: 500,
        }
    }
}

/// Session view settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Most recent chat entries retained in memory.
    pub chat_history_limit: usize,

    /// Seconds between keepalive pings.
    pub keepalive_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chat_history_limit: 50,
            keepalive_secs: 30,
        }
    }
}

impl Config {
    /// Load config from the default file, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a specific file, or return defaults if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("focal")
            .join("config.toml")
    }
}
