// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Hookrelay configuration
//!
//! Loaded from a TOML file, then overridden by environment variables.
//!
//! ```toml
//! [plugin]
//! endpoint = "unix:///run/crane/cplugind.sock"
//! connect_timeout_ms = 3000
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HookRelayError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HookRelayConfig {
    #[serde(default)]
    pub plugin: PluginConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection and delivery settings for the plugin daemon client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginConfig {
    /// Unix socket of the plugin daemon (`unix:///path`, `unix:/path` or a bare path)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// How long each readiness poll may wait before reporting "not connected"
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Sleep between polls while disconnected, and after a deferred batch
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,

    /// Sleep when connected but there is nothing to send
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    /// Per-RPC deadline (None = no deadline)
    #[serde(default)]
    pub rpc_timeout_ms: Option<u64>,

    /// HTTP/2 keepalive ping interval
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,

    /// How long to wait for a keepalive ack before treating the link as dead
    #[serde(default = "default_keepalive_timeout_secs")]
    pub keepalive_timeout_secs: u64,

    /// Send keepalive pings even with no RPC in flight
    #[serde(default = "default_keepalive_while_idle")]
    pub keepalive_while_idle: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset (e.g. "info", "hookrelay_core=debug")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default values
fn default_endpoint() -> String {
    "unix:///run/crane/cplugind.sock".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_reconnect_backoff_ms() -> u64 {
    1000
}

fn default_idle_interval_ms() -> u64 {
    100
}

fn default_keepalive_interval_secs() -> u64 {
    30
}

fn default_keepalive_timeout_secs() -> u64 {
    10
}

fn default_keepalive_while_idle() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            idle_interval_ms: default_idle_interval_ms(),
            rpc_timeout_ms: None,
            keepalive_interval_secs: default_keepalive_interval_secs(),
            keepalive_timeout_secs: default_keepalive_timeout_secs(),
            keepalive_while_idle: default_keepalive_while_idle(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl PluginConfig {
    /// Filesystem path of the daemon socket, with any `unix:` scheme stripped.
    pub fn socket_path(&self) -> Result<PathBuf> {
        let endpoint = self.endpoint.trim();
        let path = endpoint
            .strip_prefix("unix://")
            .or_else(|| endpoint.strip_prefix("unix:"))
            .unwrap_or(endpoint);

        if path.is_empty() {
            return Err(HookRelayError::InvalidEndpoint(self.endpoint.clone()));
        }
        if endpoint.contains("://") && !endpoint.starts_with("unix://") {
            return Err(HookRelayError::InvalidEndpoint(format!(
                "{} (only unix sockets are supported)",
                self.endpoint
            )));
        }
        Ok(PathBuf::from(path))
    }
}

impl HookRelayConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - HOOKRELAY_PLUGIN_ENDPOINT: plugin daemon socket
    /// - HOOKRELAY_CONNECT_TIMEOUT_MS: readiness poll timeout
    /// - HOOKRELAY_RPC_TIMEOUT_MS: per-RPC deadline
    /// - HOOKRELAY_LOG_LEVEL: default log filter
    /// - HOOKRELAY_LOG_JSON: JSON log output (true/false)
    pub fn from_env() -> Self {
        Self::default().merge_with_env()
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        let config = config.merge_with_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields whose environment variable is explicitly set.
    fn merge_with_env(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("HOOKRELAY_PLUGIN_ENDPOINT") {
            self.plugin.endpoint = endpoint;
        }

        if let Ok(timeout) = std::env::var("HOOKRELAY_CONNECT_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse() {
                self.plugin.connect_timeout_ms = val;
            }
        }

        if let Ok(timeout) = std::env::var("HOOKRELAY_RPC_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse() {
                self.plugin.rpc_timeout_ms = Some(val);
            }
        }

        if let Ok(level) = std::env::var("HOOKRELAY_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("HOOKRELAY_LOG_JSON") {
            self.logging.json = json.parse().unwrap_or(false);
        }

        self
    }

    pub fn validate(&self) -> Result<()> {
        self.plugin.socket_path()?;

        if self.plugin.connect_timeout_ms == 0 {
            return Err(HookRelayError::Config(
                "plugin.connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.plugin.reconnect_backoff_ms == 0 {
            return Err(HookRelayError::Config(
                "plugin.reconnect_backoff_ms must be greater than zero".to_string(),
            ));
        }
        if self.plugin.idle_interval_ms == 0 {
            return Err(HookRelayError::Config(
                "plugin.idle_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.plugin.rpc_timeout_ms == Some(0) {
            return Err(HookRelayError::Config(
                "plugin.rpc_timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}
