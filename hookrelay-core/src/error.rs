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

//! Error types for hookrelay.

use thiserror::Error;

/// Result type for hookrelay operations
pub type Result<T> = std::result::Result<T, HookRelayError>;

/// Errors surfaced while setting up or configuring the delivery subsystem.
///
/// Delivery itself never returns errors to producers; RPC failures are
/// classified and logged by the delivery loop.
#[derive(Debug, Error)]
pub enum HookRelayError {
    #[error("Invalid plugin endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Failed to build transport runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to spawn delivery worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging already initialized: {0}")]
    Logging(String),
}
