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

//! Hookrelay Proto
//!
//! Message types and the unary client for the `crane.grpc.plugin.CranePluginD`
//! service exposed by the plugin daemon.
//!
//! Messages are hand-written prost types. Field tags are part of the wire
//! contract with the daemon and must not be renumbered.

pub mod client;
pub mod plugin;

pub use client::CranePluginDClient;
pub use plugin::{
    EndHookReply, EndHookRequest, JobInfo, JobMonitorHookReply, JobMonitorHookRequest, JobStatus,
    StartHookReply, StartHookRequest,
};

/// Fully qualified gRPC service name.
pub const SERVICE_NAME: &str = "crane.grpc.plugin.CranePluginD";
