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

//! Connection health tracking for the plugin transport.

use std::time::Duration;

use tracing::{info, warn};

use crate::dispatch::PluginStub;

/// Last observed state of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No poll has completed yet.
    Unknown,
    Connected,
    NotConnected,
}

/// Edge reported when a poll changes the connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Connected,
    Disconnected,
}

/// Polls transport readiness and logs only on state changes.
#[derive(Debug)]
pub struct ConnectionMonitor {
    state: ConnectionState,
    timeout: Duration,
}

impl ConnectionMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: ConnectionState::Unknown,
            timeout,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait up to the configured timeout for the stub to report readiness.
    pub fn poll<S: PluginStub>(&mut self, stub: &mut S) -> bool {
        let connected = stub.wait_for_connected(self.timeout);
        match self.observe(connected) {
            Some(Transition::Connected) => info!("Plugin daemon is connected"),
            Some(Transition::Disconnected) => {
                warn!("Plugin daemon is not connected, events will be held until it returns")
            }
            None => {}
        }
        connected
    }

    /// Record a poll result, returning the edge if the state changed.
    pub fn observe(&mut self, connected: bool) -> Option<Transition> {
        let next = if connected {
            ConnectionState::Connected
        } else {
            ConnectionState::NotConnected
        };
        let previous = std::mem::replace(&mut self.state, next);
        if previous == next {
            return None;
        }
        Some(if connected {
            Transition::Connected
        } else {
            Transition::Disconnected
        })
    }
}
