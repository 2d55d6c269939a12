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

//! Hookrelay Core
//!
//! Asynchronous delivery of scheduler job hook events (job start, job end,
//! job resource monitor) to the plugin daemon.
//!
//! ## Architecture
//!
//! ```text
//! scheduler threads ─┬─► PluginClient::*_hook_async ─► EventQueue (unbounded, lock-free)
//!                    │                                        │
//!                    │                                        ▼
//!                    │                              DeliveryLoop (one thread)
//!                    │                                ├─ ConnectionMonitor
//!                    │                                └─ DispatchTable ─► PluginStub ─► daemon
//!                    │                                        │
//!                    └──────────── UNAVAILABLE ◄──────────────┘ (tail re-enqueued)
//! ```
//!
//! Producers never block and never see errors. Delivery is at-least-once and
//! best-effort ordered; nothing is persisted across restarts.

pub mod client;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod logging;
pub mod monitor;
pub mod queue;
pub mod transport;

pub use client::{with_elapsed_time, Clock, PluginClient, SystemClock};
pub use config::{HookRelayConfig, LoggingConfig, PluginConfig};
pub use delivery::{
    is_transient, DeliveryCounters, DeliveryLoop, DeliverySettings, DeliveryStats,
    IterationOutcome,
};
pub use dispatch::{CallContext, DispatchTable, HookDispatchFn, PluginStub};
pub use error::{HookRelayError, Result};
pub use event::{HookEvent, HookPayload, HookType};
pub use logging::init_logging;
pub use monitor::{ConnectionMonitor, ConnectionState, Transition};
pub use queue::EventQueue;
pub use transport::GrpcTransport;

pub use hookrelay_proto as proto;
