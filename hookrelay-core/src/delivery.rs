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

//! Delivery Loop - the single consumer of the event queue.
//!
//! ## Iteration
//!
//! ```text
//! stop flag? ──yes──► exit
//!     │
//! connected? ──no───► sleep(reconnect_backoff)
//!     │
//! queue empty? ─yes─► sleep(idle_interval)
//!     │
//! dequeue up to size_approx ─► send front to back
//!                                 ├─ ok          → drop
//!                                 ├─ UNAVAILABLE → re-enqueue rest, sleep(reconnect_backoff)
//!                                 └─ other error → log, drop
//! ```
//!
//! Only `UNAVAILABLE` is retried. A rejected event is logged and discarded.
//! The deferred tail keeps its relative order but is appended after anything
//! producers enqueued in the meantime.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tonic::{Code, Status};
use tracing::{debug, error, info, trace, warn};

use crate::config::PluginConfig;
use crate::dispatch::{CallContext, DispatchTable, PluginStub};
use crate::event::HookEvent;
use crate::monitor::ConnectionMonitor;
use crate::queue::EventQueue;

/// Timing knobs for the delivery loop.
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    /// Bounded wait for transport readiness on each iteration.
    pub connect_timeout: Duration,
    /// Sleep while disconnected and after a deferred batch.
    pub reconnect_backoff: Duration,
    /// Sleep when connected but the queue is empty.
    pub idle_interval: Duration,
    /// Optional deadline applied to each RPC.
    pub rpc_timeout: Option<Duration>,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(3000),
            reconnect_backoff: Duration::from_secs(1),
            idle_interval: Duration::from_millis(100),
            rpc_timeout: None,
        }
    }
}

impl From<&PluginConfig> for DeliverySettings {
    fn from(config: &PluginConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            reconnect_backoff: Duration::from_millis(config.reconnect_backoff_ms),
            idle_interval: Duration::from_millis(config.idle_interval_ms),
            rpc_timeout: config.rpc_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Result of one pass through the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Stop flag observed; the loop exits.
    Stopped,
    /// Transport not ready; nothing was dequeued.
    Disconnected,
    /// Connected with nothing to send.
    Idle,
    /// Every dequeued event reached a terminal outcome.
    Drained { sent: usize, rejected: usize },
    /// A transient failure pushed the unsent tail back onto the queue.
    Deferred {
        sent: usize,
        rejected: usize,
        requeued: usize,
    },
}

/// Whether an RPC failure means the daemon is unreachable rather than
/// rejecting the request.
pub fn is_transient(status: &Status) -> bool {
    status.code() == Code::Unavailable
}

/// Statistics for the delivery loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub total_dequeued: u64,
    pub total_sent: u64,
    pub total_rejected: u64,
    pub total_requeued: u64,
}

/// Counters shared between the worker and the client facade.
#[derive(Debug, Default)]
pub struct DeliveryCounters {
    dequeued: AtomicU64,
    sent: AtomicU64,
    rejected: AtomicU64,
    requeued: AtomicU64,
}

impl DeliveryCounters {
    pub fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            total_dequeued: self.dequeued.load(Ordering::Relaxed),
            total_sent: self.sent.load(Ordering::Relaxed),
            total_rejected: self.rejected.load(Ordering::Relaxed),
            total_requeued: self.requeued.load(Ordering::Relaxed),
        }
    }
}

/// The background worker that drains the queue into the plugin daemon.
pub struct DeliveryLoop<S: PluginStub> {
    stub: S,
    table: DispatchTable<S>,
    queue: EventQueue,
    monitor: ConnectionMonitor,
    stop: Arc<AtomicBool>,
    counters: Arc<DeliveryCounters>,
    settings: DeliverySettings,
}

impl<S: PluginStub> DeliveryLoop<S> {
    pub fn new(
        stub: S,
        queue: EventQueue,
        stop: Arc<AtomicBool>,
        settings: DeliverySettings,
    ) -> Self {
        Self {
            stub,
            table: DispatchTable::new(),
            queue,
            monitor: ConnectionMonitor::new(settings.connect_timeout),
            stop,
            counters: Arc::new(DeliveryCounters::default()),
            settings,
        }
    }

    pub fn counters(&self) -> Arc<DeliveryCounters> {
        Arc::clone(&self.counters)
    }

    pub fn stub(&self) -> &S {
        &self.stub
    }

    pub fn stub_mut(&mut self) -> &mut S {
        &mut self.stub
    }

    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }

    /// Run until the stop flag is observed.
    pub fn run(mut self) {
        info!(
            "Hook delivery worker started (connect_timeout={}ms, idle_interval={}ms)",
            self.settings.connect_timeout.as_millis(),
            self.settings.idle_interval.as_millis()
        );

        loop {
            match self.step() {
                IterationOutcome::Stopped => break,
                IterationOutcome::Disconnected | IterationOutcome::Deferred { .. } => {
                    thread::sleep(self.settings.reconnect_backoff)
                }
                IterationOutcome::Idle => thread::sleep(self.settings.idle_interval),
                IterationOutcome::Drained { .. } => {}
            }
        }

        info!(
            pending = self.queue.size_approx(),
            "Hook delivery worker stopped"
        );
    }

    /// One pass through the loop, without the trailing sleep.
    pub fn step(&mut self) -> IterationOutcome {
        if self.stop.load(Ordering::Acquire) {
            return IterationOutcome::Stopped;
        }

        if !self.monitor.poll(&mut self.stub) {
            return IterationOutcome::Disconnected;
        }

        let approx_size = self.queue.size_approx();
        if approx_size == 0 {
            return IterationOutcome::Idle;
        }

        let mut events = VecDeque::with_capacity(approx_size);
        let actual_size = self.queue.try_dequeue_bulk(&mut events, approx_size);
        self.counters
            .dequeued
            .fetch_add(actual_size as u64, Ordering::Relaxed);
        debug!(count = actual_size, "Dequeued hook events");

        self.send_in_order(events)
    }

    fn send_in_order(&mut self, mut events: VecDeque<HookEvent>) -> IterationOutcome {
        let mut sent = 0;
        let mut rejected = 0;

        while let Some(event) = events.front() {
            let hook_type = event.hook_type();
            let mut context = CallContext::new(self.settings.rpc_timeout);

            match self
                .table
                .dispatch(&mut self.stub, &mut context, event.payload())
            {
                Ok(()) => {
                    trace!(
                        hook_type = %hook_type,
                        queued_ms = event.enqueued_at().elapsed().as_millis() as u64,
                        "Hook event sent"
                    );
                    sent += 1;
                    self.counters.sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(status) if is_transient(&status) => {
                    let requeued = self.queue.enqueue_bulk(events.drain(..));
                    self.counters
                        .requeued
                        .fetch_add(requeued as u64, Ordering::Relaxed);
                    warn!(
                        hook_type = %hook_type,
                        requeued,
                        "Plugin daemon unavailable: {}; {}; deferring remaining hook events",
                        context.debug_error_string(),
                        status.message()
                    );
                    return IterationOutcome::Deferred {
                        sent,
                        rejected,
                        requeued,
                    };
                }
                Err(status) => {
                    error!(
                        hook_type = %hook_type,
                        code = status.code() as i32,
                        "Failed to send hook event: {}; {} (code: {:?})",
                        context.debug_error_string(),
                        status.message(),
                        status.code()
                    );
                    rejected += 1;
                    self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                }
            }

            events.pop_front();
        }

        IterationOutcome::Drained { sent, rejected }
    }
}
