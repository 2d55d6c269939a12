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

//! Scripted in-process plugin daemon for delivery tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hookrelay_core::proto::{
    EndHookReply, EndHookRequest, JobInfo, JobMonitorHookReply, JobMonitorHookRequest,
    StartHookReply, StartHookRequest,
};
use hookrelay_core::{CallContext, Clock, DeliverySettings, HookType, PluginStub};
use parking_lot::Mutex;
use tonic::{Code, Status};

/// One RPC the daemon accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Start(StartHookRequest),
    End(EndHookRequest),
    JobMonitor(JobMonitorHookRequest),
}

impl Received {
    pub fn hook_type(&self) -> HookType {
        match self {
            Received::Start(_) => HookType::Start,
            Received::End(_) => HookType::End,
            Received::JobMonitor(_) => HookType::JobMonitor,
        }
    }
}

#[derive(Default)]
struct DaemonState {
    up: AtomicBool,
    polls: AtomicUsize,
    attempts: AtomicUsize,
    /// Sends that fail with UNAVAILABLE even though the poll succeeded.
    drop_next_sends: AtomicUsize,
    reject: Mutex<Option<(HookType, Code)>>,
    received: Mutex<Vec<Received>>,
}

/// Shared handle to the fake daemon; the stub half moves into the worker.
#[derive(Clone, Default)]
pub struct FakeDaemon {
    state: Arc<DaemonState>,
}

impl FakeDaemon {
    pub fn new(up: bool) -> Self {
        let daemon = Self::default();
        daemon.set_up(up);
        daemon
    }

    pub fn stub(&self) -> FakeStub {
        FakeStub {
            state: Arc::clone(&self.state),
        }
    }

    pub fn set_up(&self, up: bool) {
        self.state.up.store(up, Ordering::SeqCst);
    }

    pub fn drop_next_sends(&self, count: usize) {
        self.state.drop_next_sends.store(count, Ordering::SeqCst);
    }

    pub fn reject(&self, hook_type: HookType, code: Code) {
        *self.state.reject.lock() = Some((hook_type, code));
    }

    pub fn polls(&self) -> usize {
        self.state.polls.load(Ordering::SeqCst)
    }

    /// RPCs issued, accepted or not.
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Received> {
        self.state.received.lock().clone()
    }

    pub fn received_count(&self) -> usize {
        self.state.received.lock().len()
    }
}

pub struct FakeStub {
    state: Arc<DaemonState>,
}

impl FakeStub {
    fn handle(&self, hook_type: HookType, request: Received) -> Result<(), Status> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);

        if !self.state.up.load(Ordering::SeqCst) {
            return Err(Status::unavailable("connection refused"));
        }
        let dropped = self
            .state
            .drop_next_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if dropped.is_ok() {
            return Err(Status::unavailable("connection reset"));
        }
        if let Some((rejected, code)) = *self.state.reject.lock() {
            if rejected == hook_type {
                return Err(Status::new(code, "rejected by plugin"));
            }
        }

        self.state.received.lock().push(request);
        Ok(())
    }
}

impl PluginStub for FakeStub {
    fn wait_for_connected(&mut self, timeout: Duration) -> bool {
        self.state.polls.fetch_add(1, Ordering::SeqCst);
        if self.state.up.load(Ordering::SeqCst) {
            true
        } else {
            thread::sleep(timeout);
            false
        }
    }

    fn start_hook(
        &mut self,
        _context: &mut CallContext,
        request: &StartHookRequest,
        _reply: &mut StartHookReply,
    ) -> Result<(), Status> {
        self.handle(HookType::Start, Received::Start(request.clone()))
    }

    fn end_hook(
        &mut self,
        _context: &mut CallContext,
        request: &EndHookRequest,
        _reply: &mut EndHookReply,
    ) -> Result<(), Status> {
        self.handle(HookType::End, Received::End(request.clone()))
    }

    fn job_monitor_hook(
        &mut self,
        _context: &mut CallContext,
        request: &JobMonitorHookRequest,
        _reply: &mut JobMonitorHookReply,
    ) -> Result<(), Status> {
        self.handle(HookType::JobMonitor, Received::JobMonitor(request.clone()))
    }
}

/// Clock pinned to a fixed instant.
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix_seconds(&self) -> i64 {
        self.0
    }
}

/// Short intervals so tests finish quickly.
pub fn fast_settings() -> DeliverySettings {
    DeliverySettings {
        connect_timeout: Duration::from_millis(10),
        reconnect_backoff: Duration::from_millis(20),
        idle_interval: Duration::from_millis(10),
        rpc_timeout: None,
    }
}

pub fn job(job_id: u32) -> JobInfo {
    JobInfo {
        job_id,
        name: format!("job-{}", job_id),
        partition: "CPU".to_string(),
        ..Default::default()
    }
}

/// Poll `condition` until it holds or `timeout` expires.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
