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

//! Hook events queued for delivery to the plugin daemon.

use std::fmt;
use std::time::Instant;

use hookrelay_proto::{EndHookRequest, JobMonitorHookRequest, StartHookRequest};

/// Kind of lifecycle occurrence carried by a [`HookEvent`].
///
/// The discriminant doubles as the index into the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HookType {
    Start = 0,
    End = 1,
    JobMonitor = 2,
}

impl HookType {
    /// Number of hook types; the dispatch table has exactly this many entries.
    pub const COUNT: usize = 3;

    pub const ALL: [HookType; Self::COUNT] = [HookType::Start, HookType::End, HookType::JobMonitor];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HookType::Start => "start",
            HookType::End => "end",
            HookType::JobMonitor => "job_monitor",
        }
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request message for one hook, tagged by its hook type.
#[derive(Debug, Clone, PartialEq)]
pub enum HookPayload {
    Start(StartHookRequest),
    End(EndHookRequest),
    JobMonitor(JobMonitorHookRequest),
}

impl HookPayload {
    pub fn hook_type(&self) -> HookType {
        match self {
            HookPayload::Start(_) => HookType::Start,
            HookPayload::End(_) => HookType::End,
            HookPayload::JobMonitor(_) => HookType::JobMonitor,
        }
    }
}

/// One lifecycle occurrence on its way to the plugin daemon.
///
/// The hook type is derived from the payload variant, so the two cannot
/// disagree. Events are moved (never cloned) between producer, queue and
/// delivery loop.
#[derive(Debug)]
pub struct HookEvent {
    payload: HookPayload,
    enqueued_at: Instant,
}

impl HookEvent {
    pub fn new(payload: HookPayload) -> Self {
        Self {
            payload,
            enqueued_at: Instant::now(),
        }
    }

    pub fn hook_type(&self) -> HookType {
        self.payload.hook_type()
    }

    pub fn payload(&self) -> &HookPayload {
        &self.payload
    }

    pub fn into_payload(self) -> HookPayload {
        self.payload
    }

    /// When the producer handed this event over.
    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }
}

impl From<HookPayload> for HookEvent {
    fn from(payload: HookPayload) -> Self {
        Self::new(payload)
    }
}
