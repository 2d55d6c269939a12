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

//! Hook type → RPC dispatch.
//!
//! Each hook type owns one entry in a fixed table. Adding a hook type means
//! adding a payload variant, a stub method and a table entry; the delivery
//! loop does not change.

use std::time::Duration;

use hookrelay_proto::{
    EndHookReply, EndHookRequest, JobMonitorHookReply, JobMonitorHookRequest, StartHookReply,
    StartHookRequest,
};
use tonic::Status;
use tracing::trace;

use crate::event::{HookPayload, HookType};

/// Synchronous view of the plugin daemon used by the delivery loop.
///
/// Implementations block the calling thread for the duration of each call.
pub trait PluginStub: Send + 'static {
    /// Wait up to `timeout` for the transport to become usable.
    fn wait_for_connected(&mut self, timeout: Duration) -> bool;

    fn start_hook(
        &mut self,
        context: &mut CallContext,
        request: &StartHookRequest,
        reply: &mut StartHookReply,
    ) -> Result<(), Status>;

    fn end_hook(
        &mut self,
        context: &mut CallContext,
        request: &EndHookRequest,
        reply: &mut EndHookReply,
    ) -> Result<(), Status>;

    fn job_monitor_hook(
        &mut self,
        context: &mut CallContext,
        request: &JobMonitorHookRequest,
        reply: &mut JobMonitorHookReply,
    ) -> Result<(), Status>;
}

/// Per-call state. A fresh context is built for every RPC.
#[derive(Debug, Default, Clone)]
pub struct CallContext {
    timeout: Option<Duration>,
    debug_error: Option<String>,
}

impl CallContext {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            debug_error: None,
        }
    }

    /// Deadline to apply to the RPC, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Transport-level detail recorded by the stub when a call fails.
    pub fn set_debug_error(&mut self, detail: impl Into<String>) {
        self.debug_error = Some(detail.into());
    }

    pub fn debug_error_string(&self) -> &str {
        self.debug_error.as_deref().unwrap_or("")
    }
}

/// Send function stored in the dispatch table.
pub type HookDispatchFn<S> = fn(&mut S, &mut CallContext, &HookPayload) -> Result<(), Status>;

/// Fixed mapping from [`HookType`] to the stub call that transmits it.
pub struct DispatchTable<S: PluginStub> {
    entries: [HookDispatchFn<S>; HookType::COUNT],
}

impl<S: PluginStub> Default for DispatchTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: PluginStub> DispatchTable<S> {
    /// Entries are indexed by `HookType as usize`.
    pub fn new() -> Self {
        Self {
            entries: [
                send_start_hook::<S>,
                send_end_hook::<S>,
                send_job_monitor_hook::<S>,
            ],
        }
    }

    pub fn entry(&self, hook_type: HookType) -> HookDispatchFn<S> {
        self.entries[hook_type.index()]
    }

    /// Invoke the entry registered for the payload's hook type.
    pub fn dispatch(
        &self,
        stub: &mut S,
        context: &mut CallContext,
        payload: &HookPayload,
    ) -> Result<(), Status> {
        (self.entry(payload.hook_type()))(stub, context, payload)
    }
}

fn send_start_hook<S: PluginStub>(
    stub: &mut S,
    context: &mut CallContext,
    payload: &HookPayload,
) -> Result<(), Status> {
    let HookPayload::Start(request) = payload else {
        unreachable!("start hook entry invoked with {} payload", payload.hook_type());
    };
    let mut reply = StartHookReply::default();

    trace!("Sending StartHook");
    stub.start_hook(context, request, &mut reply)
}

fn send_end_hook<S: PluginStub>(
    stub: &mut S,
    context: &mut CallContext,
    payload: &HookPayload,
) -> Result<(), Status> {
    let HookPayload::End(request) = payload else {
        unreachable!("end hook entry invoked with {} payload", payload.hook_type());
    };
    let mut reply = EndHookReply::default();

    trace!("Sending EndHook");
    stub.end_hook(context, request, &mut reply)
}

fn send_job_monitor_hook<S: PluginStub>(
    stub: &mut S,
    context: &mut CallContext,
    payload: &HookPayload,
) -> Result<(), Status> {
    let HookPayload::JobMonitor(request) = payload else {
        unreachable!("job monitor hook entry invoked with {} payload", payload.hook_type());
    };
    let mut reply = JobMonitorHookReply::default();

    trace!("Sending JobMonitorHook");
    stub.job_monitor_hook(context, request, &mut reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookrelay_proto::JobInfo;

    #[derive(Default)]
    struct RecordingStub {
        calls: Vec<&'static str>,
    }

    impl PluginStub for RecordingStub {
        fn wait_for_connected(&mut self, _timeout: Duration) -> bool {
            true
        }

        fn start_hook(
            &mut self,
            _context: &mut CallContext,
            _request: &StartHookRequest,
            _reply: &mut StartHookReply,
        ) -> Result<(), Status> {
            self.calls.push("start");
            Ok(())
        }

        fn end_hook(
            &mut self,
            _context: &mut CallContext,
            _request: &EndHookRequest,
            _reply: &mut EndHookReply,
        ) -> Result<(), Status> {
            self.calls.push("end");
            Ok(())
        }

        fn job_monitor_hook(
            &mut self,
            context: &mut CallContext,
            request: &JobMonitorHookRequest,
            _reply: &mut JobMonitorHookReply,
        ) -> Result<(), Status> {
            self.calls.push("job_monitor");
            context.set_debug_error("permission check failed");
            Err(Status::permission_denied(format!("job {}", request.job_id)))
        }
    }

    fn payload_for(hook_type: HookType) -> HookPayload {
        let jobs = vec![JobInfo {
            job_id: 1,
            ..Default::default()
        }];
        match hook_type {
            HookType::Start => HookPayload::Start(StartHookRequest {
                job_info_list: jobs,
            }),
            HookType::End => HookPayload::End(EndHookRequest {
                job_info_list: jobs,
            }),
            HookType::JobMonitor => HookPayload::JobMonitor(JobMonitorHookRequest {
                job_id: 1,
                cgroup: "/crane/job_1".to_string(),
            }),
        }
    }

    #[test]
    fn test_each_type_reaches_only_its_own_rpc() {
        let table = DispatchTable::<RecordingStub>::new();

        for hook_type in HookType::ALL {
            let mut stub = RecordingStub::default();
            let mut context = CallContext::default();
            let _ = table.dispatch(&mut stub, &mut context, &payload_for(hook_type));
            assert_eq!(stub.calls, vec![hook_type.as_str()]);
        }
    }

    #[test]
    fn test_dispatch_returns_rpc_status() {
        let table = DispatchTable::<RecordingStub>::new();
        let mut stub = RecordingStub::default();
        let mut context = CallContext::new(Some(Duration::from_secs(1)));

        let status = table
            .dispatch(&mut stub, &mut context, &payload_for(HookType::JobMonitor))
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);
        assert_eq!(status.message(), "job 1");
        assert_eq!(context.debug_error_string(), "permission check failed");
        assert_eq!(context.timeout(), Some(Duration::from_secs(1)));
    }

    #[test]
    #[should_panic(expected = "start hook entry invoked with end payload")]
    fn test_mismatched_entry_is_a_defect() {
        let table = DispatchTable::<RecordingStub>::new();
        let mut stub = RecordingStub::default();
        let mut context = CallContext::default();
        let entry = table.entry(HookType::Start);
        let _ = entry(&mut stub, &mut context, &payload_for(HookType::End));
    }
}
