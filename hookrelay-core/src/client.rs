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

//! Client facade used by the scheduler to hand hook events to the plugin daemon.
//!
//! Every `*_hook_async` call builds the request, pushes it onto the event queue
//! and returns immediately. A single background worker owns the transport and
//! delivers events in the order it dequeues them.
//!
//! ```rust,ignore
//! use hookrelay_core::{PluginClient, PluginConfig};
//!
//! let client = PluginClient::connect(&PluginConfig::default())?;
//! client.start_hook_async(jobs);
//! client.job_monitor_hook_async(42, "/sys/fs/cgroup/crane/job_42");
//! client.shutdown();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use hookrelay_proto::{EndHookRequest, JobInfo, JobMonitorHookRequest, StartHookRequest};
use parking_lot::Mutex;
use tracing::{error, info, trace};

use crate::config::PluginConfig;
use crate::delivery::{DeliveryCounters, DeliveryLoop, DeliverySettings, DeliveryStats};
use crate::dispatch::PluginStub;
use crate::error::{HookRelayError, Result};
use crate::event::{HookEvent, HookPayload};
use crate::queue::EventQueue;
use crate::transport::GrpcTransport;

/// Source of "now" for elapsed-time computation.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in whole seconds since the Unix epoch.
    fn now_unix_seconds(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_seconds(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Handle producers use to enqueue hook events.
///
/// Share it across threads with `Arc`; all enqueue methods take `&self`.
/// Dropping the client stops and joins the delivery worker. Events still
/// queued at that point are discarded.
pub struct PluginClient {
    queue: EventQueue,
    stop: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<DeliveryCounters>,
    clock: Arc<dyn Clock>,
}

impl PluginClient {
    /// Build the Unix socket transport for `config.endpoint` and start delivering.
    pub fn connect(config: &PluginConfig) -> Result<Self> {
        let transport = GrpcTransport::new(config)?;
        info!(endpoint = %config.endpoint, "Initializing plugin client");
        Self::with_stub(transport, DeliverySettings::from(config))
    }

    /// Start delivering through an arbitrary stub.
    pub fn with_stub<S: PluginStub>(stub: S, settings: DeliverySettings) -> Result<Self> {
        Self::with_stub_and_clock(stub, settings, Arc::new(SystemClock))
    }

    pub fn with_stub_and_clock<S: PluginStub>(
        stub: S,
        settings: DeliverySettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let queue = EventQueue::new();
        let stop = Arc::new(AtomicBool::new(false));

        let delivery = DeliveryLoop::new(stub, queue.clone(), Arc::clone(&stop), settings);
        let counters = delivery.counters();

        let handle = thread::Builder::new()
            .name("hookrelay-delivery".to_string())
            .spawn(move || delivery.run())
            .map_err(HookRelayError::WorkerSpawn)?;

        Ok(Self {
            queue,
            stop,
            worker: Mutex::new(Some(handle)),
            counters,
            clock,
        })
    }

    /// Queue a start hook for a batch of jobs.
    pub fn start_hook_async(&self, jobs: Vec<JobInfo>) {
        let request = StartHookRequest {
            job_info_list: jobs,
        };
        self.enqueue(HookPayload::Start(request));
    }

    /// Queue an end hook, stamping each job's elapsed time as `now - start_time`.
    ///
    /// `now` is sampled once, so every job in the batch shares it.
    pub fn end_hook_async(&self, jobs: Vec<JobInfo>) {
        let now = self.clock.now_unix_seconds();
        let request = EndHookRequest {
            job_info_list: with_elapsed_time(jobs, now),
        };
        self.enqueue(HookPayload::End(request));
    }

    /// Queue a resource-monitor hook for one job's cgroup.
    pub fn job_monitor_hook_async(&self, job_id: u32, cgroup_path: impl Into<String>) {
        let request = JobMonitorHookRequest {
            job_id,
            cgroup: cgroup_path.into(),
        };
        self.enqueue(HookPayload::JobMonitor(request));
    }

    fn enqueue(&self, payload: HookPayload) {
        trace!(hook_type = %payload.hook_type(), "Enqueue hook event");
        self.queue.enqueue(HookEvent::new(payload));
    }

    /// Approximate number of events waiting for delivery.
    pub fn pending_events(&self) -> usize {
        self.queue.size_approx()
    }

    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }

    /// Whether the delivery worker has not been joined yet.
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Stop the worker and wait for it to exit. Safe to call more than once.
    ///
    /// The worker finishes the batch it is sending, so no RPC is issued after
    /// this returns.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            trace!("Plugin client is ending. Waiting for the delivery worker to finish.");
            if handle.join().is_err() {
                error!("Hook delivery worker panicked");
            }
        }
    }
}

impl Drop for PluginClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Copy `jobs`, setting `elapsed_time = now - start_time` (whole seconds).
///
/// A job without a start time counts from the epoch.
pub fn with_elapsed_time(mut jobs: Vec<JobInfo>, now: i64) -> Vec<JobInfo> {
    for job in &mut jobs {
        let started = job.start_time.as_ref().map_or(0, |t| t.seconds);
        job.elapsed_time = Some(prost_types::Duration {
            seconds: now - started,
            nanos: 0,
        });
    }
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn job_started_at(job_id: u32, seconds: i64) -> JobInfo {
        JobInfo {
            job_id,
            start_time: Some(prost_types::Timestamp { seconds, nanos: 0 }),
            ..Default::default()
        }
    }

    #[test]
    fn test_elapsed_time_uses_shared_now() {
        let jobs = vec![job_started_at(1, 1_000), job_started_at(2, 1_500)];
        let jobs = with_elapsed_time(jobs, 2_000);

        let elapsed: Vec<_> = jobs
            .iter()
            .map(|job| job.elapsed_time.as_ref().unwrap().seconds)
            .collect();
        assert_eq!(elapsed, vec![1_000, 500]);
    }

    #[test]
    fn test_missing_start_time_counts_from_epoch() {
        let jobs = with_elapsed_time(vec![JobInfo::default()], 1_700_000_000);
        assert_eq!(jobs[0].elapsed_time.as_ref().unwrap().seconds, 1_700_000_000);
    }

    #[test]
    fn test_system_clock_is_unix_seconds() {
        let now = SystemClock.now_unix_seconds();
        // 2020-01-01T00:00:00Z
        assert!(now > 1_577_836_800);
    }

    proptest! {
        #[test]
        fn prop_elapsed_is_exact_difference(
            starts in prop::collection::vec(0i64..4_000_000_000, 1..16),
            now in 0i64..4_000_000_000,
        ) {
            let jobs = starts
                .iter()
                .enumerate()
                .map(|(i, s)| job_started_at(i as u32, *s))
                .collect();
            let jobs = with_elapsed_time(jobs, now);

            for (job, start) in jobs.iter().zip(&starts) {
                prop_assert_eq!(job.elapsed_time.as_ref().unwrap().seconds, now - start);
                prop_assert_eq!(job.start_time.as_ref().unwrap().seconds, *start);
            }
        }
    }
}
