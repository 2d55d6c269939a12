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

//! Unbounded multi-producer event queue between producers and the delivery loop.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::event::HookEvent;

/// Lock-free, unbounded queue of pending hook events.
///
/// Any number of producers may [`enqueue`](Self::enqueue) concurrently; only
/// the delivery loop dequeues. Cloning yields another handle to the same queue.
#[derive(Debug, Clone)]
pub struct EventQueue {
    sender: Sender<HookEvent>,
    receiver: Receiver<HookEvent>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Push one event. Never blocks.
    pub fn enqueue(&self, event: HookEvent) {
        // The queue owns both ends, so the channel cannot be disconnected
        // while `self` is alive.
        let _ = self.sender.send(event);
    }

    /// Push a run of events back in their current relative order.
    ///
    /// Events from concurrent producers may land between members of the run.
    pub fn enqueue_bulk<I>(&self, events: I) -> usize
    where
        I: IntoIterator<Item = HookEvent>,
    {
        let mut count = 0;
        for event in events {
            let _ = self.sender.send(event);
            count += 1;
        }
        count
    }

    /// Approximate number of queued events; may be stale by the time it is read.
    pub fn size_approx(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Move up to `max` events into `out`, returning how many were moved.
    pub fn try_dequeue_bulk<E>(&self, out: &mut E, max: usize) -> usize
    where
        E: Extend<HookEvent>,
    {
        let mut taken = 0;
        while taken < max {
            match self.receiver.try_recv() {
                Ok(event) => {
                    out.extend(std::iter::once(event));
                    taken += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::HookPayload;
    use hookrelay_proto::JobMonitorHookRequest;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::thread;

    fn monitor_event(job_id: u32) -> HookEvent {
        HookEvent::new(HookPayload::JobMonitor(JobMonitorHookRequest {
            job_id,
            cgroup: format!("/crane/job_{}", job_id),
        }))
    }

    fn job_id(event: &HookEvent) -> u32 {
        match event.payload() {
            HookPayload::JobMonitor(req) => req.job_id,
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_dequeue_bulk_respects_limit() {
        let queue = EventQueue::new();
        for id in 0..5 {
            queue.enqueue(monitor_event(id));
        }
        assert_eq!(queue.size_approx(), 5);

        let mut out = VecDeque::new();
        assert_eq!(queue.try_dequeue_bulk(&mut out, 3), 3);
        assert_eq!(out.iter().map(job_id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(queue.size_approx(), 2);
    }

    #[test]
    fn test_dequeue_bulk_returns_fewer_when_short() {
        let queue = EventQueue::new();
        queue.enqueue(monitor_event(1));

        let mut out = Vec::new();
        assert_eq!(queue.try_dequeue_bulk(&mut out, 10), 1);
        assert!(queue.is_empty());
        assert_eq!(queue.try_dequeue_bulk(&mut out, 10), 0);
    }

    #[test]
    fn test_enqueue_bulk_keeps_relative_order() {
        let queue = EventQueue::new();
        queue.enqueue(monitor_event(10));
        let requeued = queue.enqueue_bulk(vec![monitor_event(2), monitor_event(3)]);
        assert_eq!(requeued, 2);

        let mut out = Vec::new();
        queue.try_dequeue_bulk(&mut out, 3);
        assert_eq!(out.iter().map(job_id).collect::<Vec<_>>(), vec![10, 2, 3]);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let queue = Arc::new(EventQueue::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.enqueue(monitor_event(t * 1000 + i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut out = Vec::new();
        assert_eq!(queue.try_dequeue_bulk(&mut out, usize::MAX), 2000);

        let mut ids: Vec<_> = out.iter().map(job_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 2000);
    }
}
