//! # Event Adapter
//!
//! Translates host-runtime notifications into the six primitive stack
//! operations and dispatches them to the session. Owns nothing beyond the
//! task-identity registry: task-create notifications associate a host task
//! identity with its originating location, and task-switch notifications
//! look the next identity back up. Unrecognized identities close the prior
//! task without opening a new one.

use crate::domain::{Location, TaskId, ThreadOrdinal};
use crate::session::TraceSession;
use burstscope_common::HostNotification;
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Thin mapping from notification shapes to stack operations.
pub struct EventAdapter<'a> {
    session: &'a TraceSession,
    tasks: Mutex<HashMap<TaskId, Location>>,
}

impl<'a> EventAdapter<'a> {
    #[must_use]
    pub fn new(session: &'a TraceSession) -> Self {
        Self { session, tasks: Mutex::new(HashMap::new()) }
    }

    /// Dispatch one notification. Exhaustive over the vocabulary; never
    /// fails the caller.
    pub fn handle(&self, notification: HostNotification) {
        match notification {
            HostNotification::RegionBegin { thread, construct, location } => {
                self.session.region_begin(
                    ThreadOrdinal(thread),
                    construct,
                    Location(location),
                );
            }
            HostNotification::RegionEnd { thread, construct: _, location: _ } => {
                self.session.region_end(ThreadOrdinal(thread));
            }
            HostNotification::TaskCreate { task, location } => {
                self.tasks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(TaskId(task), Location(location));
            }
            HostNotification::TaskSwitch { thread, prior, next } => {
                let next_location = next.and_then(|task| self.lookup(TaskId(task)));
                if next.is_some() && next_location.is_none() {
                    debug!("thread {thread}: switch to unregistered task, closing only");
                }
                if let Some(task) = prior {
                    debug!("thread {thread}: leaving {}", TaskId(task));
                }
                self.session.task_switch(ThreadOrdinal(thread), next_location);
            }
            HostNotification::LockWaitBegin { thread, location } => {
                self.session.wait_begin(ThreadOrdinal(thread), Location(location));
            }
            HostNotification::LockAcquired { thread, location } => {
                self.session.lock_acquired(ThreadOrdinal(thread), Location(location));
            }
            HostNotification::LockReleased { thread, location: _ } => {
                self.session.lock_released(ThreadOrdinal(thread));
            }
        }
    }

    fn lookup(&self, task: TaskId) -> Option<Location> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).get(&task).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use crate::sink::BurstSink;
    use burstscope_common::WorkConstruct;

    fn session() -> TraceSession {
        TraceSession::with_sink(&SessionConfig::default(), BurstSink::disabled())
    }

    #[test]
    fn region_pair_emits_one_burst() {
        let session = session();
        let adapter = EventAdapter::new(&session);
        adapter.handle(HostNotification::RegionBegin {
            thread: 0,
            construct: WorkConstruct::Loop,
            location: 0x10,
        });
        adapter.handle(HostNotification::RegionEnd {
            thread: 0,
            construct: WorkConstruct::Loop,
            location: 0x10,
        });
        assert_eq!(session.stats().bursts_emitted, 1);
    }

    #[test]
    fn task_switch_resolves_locations_through_the_registry() {
        let session = session();
        let adapter = EventAdapter::new(&session);
        adapter.handle(HostNotification::TaskCreate { task: 1, location: 0xa });
        adapter.handle(HostNotification::TaskCreate { task: 2, location: 0xb });
        adapter.handle(HostNotification::TaskSwitch { thread: 0, prior: None, next: Some(1) });
        // Switching tasks closes the first task burst.
        adapter.handle(HostNotification::TaskSwitch { thread: 0, prior: Some(1), next: Some(2) });
        assert_eq!(session.stats().bursts_emitted, 1);
    }

    #[test]
    fn switch_to_unregistered_task_closes_only() {
        let session = session();
        let adapter = EventAdapter::new(&session);
        adapter.handle(HostNotification::TaskCreate { task: 1, location: 0xa });
        adapter.handle(HostNotification::TaskSwitch { thread: 0, prior: None, next: Some(1) });
        adapter.handle(HostNotification::TaskSwitch { thread: 0, prior: Some(1), next: Some(99) });
        // The prior task closed; nothing new opened for the unknown identity.
        assert_eq!(session.stats().bursts_emitted, 1);
        adapter.handle(HostNotification::TaskSwitch { thread: 0, prior: None, next: None });
        assert_eq!(session.stats().bursts_emitted, 1);
    }

    #[test]
    fn lock_protocol_round_trip() {
        let session = session();
        let adapter = EventAdapter::new(&session);
        adapter.handle(HostNotification::RegionBegin {
            thread: 2,
            construct: WorkConstruct::SingleExecutor,
            location: 0x10,
        });
        adapter.handle(HostNotification::LockWaitBegin { thread: 2, location: 0x20 });
        adapter.handle(HostNotification::LockAcquired { thread: 2, location: 0x20 });
        adapter.handle(HostNotification::LockReleased { thread: 2, location: 0x20 });
        adapter.handle(HostNotification::RegionEnd {
            thread: 2,
            construct: WorkConstruct::SingleExecutor,
            location: 0x10,
        });
        // Split Single + Wait + Critical + resumed Single.
        let stats = session.stats();
        assert_eq!(stats.bursts_emitted, 4);
        assert_eq!(stats.protocol_violations, 0);
    }
}
