//! # Correlation Side-Channel (provider side)
//!
//! Workload code holds a [`BurstIds`] handle from `burstscope-common` and
//! calls `set_id`/`get_id` from whatever thread it happens to run on. The
//! session backs those calls by resolving the calling OS thread to the host
//! ordinal it last carried: the adapter records the association on every
//! notification, since host callbacks run synchronously on the worker thread
//! they describe.
//!
//! Calls from threads the adapter has never seen are counted no-ops; the
//! side channel is advisory instrumentation, never control flow.

use crate::domain::ThreadOrdinal;
use crate::session::TraceSession;
use burstscope_common::{BurstIds, CorrelationProvider};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::thread::{self, ThreadId};

/// Maps OS thread identities to the host ordinal they last reported.
///
/// Read-mostly: written only when a thread first appears or the host
/// re-numbers it.
pub(crate) struct ThreadRegistry {
    map: RwLock<HashMap<ThreadId, ThreadOrdinal>>,
}

impl ThreadRegistry {
    pub(crate) fn new() -> Self {
        Self { map: RwLock::new(HashMap::new()) }
    }

    /// Record that the calling OS thread is host thread `ordinal`.
    pub(crate) fn record_current(&self, ordinal: ThreadOrdinal) {
        let id = thread::current().id();
        let known = self.read().get(&id).copied();
        if known != Some(ordinal) {
            self.write().insert(id, ordinal);
        }
    }

    /// Ordinal last recorded for the calling OS thread.
    pub(crate) fn current(&self) -> Option<ThreadOrdinal> {
        self.read().get(&thread::current().id()).copied()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ThreadId, ThreadOrdinal>> {
        self.map.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<ThreadId, ThreadOrdinal>> {
        self.map.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CorrelationProvider for TraceSession {
    fn set_id(&self, tag: i64, level: i64) {
        self.set_correlation(tag, level);
    }

    fn get_id(&self) -> (i64, i64) {
        self.correlation()
    }
}

/// Side-channel handle backed by `session`, for handing to workload code.
#[must_use]
pub fn burst_ids(session: &Arc<TraceSession>) -> BurstIds {
    BurstIds::connected(Arc::clone(session) as Arc<dyn CorrelationProvider>)
}
