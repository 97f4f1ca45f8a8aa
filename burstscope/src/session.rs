//! # Trace Session
//!
//! Process-wide owner of the per-thread timelines, the sink, and the
//! reference clock. Created at tool-initialize, torn down once at
//! tool-finalize; all output happens between the two.
//!
//! The session exposes the six semantic operations the adapter dispatches
//! to, plus the correlation entry points. Every operation resolves the
//! thread's timeline slot, applies the stack mutation, and forwards any
//! completed burst to the sink. Contract breaches from the host are
//! reported and absorbed; the tracer must never be the reason the workload
//! fails.

use crate::clock::ReferenceClock;
use crate::correlation::ThreadRegistry;
use crate::domain::{BurstKind, Location, ProtocolViolation, ThreadOrdinal, TracerError};
use crate::sink::{BurstSink, SinkFormat};
use crate::timeline::{Burst, ThreadTimeline};
use burstscope_common::{WorkConstruct, CORRELATION_UNSET};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Upper bound on worker threads tracked by default.
pub const MAX_THREADS: usize = 128;

/// Configuration surface, read once at session start.
///
/// Loading these values from the environment (or anywhere else) is the
/// host's job; the engine consumes the resolved struct.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Output format selector; two recognized values, log is the default.
    pub format: SinkFormat,
    /// Output destination; `None` derives a path from the format.
    pub output: Option<PathBuf>,
    /// Fixed upper bound on thread ordinals; events beyond it are dropped
    /// with a reported error.
    pub max_threads: usize,
    /// Close and sink every still-open burst at finalize, stamped with the
    /// finalize timestamp. On by default; turn off to drop unfinished
    /// intervals instead.
    pub flush_open_on_finalize: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            format: SinkFormat::default(),
            output: None,
            max_threads: MAX_THREADS,
            flush_open_on_finalize: true,
        }
    }
}

/// Diagnostics counters, summarized once at finalize.
#[derive(Default)]
struct SessionStats {
    bursts_emitted: AtomicU64,
    protocol_violations: AtomicU64,
    events_dropped: AtomicU64,
    annotations_ignored: AtomicU64,
}

impl SessionStats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bursts_emitted: self.bursts_emitted.load(Ordering::Relaxed),
            protocol_violations: self.protocol_violations.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            annotations_ignored: self.annotations_ignored.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub bursts_emitted: u64,
    pub protocol_violations: u64,
    pub events_dropped: u64,
    pub annotations_ignored: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bursts={} violations={} dropped={} annotations_ignored={}",
            self.bursts_emitted,
            self.protocol_violations,
            self.events_dropped,
            self.annotations_ignored
        )
    }
}

/// Single process-wide tracing session.
pub struct TraceSession {
    clock: ReferenceClock,
    sink: BurstSink,
    timelines: Vec<Mutex<ThreadTimeline>>,
    threads: ThreadRegistry,
    stats: SessionStats,
    flush_open_on_finalize: bool,
    finalized: AtomicBool,
    over_limit_reported: Mutex<HashSet<u32>>,
}

impl TraceSession {
    /// Open the session: capture the epoch and open the sink.
    ///
    /// An unavailable output destination degrades the sink (one diagnostic)
    /// rather than failing initialization.
    #[must_use]
    pub fn initialize(config: SessionConfig) -> Self {
        let path = config.output.clone().unwrap_or_else(|| config.format.default_path());
        let sink = BurstSink::create(config.format, &path);
        Self::with_sink(&config, sink)
    }

    /// Open the session over an explicit sink (writer injection for tests).
    #[must_use]
    pub fn with_sink(config: &SessionConfig, sink: BurstSink) -> Self {
        let timelines = (0..config.max_threads)
            .map(|i| {
                let ordinal = ThreadOrdinal(u32::try_from(i).unwrap_or(u32::MAX));
                Mutex::new(ThreadTimeline::new(ordinal))
            })
            .collect();
        Self {
            clock: ReferenceClock::start(),
            sink,
            timelines,
            threads: ThreadRegistry::new(),
            stats: SessionStats::default(),
            flush_open_on_finalize: config.flush_open_on_finalize,
            finalized: AtomicBool::new(false),
            over_limit_reported: Mutex::new(HashSet::new()),
        }
    }

    // ── The six semantic operations ─────────────────────────────────────

    /// A worksharing region began on `thread`.
    pub fn region_begin(
        &self,
        thread: ThreadOrdinal,
        construct: WorkConstruct,
        location: Location,
    ) {
        let Some(slot) = self.slot(thread) else { return };
        let now = self.clock.now();
        self.lock(slot).open(BurstKind::from(construct), location, now);
    }

    /// The matching region end: close and sink the top burst.
    pub fn region_end(&self, thread: ThreadOrdinal) {
        let Some(slot) = self.slot(thread) else { return };
        let now = self.clock.now();
        let closed = self.lock(slot).close(now);
        match closed {
            Ok(burst) => self.emit(&burst),
            Err(violation) => self.report(thread, violation),
        }
    }

    /// `thread` yielded its task; close the active task burst and open the
    /// next one, if any.
    pub fn task_switch(&self, thread: ThreadOrdinal, next: Option<Location>) {
        let Some(slot) = self.slot(thread) else { return };
        let now = self.clock.now();
        let closed = self.lock(slot).switch_task(next, now);
        if let Some(burst) = closed {
            self.emit(&burst);
        }
    }

    /// `thread` started waiting on a lock: split the enclosing burst.
    pub fn wait_begin(&self, thread: ThreadOrdinal, location: Location) {
        let Some(slot) = self.slot(thread) else { return };
        let now = self.clock.now();
        let split = self.lock(slot).begin_wait(location, now);
        if let Some(burst) = split {
            self.emit(&burst);
        }
    }

    /// `thread` acquired the lock: sink the wait, open the critical burst.
    pub fn lock_acquired(&self, thread: ThreadOrdinal, location: Location) {
        let Some(slot) = self.slot(thread) else { return };
        let now = self.clock.now();
        let waited = self.lock(slot).acquired(location, now);
        match waited {
            Ok(burst) => self.emit(&burst),
            Err(violation) => self.report(thread, violation),
        }
    }

    /// `thread` released the lock: sink the critical burst, resume the
    /// suspended interval beneath it.
    pub fn lock_released(&self, thread: ThreadOrdinal) {
        let Some(slot) = self.slot(thread) else { return };
        let now = self.clock.now();
        let released = self.lock(slot).release(now);
        match released {
            Ok(burst) => self.emit(&burst),
            Err(violation) => self.report(thread, violation),
        }
    }

    // ── Correlation side-channel ────────────────────────────────────────

    /// Attach `(tag, level)` to the calling thread's open burst, if any.
    ///
    /// Best-effort by contract: unknown callers and empty stacks are
    /// counted no-ops, never errors.
    pub fn set_correlation(&self, tag: i64, level: i64) {
        let applied = self
            .threads
            .current()
            .and_then(|thread| self.timelines.get(thread.as_index()))
            .is_some_and(|slot| self.lock(slot).annotate(tag, level));
        if !applied {
            self.stats.annotations_ignored.fetch_add(1, Ordering::Relaxed);
            debug!("correlation tag ignored: no open burst on the calling thread");
        }
    }

    /// Read the calling thread's `(tag, level)` pair; the sentinel when the
    /// thread is unknown, nothing is open, or nothing was set.
    #[must_use]
    pub fn correlation(&self) -> (i64, i64) {
        self.threads
            .current()
            .and_then(|thread| self.timelines.get(thread.as_index()))
            .map_or((CORRELATION_UNSET, CORRELATION_UNSET), |slot| self.lock(slot).correlation())
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Tear the session down: optionally flush still-open bursts, close the
    /// sink, and log a summary. Idempotent; later calls (and later events)
    /// are no-ops.
    pub fn finalize(&self) -> StatsSnapshot {
        if !self.finalized.swap(true, Ordering::AcqRel) {
            if self.flush_open_on_finalize {
                let now = self.clock.now();
                for slot in &self.timelines {
                    let drained = self.lock(slot).drain(now);
                    for burst in &drained {
                        self.emit(burst);
                    }
                }
            }
            self.sink.close();
            info!("trace session finalized: {}", self.stats.snapshot());
        }
        self.stats.snapshot()
    }

    /// Current counter values.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether the sink is still writing records.
    #[must_use]
    pub fn sink_active(&self) -> bool {
        self.sink.is_active()
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Resolve the timeline slot for `thread`, recording the calling OS
    /// thread for the correlation side-channel. `None` drops the event:
    /// either the session is finalized or the ordinal is over the bound.
    fn slot(&self, thread: ThreadOrdinal) -> Option<&Mutex<ThreadTimeline>> {
        if self.finalized.load(Ordering::Acquire) {
            self.stats.events_dropped.fetch_add(1, Ordering::Relaxed);
            debug!("event for thread {thread} dropped after finalize");
            return None;
        }
        match self.timelines.get(thread.as_index()) {
            Some(slot) => {
                self.threads.record_current(thread);
                Some(slot)
            }
            None => {
                self.stats.events_dropped.fetch_add(1, Ordering::Relaxed);
                let first = self
                    .over_limit_reported
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(thread.0);
                if first {
                    let err = TracerError::ThreadLimitExceeded {
                        thread: thread.0,
                        max: self.timelines.len(),
                    };
                    warn!("{err}");
                }
                None
            }
        }
    }

    fn lock<'a>(&self, slot: &'a Mutex<ThreadTimeline>) -> MutexGuard<'a, ThreadTimeline> {
        // Each slot is touched only by its owning thread, and by the
        // finalizer after workers quiesce.
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, burst: &Burst) {
        self.sink.emit(burst);
        self.stats.bursts_emitted.fetch_add(1, Ordering::Relaxed);
    }

    fn report(&self, thread: ThreadOrdinal, violation: ProtocolViolation) {
        self.stats.protocol_violations.fetch_add(1, Ordering::Relaxed);
        warn!("thread {thread}: {violation}");
    }
}

impl Drop for TraceSession {
    fn drop(&mut self) {
        // Sessions abandoned without finalize still get a well-formed
        // document; close() is idempotent.
        self.sink.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_limit_ordinal_is_dropped_and_counted() {
        let config = SessionConfig { max_threads: 2, ..SessionConfig::default() };
        let session = TraceSession::with_sink(&config, BurstSink::disabled());
        session.region_begin(ThreadOrdinal(5), WorkConstruct::Loop, Location(0x1));
        session.region_end(ThreadOrdinal(5));
        let stats = session.finalize();
        assert_eq!(stats.events_dropped, 2);
        assert_eq!(stats.bursts_emitted, 0);
    }

    #[test]
    fn events_after_finalize_are_dropped() {
        let session = TraceSession::with_sink(&SessionConfig::default(), BurstSink::disabled());
        session.finalize();
        session.region_begin(ThreadOrdinal(0), WorkConstruct::Loop, Location(0x1));
        assert_eq!(session.stats().events_dropped, 1);
    }

    #[test]
    fn finalize_is_idempotent() {
        let session = TraceSession::with_sink(&SessionConfig::default(), BurstSink::disabled());
        session.region_begin(ThreadOrdinal(0), WorkConstruct::Loop, Location(0x1));
        let first = session.finalize();
        let second = session.finalize();
        // The open Loop was flushed exactly once.
        assert_eq!(first.bursts_emitted, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn finalize_flush_can_be_disabled() {
        let config = SessionConfig { flush_open_on_finalize: false, ..SessionConfig::default() };
        let session = TraceSession::with_sink(&config, BurstSink::disabled());
        session.region_begin(ThreadOrdinal(0), WorkConstruct::Loop, Location(0x1));
        let stats = session.finalize();
        assert_eq!(stats.bursts_emitted, 0);
    }

    #[test]
    fn violations_are_counted_not_fatal() {
        let session = TraceSession::with_sink(&SessionConfig::default(), BurstSink::disabled());
        session.region_end(ThreadOrdinal(0));
        session.lock_released(ThreadOrdinal(0));
        assert_eq!(session.stats().protocol_violations, 2);
    }
}
