//! # Per-Thread Burst Stack
//!
//! The central data structure: one [`ThreadTimeline`] per worker thread,
//! holding the LIFO of currently-open bursts. All operations are O(1) pushes
//! and pops executed on the owning thread; timestamps are passed in
//! explicitly so the split/resume algebra is testable with synthetic clocks.
//!
//! ## Split / Resume
//!
//! Lock traffic is the one place where "what a thread is doing" changes
//! without a clean begin/end pair from the enclosing construct, so the stack
//! synthesizes the missing boundary:
//!
//! ```text
//! open(Single)      stack: [Single]
//! begin_wait        emit Single[t0..t1], keep slot   stack: [Single*, Wait]
//! acquired          emit Wait[t1..t2]                stack: [Single*, Critical]
//! release           emit Critical[t2..t3],
//!                   resume Single* with start=t3     stack: [Single]
//! close             emit Single[t3..t4]              stack: []
//! ```
//!
//! The enclosing interval is emitted as two or more disjoint siblings whose
//! union, plus the wait/critical detour, covers its original span with no
//! gaps and no overlaps. Wait time is never attributed to useful work.

use crate::domain::{BurstKind, Location, Micros, ProtocolViolation, ThreadOrdinal};
use burstscope_common::CORRELATION_UNSET;

/// One reconstructed, closed interval, ready for sinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst {
    pub thread: ThreadOrdinal,
    pub kind: BurstKind,
    pub location: Location,
    pub start: Micros,
    pub end: Micros,
    /// Correlation tag; `0` when the interval was never annotated.
    pub tag: i64,
}

/// A burst that has begun but not yet closed.
#[derive(Debug, Clone, Copy)]
struct OpenBurst {
    kind: BurstKind,
    location: Location,
    start: Micros,
    /// `(tag, level)` pair from the side channel, last write wins.
    correlation: Option<(i64, i64)>,
}

/// Stack of currently-open bursts for one worker thread.
///
/// Owned exclusively by its thread for the lifetime of the session; only the
/// finalizer touches it from outside, after workers quiesce.
#[derive(Debug)]
pub struct ThreadTimeline {
    thread: ThreadOrdinal,
    stack: Vec<OpenBurst>,
}

impl ThreadTimeline {
    #[must_use]
    pub fn new(thread: ThreadOrdinal) -> Self {
        // Nesting deeper than this is legal but unusual; the Vec grows.
        Self { thread, stack: Vec::with_capacity(8) }
    }

    /// Number of currently-open bursts.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Push a new open burst; it becomes the top of the stack.
    pub fn open(&mut self, kind: BurstKind, location: Location, now: Micros) {
        self.stack.push(OpenBurst { kind, location, start: now, correlation: None });
    }

    /// Pop the top burst and stamp its end.
    ///
    /// # Errors
    ///
    /// [`ProtocolViolation::EmptyClose`] when no burst is open.
    pub fn close(&mut self, now: Micros) -> Result<Burst, ProtocolViolation> {
        self.stack
            .pop()
            .ok_or(ProtocolViolation::EmptyClose)
            .map(|open| self.sealed(&open, now))
    }

    /// Close the active task burst, if one is on top, then open the next.
    ///
    /// Models a worker yielding from one task to another: the prior task's
    /// burst must end before the next begins so the two never overlap, even
    /// though both occupy "the task slot" on this thread. Returns the closed
    /// burst, if any.
    pub fn switch_task(&mut self, next: Option<Location>, now: Micros) -> Option<Burst> {
        let closed = match self.stack.pop() {
            Some(open) if open.kind == BurstKind::Task => Some(self.sealed(&open, now)),
            Some(open) => {
                self.stack.push(open);
                None
            }
            None => None,
        };
        if let Some(location) = next {
            self.open(BurstKind::Task, location, now);
        }
        closed
    }

    /// Suspend the current top interval and start a wait burst.
    ///
    /// The top's elapsed portion is emitted (end = now) but its slot stays on
    /// the stack with the correlation intact, so [`release`](Self::release)
    /// can resume it. Returns the emitted split segment, if a burst was open.
    pub fn begin_wait(&mut self, location: Location, now: Micros) -> Option<Burst> {
        let split = self.stack.last().map(|top| self.sealed(top, now));
        self.open(BurstKind::Wait, location, now);
        split
    }

    /// Transition from waiting to holding: close the wait burst, open a
    /// critical burst.
    ///
    /// # Errors
    ///
    /// [`ProtocolViolation::AcquireWithoutWait`] when the top is not a wait
    /// burst. The critical burst is opened regardless: the lock is factually
    /// held, and dropping it would misattribute the critical section.
    pub fn acquired(&mut self, location: Location, now: Micros) -> Result<Burst, ProtocolViolation> {
        let waited = match self.stack.pop() {
            Some(open) if open.kind == BurstKind::Wait => Some(self.sealed(&open, now)),
            Some(open) => {
                self.stack.push(open);
                None
            }
            None => None,
        };
        self.open(BurstKind::Critical, location, now);
        waited.ok_or(ProtocolViolation::AcquireWithoutWait)
    }

    /// Close the critical burst and resume the suspended interval beneath it.
    ///
    /// The newly exposed top, if any, restarts its clock at `now`: the
    /// enclosing work interval continues as a fresh sibling segment instead
    /// of one interval that wrongly includes the wait and the critical
    /// section.
    ///
    /// # Errors
    ///
    /// [`ProtocolViolation::ReleaseWithoutCritical`] when the top is not a
    /// critical burst; the stack is left untouched.
    pub fn release(&mut self, now: Micros) -> Result<Burst, ProtocolViolation> {
        match self.stack.pop() {
            Some(open) if open.kind == BurstKind::Critical => {
                let burst = self.sealed(&open, now);
                if let Some(resumed) = self.stack.last_mut() {
                    resumed.start = now;
                }
                Ok(burst)
            }
            Some(open) => {
                self.stack.push(open);
                Err(ProtocolViolation::ReleaseWithoutCritical)
            }
            None => Err(ProtocolViolation::ReleaseWithoutCritical),
        }
    }

    /// Attach a `(tag, level)` pair to the open top burst, last write wins.
    ///
    /// Returns `false` (no-op) when no burst is open.
    pub fn annotate(&mut self, tag: i64, level: i64) -> bool {
        match self.stack.last_mut() {
            Some(top) => {
                top.correlation = Some((tag, level));
                true
            }
            None => false,
        }
    }

    /// Read the top burst's `(tag, level)` pair; sentinel when unset or when
    /// no burst is open.
    #[must_use]
    pub fn correlation(&self) -> (i64, i64) {
        self.stack
            .last()
            .and_then(|top| top.correlation)
            .unwrap_or((CORRELATION_UNSET, CORRELATION_UNSET))
    }

    /// Close every open burst, top-first, stamping `end = now`.
    ///
    /// Finalize-time flush: pops innermost-first, the order end notifications
    /// would have arrived.
    pub fn drain(&mut self, now: Micros) -> Vec<Burst> {
        let mut drained = Vec::with_capacity(self.stack.len());
        while let Some(open) = self.stack.pop() {
            drained.push(self.sealed(&open, now));
        }
        drained
    }

    fn sealed(&self, open: &OpenBurst, end: Micros) -> Burst {
        debug_assert!(end >= open.start, "emitted burst must satisfy end >= start");
        Burst {
            thread: self.thread,
            kind: open.kind,
            location: open.location,
            start: open.start,
            end,
            tag: open.correlation.map_or(0, |(tag, _)| tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> ThreadTimeline {
        ThreadTimeline::new(ThreadOrdinal(0))
    }

    const LOC: Location = Location(0xbeef);
    const LOCK: Location = Location(0xcafe);

    #[test]
    fn plain_open_close_emits_one_burst() {
        let mut tl = timeline();
        tl.open(BurstKind::Loop, LOC, Micros(0));
        let burst = tl.close(Micros(100)).unwrap();
        assert_eq!(burst.thread, ThreadOrdinal(0));
        assert_eq!(burst.kind, BurstKind::Loop);
        assert_eq!(burst.location, LOC);
        assert_eq!((burst.start, burst.end), (Micros(0), Micros(100)));
        assert_eq!(burst.tag, 0);
        assert!(tl.is_empty());
    }

    #[test]
    fn nested_bursts_are_contained() {
        let mut tl = timeline();
        tl.open(BurstKind::Loop, LOC, Micros(0));
        tl.open(BurstKind::Single, Location(0x2), Micros(10));
        let inner = tl.close(Micros(20)).unwrap();
        let outer = tl.close(Micros(30)).unwrap();
        assert!(outer.start <= inner.start && inner.end <= outer.end);
        assert_eq!(outer.kind, BurstKind::Loop);
    }

    #[test]
    fn wait_splits_and_release_resumes_the_enclosing_burst() {
        let mut tl = timeline();
        tl.open(BurstKind::Single, LOC, Micros(0));

        let split = tl.begin_wait(LOCK, Micros(10)).unwrap();
        assert_eq!(split.kind, BurstKind::Single);
        assert_eq!((split.start, split.end), (Micros(0), Micros(10)));
        assert_eq!(tl.depth(), 2);

        let wait = tl.acquired(LOCK, Micros(15)).unwrap();
        assert_eq!(wait.kind, BurstKind::Wait);
        assert_eq!((wait.start, wait.end), (Micros(10), Micros(15)));

        let critical = tl.release(Micros(40)).unwrap();
        assert_eq!(critical.kind, BurstKind::Critical);
        assert_eq!((critical.start, critical.end), (Micros(15), Micros(40)));

        // The suspended Single restarts at the release timestamp.
        let resumed = tl.close(Micros(90)).unwrap();
        assert_eq!(resumed.kind, BurstKind::Single);
        assert_eq!((resumed.start, resumed.end), (Micros(40), Micros(90)));
        assert!(tl.is_empty());
    }

    #[test]
    fn split_segments_cover_the_span_without_gaps() {
        let mut tl = timeline();
        tl.open(BurstKind::Task, LOC, Micros(0));
        let first = tl.begin_wait(LOCK, Micros(25)).unwrap();
        let wait = tl.acquired(LOCK, Micros(30)).unwrap();
        let critical = tl.release(Micros(50)).unwrap();
        let second = tl.close(Micros(80)).unwrap();

        assert_eq!(first.end, wait.start);
        assert_eq!(wait.end, critical.start);
        assert_eq!(critical.end, second.start);
    }

    #[test]
    fn begin_wait_with_empty_stack_opens_a_bare_wait() {
        let mut tl = timeline();
        assert!(tl.begin_wait(LOCK, Micros(5)).is_none());
        let wait = tl.acquired(LOCK, Micros(9)).unwrap();
        assert_eq!((wait.start, wait.end), (Micros(5), Micros(9)));
    }

    #[test]
    fn switch_task_closes_the_prior_task_first() {
        let mut tl = timeline();
        assert!(tl.switch_task(Some(Location(0x10)), Micros(0)).is_none());
        let prior = tl.switch_task(Some(Location(0x20)), Micros(40)).unwrap();
        assert_eq!(prior.kind, BurstKind::Task);
        assert_eq!(prior.location, Location(0x10));
        assert_eq!((prior.start, prior.end), (Micros(0), Micros(40)));
        assert_eq!(tl.depth(), 1);
    }

    #[test]
    fn switch_task_to_nothing_only_closes() {
        let mut tl = timeline();
        tl.switch_task(Some(Location(0x10)), Micros(0));
        let prior = tl.switch_task(None, Micros(15)).unwrap();
        assert_eq!(prior.location, Location(0x10));
        assert!(tl.is_empty());
    }

    #[test]
    fn switch_task_leaves_non_task_top_alone() {
        let mut tl = timeline();
        tl.open(BurstKind::Loop, LOC, Micros(0));
        assert!(tl.switch_task(Some(Location(0x10)), Micros(5)).is_none());
        assert_eq!(tl.depth(), 2);
    }

    #[test]
    fn close_underflow_is_a_violation() {
        let mut tl = timeline();
        assert_eq!(tl.close(Micros(1)), Err(ProtocolViolation::EmptyClose));
    }

    #[test]
    fn acquired_without_wait_reports_but_still_opens_critical() {
        let mut tl = timeline();
        tl.open(BurstKind::Single, LOC, Micros(0));
        assert_eq!(tl.acquired(LOCK, Micros(5)), Err(ProtocolViolation::AcquireWithoutWait));
        // The single is untouched, the critical is on top.
        assert_eq!(tl.depth(), 2);
        let critical = tl.release(Micros(9)).unwrap();
        assert_eq!(critical.kind, BurstKind::Critical);
    }

    #[test]
    fn release_without_critical_is_a_no_op() {
        let mut tl = timeline();
        tl.open(BurstKind::Loop, LOC, Micros(0));
        assert_eq!(tl.release(Micros(5)), Err(ProtocolViolation::ReleaseWithoutCritical));
        assert_eq!(tl.depth(), 1);
        assert_eq!(tl.release(Micros(6)), Err(ProtocolViolation::ReleaseWithoutCritical));
    }

    #[test]
    fn annotate_tags_the_open_top_with_last_write_winning() {
        let mut tl = timeline();
        tl.open(BurstKind::Task, LOC, Micros(0));
        assert!(tl.annotate(3, 1));
        assert!(tl.annotate(7, 2));
        assert_eq!(tl.correlation(), (7, 2));
        let burst = tl.close(Micros(50)).unwrap();
        assert_eq!(burst.tag, 7);
    }

    #[test]
    fn annotate_with_no_open_burst_is_a_no_op() {
        let mut tl = timeline();
        assert!(!tl.annotate(7, 1));
        assert_eq!(tl.correlation(), (-1, -1));
    }

    #[test]
    fn correlation_survives_a_split() {
        let mut tl = timeline();
        tl.open(BurstKind::Single, LOC, Micros(0));
        tl.annotate(11, 0);
        let split = tl.begin_wait(LOCK, Micros(10)).unwrap();
        assert_eq!(split.tag, 11);
        tl.acquired(LOCK, Micros(12)).unwrap();
        tl.release(Micros(20)).unwrap();
        let resumed = tl.close(Micros(30)).unwrap();
        assert_eq!(resumed.tag, 11);
    }

    #[test]
    fn drain_pops_innermost_first() {
        let mut tl = timeline();
        tl.open(BurstKind::Loop, LOC, Micros(0));
        tl.open(BurstKind::Single, Location(0x2), Micros(10));
        let drained = tl.drain(Micros(99));
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].kind, BurstKind::Single);
        assert_eq!(drained[1].kind, BurstKind::Loop);
        assert!(drained.iter().all(|b| b.end == Micros(99)));
        assert!(tl.is_empty());
    }
}
