//! # Shared Boundary Vocabulary (Host Runtime ↔ Tracer)
//!
//! Defines the notification shapes the host execution environment delivers to
//! the tracer, plus the correlation side-channel that instrumented workload
//! code may call. Both sides of the instrumentation boundary depend on this
//! crate only; the engine itself lives in `burstscope`.
//!
//! ## Key Types
//!
//! - [`HostNotification`] - One host-runtime callback, as a closed enum
//! - [`WorkConstruct`] - Classification of a worksharing region
//! - [`BurstIds`] - Correlation side-channel client for workload code
//! - [`CorrelationProvider`] - Capability a tracer supplies to back [`BurstIds`]

use std::sync::Arc;

// ============================================================================
// Work Construct Classification
// ============================================================================

/// Raw classification code for a loop worksharing region
pub const WORK_LOOP: u32 = 1;

/// Raw classification code for a sections region
pub const WORK_SECTIONS: u32 = 2;

/// Raw classification code for the thread executing a single region
pub const WORK_SINGLE_EXECUTOR: u32 = 3;

/// Raw classification code for threads skipping a single region
pub const WORK_SINGLE_OTHER: u32 = 4;

/// Classification of a worksharing region, as reported by the host runtime.
///
/// Closed enumeration: codes outside the recognized range collapse into
/// [`WorkConstruct::Other`] so the trace degrades gracefully when the host
/// grows new region types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkConstruct {
    /// Worksharing loop body
    Loop,
    /// Sections region
    Sections,
    /// Single region, on the thread that executes it
    SingleExecutor,
    /// Single region, on the threads that skip it
    SingleOther,
    /// Unrecognized classification code
    Other,
}

impl WorkConstruct {
    /// Decode a raw classification code from the host runtime.
    #[must_use]
    pub fn from_raw(code: u32) -> Self {
        match code {
            WORK_LOOP => WorkConstruct::Loop,
            WORK_SECTIONS => WorkConstruct::Sections,
            WORK_SINGLE_EXECUTOR => WorkConstruct::SingleExecutor,
            WORK_SINGLE_OTHER => WorkConstruct::SingleOther,
            _ => WorkConstruct::Other,
        }
    }
}

// ============================================================================
// Host Notifications
// ============================================================================

/// One notification from the host execution environment.
///
/// Fields are raw integers at this boundary; the engine wraps them in domain
/// newtypes on entry. `thread` is the host-assigned small-integer thread
/// ordinal (NOT an OS thread id), `location` is an opaque address-sized token
/// identifying the originating call site, never dereferenced.
///
/// Task identities are host-assigned and only meaningful as keys: a
/// `TaskCreate` registers the identity → location association that later
/// `TaskSwitch` notifications refer back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostNotification {
    /// A worksharing region began on `thread`
    RegionBegin { thread: u32, construct: WorkConstruct, location: u64 },
    /// The matching region end
    RegionEnd { thread: u32, construct: WorkConstruct, location: u64 },
    /// A task was created at `location` (not yet running)
    TaskCreate { task: u64, location: u64 },
    /// `thread` stopped running task `prior` and started `next`, if any
    TaskSwitch { thread: u32, prior: Option<u64>, next: Option<u64> },
    /// `thread` started waiting to enter a lock-protected region
    LockWaitBegin { thread: u32, location: u64 },
    /// `thread` acquired the lock it was waiting on
    LockAcquired { thread: u32, location: u64 },
    /// `thread` released the lock
    LockReleased { thread: u32, location: u64 },
}

// ============================================================================
// Correlation Side-Channel
// ============================================================================

/// Sentinel reported by [`BurstIds::get_id`] when no tracer is connected or
/// the current interval carries no annotation.
pub const CORRELATION_UNSET: i64 = -1;

/// Capability a tracer implements to back the correlation side-channel.
///
/// Both operations act on the interval currently open on the *calling*
/// thread; the provider resolves the thread identity itself.
pub trait CorrelationProvider: Send + Sync {
    /// Attach `(tag, level)` to the calling thread's open interval, if any.
    fn set_id(&self, tag: i64, level: i64);

    /// Read the calling thread's current `(tag, level)` pair.
    fn get_id(&self) -> (i64, i64);
}

/// Correlation side-channel handle held by workload code.
///
/// The handle is a nullable strategy: when no tracer is present the workload
/// gets a [`BurstIds::disconnected`] handle and every call is a cheap no-op,
/// mirroring how an absent tool resolves to a null weak symbol. Presence of
/// the tracer never changes workload control flow.
#[derive(Clone, Default)]
pub struct BurstIds {
    provider: Option<Arc<dyn CorrelationProvider>>,
}

impl BurstIds {
    /// Handle with no tracer behind it; all calls are no-ops.
    #[must_use]
    pub fn disconnected() -> Self {
        Self { provider: None }
    }

    /// Handle backed by a live tracer.
    #[must_use]
    pub fn connected(provider: Arc<dyn CorrelationProvider>) -> Self {
        Self { provider: Some(provider) }
    }

    /// Whether a tracer is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.provider.is_some()
    }

    /// Attach `(tag, level)` to the calling thread's open interval.
    ///
    /// Best-effort: no-op when disconnected or when the calling thread has no
    /// open interval.
    pub fn set_id(&self, tag: i64, level: i64) {
        if let Some(provider) = &self.provider {
            provider.set_id(tag, level);
        }
    }

    /// Read the calling thread's `(tag, level)` pair.
    ///
    /// Reports `(CORRELATION_UNSET, CORRELATION_UNSET)` when disconnected.
    #[must_use]
    pub fn get_id(&self) -> (i64, i64) {
        self.provider
            .as_ref()
            .map_or((CORRELATION_UNSET, CORRELATION_UNSET), |provider| provider.get_id())
    }
}
