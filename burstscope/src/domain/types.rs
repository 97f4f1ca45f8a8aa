//! Domain newtypes providing compile-time safety and self-documentation
//!
//! These wrappers prevent common bugs like passing an OS thread id where a
//! host thread ordinal is expected, and make function signatures more
//! expressive.

use burstscope_common::WorkConstruct;
use std::fmt;

/// Host-assigned thread ordinal (0-indexed)
///
/// Indexes the session's timeline slot array. This is NOT an OS thread id;
/// the host runtime numbers its workers densely from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadOrdinal(pub u32);

impl ThreadOrdinal {
    /// Slot-array index for this ordinal.
    #[must_use]
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ThreadOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque call-site token
///
/// Address-sized identity of the code location that opened a burst.
/// Equality-comparable and printable only, never dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location(pub u64);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Host-assigned task identity
///
/// Only meaningful as a registry key mapping back to the creating
/// [`Location`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Timestamp in microseconds relative to the session epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Micros(pub u64);

impl Micros {
    /// Convert to milliseconds (f64), for summary display.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_millis(self) -> f64 {
        self.0 as f64 / 1_000.0
    }
}

impl fmt::Display for Micros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of one emitted burst.
///
/// Closed tag set: the work constructs, the task slot, the two lock phases,
/// and the fallback for unrecognized inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BurstKind {
    /// Worksharing loop body
    Loop,
    /// Sections region
    Sections,
    /// Single region, executing thread
    Single,
    /// Single region, skipping threads
    SingleOther,
    /// Explicit task execution
    Task,
    /// Holding a lock
    Critical,
    /// Waiting to enter a lock
    Wait,
    /// Unrecognized work classification
    Unknown,
}

impl From<WorkConstruct> for BurstKind {
    fn from(construct: WorkConstruct) -> Self {
        match construct {
            WorkConstruct::Loop => BurstKind::Loop,
            WorkConstruct::Sections => BurstKind::Sections,
            WorkConstruct::SingleExecutor => BurstKind::Single,
            WorkConstruct::SingleOther => BurstKind::SingleOther,
            WorkConstruct::Other => BurstKind::Unknown,
        }
    }
}

impl fmt::Display for BurstKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BurstKind::Loop => "Loop",
            BurstKind::Sections => "Sections",
            BurstKind::Single => "Single",
            BurstKind::SingleOther => "SingleOther",
            BurstKind::Task => "Task",
            BurstKind::Critical => "Critical",
            BurstKind::Wait => "Wait",
            BurstKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}
