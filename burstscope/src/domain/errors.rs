//! Structured error types for burstscope
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! The tracer never fails the host program: [`TracerError`] values are logged
//! and the affected subsystem degrades, while [`ProtocolViolation`] values
//! mark host-contract breaches that the engine reports and absorbs.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TracerError {
    #[error("thread ordinal {thread} exceeds the configured limit of {max} timelines")]
    ThreadLimitExceeded { thread: u32, max: usize },

    #[error("failed to open output destination {path}: {source}")]
    OutputUnavailable { path: PathBuf, source: io::Error },

    #[error("unrecognized output format {0:?} (expected \"log\" or \"document\")")]
    UnknownFormat(String),

    #[error("visualization template is missing the embedding placeholder")]
    TemplateMalformed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Host-contract breach detected by a burst stack operation.
///
/// Always reported (one diagnostic, one counter bump) and absorbed as a
/// no-op; the stack is never indexed past its bounds.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("end notification with no open burst")]
    EmptyClose,

    #[error("lock acquired with no wait burst on top of the stack")]
    AcquireWithoutWait,

    #[error("lock released with no critical burst on top of the stack")]
    ReleaseWithoutCritical,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_limit_error_display() {
        let err = TracerError::ThreadLimitExceeded { thread: 200, max: 128 };
        assert_eq!(
            err.to_string(),
            "thread ordinal 200 exceeds the configured limit of 128 timelines"
        );
    }

    #[test]
    fn unknown_format_error_names_expected_values() {
        let err = TracerError::UnknownFormat("xml".to_string());
        assert!(err.to_string().contains("xml"));
        assert!(err.to_string().contains("\"log\""));
    }

    #[test]
    fn violation_display() {
        assert_eq!(ProtocolViolation::EmptyClose.to_string(), "end notification with no open burst");
    }
}
