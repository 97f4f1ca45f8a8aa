//! Core domain types
//!
//! Newtype wrappers and error types used throughout the engine.

pub mod errors;
pub mod types;

pub use errors::{ProtocolViolation, TracerError};
pub use types::{BurstKind, Location, Micros, TaskId, ThreadOrdinal};
