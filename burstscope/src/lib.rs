//! # burstscope - Event-Driven Interval-Tracing Engine
//!
//! burstscope consumes the stream of region, task, and lock notifications a
//! concurrently executing multi-threaded program emits and reconstructs, per
//! worker thread, a correctly nested timeline of execution intervals
//! ("bursts"). Enclosing intervals are split around blocking
//! sub-intervals, so wait time is never misattributed to useful work.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Host Execution Environment                 │
//! │              (worker threads, synchronous callbacks)         │
//! └──────────────────────────┬───────────────────────────────────┘
//!                            │ HostNotification (burstscope-common)
//!                            ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    burstscope (This Crate)                   │
//! │                                                              │
//! │  ┌────────────┐    ┌───────────────┐    ┌────────────┐       │
//! │  │   Event    │───▶│  ThreadTime-  │───▶│   Burst    │       │
//! │  │  Adapter   │    │ line (stacks) │    │    Sink    │       │
//! │  └────────────┘    └───────────────┘    └────────────┘       │
//! │        │                  ▲                    │             │
//! │        ▼                  │                    ▼             │
//! │  ┌────────────┐    ┌────────────┐    log lines / document    │
//! │  │   Trace    │    │Correlation │                            │
//! │  │  Session   │◀───│side-channel│◀── workload BurstIds calls │
//! │  └────────────┘    └────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`session`]: owns the timelines, the sink, and the clock;
//!   initialize/finalize lifecycle
//! - [`timeline`]: the per-thread burst stack with the split/resume algebra
//! - [`adapter`]: maps [`burstscope_common::HostNotification`] values onto
//!   the six stack operations
//! - [`correlation`]: backs the workload-facing `BurstIds` side channel
//! - [`sink`]: serializes completed bursts (log lines, or lines embedded in
//!   the visualization document)
//! - [`clock`]: the monotonic session epoch
//! - [`domain`]: newtypes and error types
//!
//! ## Typical Usage
//!
//! ```
//! use burstscope::adapter::EventAdapter;
//! use burstscope::session::{SessionConfig, TraceSession};
//! use burstscope::sink::{BurstSink, SinkFormat};
//! use burstscope_common::{HostNotification, WorkConstruct};
//!
//! // The host shim owns the session for the lifetime of the program.
//! let config = SessionConfig::default();
//! let session = TraceSession::with_sink(&config, BurstSink::from_writer(
//!     SinkFormat::Log,
//!     Box::new(Vec::<u8>::new()),
//! ));
//! let adapter = EventAdapter::new(&session);
//!
//! // Worker threads call in synchronously as the program executes.
//! adapter.handle(HostNotification::RegionBegin {
//!     thread: 0,
//!     construct: WorkConstruct::Loop,
//!     location: 0x40_21f0,
//! });
//! adapter.handle(HostNotification::RegionEnd {
//!     thread: 0,
//!     construct: WorkConstruct::Loop,
//!     location: 0x40_21f0,
//! });
//!
//! let stats = session.finalize();
//! assert_eq!(stats.bursts_emitted, 1);
//! ```

// Expose modules for testing
pub mod adapter;
pub mod clock;
pub mod correlation;
pub mod domain;
pub mod session;
pub mod sink;
pub mod timeline;
