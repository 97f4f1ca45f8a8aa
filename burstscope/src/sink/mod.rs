//! # Burst Sink
//!
//! Serializes completed bursts, one record at a time, to an underlying
//! writer. Stateless with respect to trace content; the only shared,
//! lock-protected resource in the engine. Two configurations behind one
//! type:
//!
//! - **Log mode**: one line per burst,
//!   `thread:start_us:end_us:kind:location:tag`.
//! - **Document mode**: the same lines embedded between markers inside the
//!   static visualization shell (see [`document`]).
//!
//! An unavailable destination never fails the host program: the sink logs
//! one diagnostic and degrades to dropping records.

pub mod document;

use crate::domain::TracerError;
use crate::timeline::Burst;
use log::warn;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

/// Output format selector; exactly two recognized values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkFormat {
    /// Plain log lines
    #[default]
    Log,
    /// Log lines embedded in the visualization document
    Document,
}

impl SinkFormat {
    /// Destination used when the configuration names none.
    #[must_use]
    pub fn default_path(self) -> PathBuf {
        match self {
            SinkFormat::Log => PathBuf::from("bursts.log"),
            SinkFormat::Document => PathBuf::from("bursts.html"),
        }
    }
}

impl FromStr for SinkFormat {
    type Err = TracerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(SinkFormat::Log),
            "document" => Ok(SinkFormat::Document),
            other => Err(TracerError::UnknownFormat(other.to_string())),
        }
    }
}

enum SinkState {
    /// Accepting records. `epilogue` is written once at close (document mode).
    Open { writer: Box<dyn Write + Send>, epilogue: Option<String> },
    /// Destination unavailable or failed mid-stream; records are dropped.
    Disabled,
    /// Closed by finalize; the epilogue has been written.
    Closed,
}

/// Mutex-serialized record writer shared by all worker threads.
///
/// The lock is held only for formatting and writing one record, bounding
/// contention.
pub struct BurstSink {
    state: Mutex<SinkState>,
}

impl BurstSink {
    /// Open a file-backed sink.
    ///
    /// Failure to create the destination is logged once and yields a
    /// disabled sink; the engine keeps running.
    #[must_use]
    pub fn create(format: SinkFormat, path: &Path) -> Self {
        match File::create(path) {
            Ok(file) => Self::from_writer(format, Box::new(BufWriter::new(file))),
            Err(source) => {
                let err = TracerError::OutputUnavailable { path: path.to_path_buf(), source };
                warn!("burst output disabled: {err}");
                Self::disabled()
            }
        }
    }

    /// Wrap an arbitrary writer (in-memory buffers for tests, files in
    /// production). Document mode writes its prologue immediately.
    #[must_use]
    pub fn from_writer(format: SinkFormat, mut writer: Box<dyn Write + Send>) -> Self {
        let epilogue = match format {
            SinkFormat::Log => None,
            SinkFormat::Document => match document::split_template() {
                Ok((prologue, epilogue)) => {
                    if let Err(err) = writer.write_all(prologue.as_bytes()) {
                        warn!("burst output disabled: {err}");
                        return Self::disabled();
                    }
                    Some(epilogue)
                }
                Err(err) => {
                    warn!("burst output disabled: {err}");
                    return Self::disabled();
                }
            },
        };
        Self { state: Mutex::new(SinkState::Open { writer, epilogue }) }
    }

    /// A sink that drops every record.
    #[must_use]
    pub fn disabled() -> Self {
        Self { state: Mutex::new(SinkState::Disabled) }
    }

    /// Whether records are currently being written.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(*self.lock_state(), SinkState::Open { .. })
    }

    /// Serialize one burst. Write failures disable the sink after a single
    /// diagnostic.
    pub fn emit(&self, burst: &Burst) {
        let mut state = self.lock_state();
        if let SinkState::Open { writer, .. } = &mut *state {
            if let Err(err) = writeln!(writer, "{}", render_line(burst)) {
                warn!("burst output disabled: {err}");
                *state = SinkState::Disabled;
            }
        }
    }

    /// Write the document epilogue, flush, and stop accepting records.
    /// Idempotent: finalize and Drop may both call it.
    pub fn close(&self) {
        let mut state = self.lock_state();
        if let SinkState::Open { writer, epilogue } = &mut *state {
            let mut finish = Ok(());
            if let Some(text) = epilogue.take() {
                finish = writer.write_all(text.as_bytes());
            }
            if let Err(err) = finish.and_then(|()| writer.flush()) {
                warn!("error closing burst output: {err}");
            }
            *state = SinkState::Closed;
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SinkState> {
        // A panic while holding the lock poisons it; the record it was
        // writing is already lost, the sink itself is still sound.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for BurstSink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Render one record: `thread:start_us:end_us:kind:location:tag`.
#[must_use]
pub fn render_line(burst: &Burst) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}",
        burst.thread, burst.start, burst.end, burst.kind, burst.location, burst.tag
    )
}
