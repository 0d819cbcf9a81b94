//! Dump recorder.
//!
//! [`DumpRecorder`] appends sequence-numbered, timestamped frames to a sink.
//! In chunking mode it also cuts the output into size-bounded chunk files,
//! each paired with a companion text log covering the same time window.
//!
//! # Thread Safety
//!
//! `record` may be called from any number of threads. Sequence assignment,
//! the rotation decision, rotation itself, the write and the counters all
//! happen under one mutex per recorder. The notifier's own lock is only ever
//! taken after the recorder lock, and the notifier never calls back in.
//!
//! # Chunk Rotation
//!
//! When the next frame would push the open chunk past the threshold, the
//! recorder closes `base.dump.N` and `base.log.N`, hands their names to the
//! rotation callback on a separate thread, then opens `base.dump.N+1` and
//! `base.log.N+1` and points the notifier at the new log. Sequence numbers
//! carry on across chunks.
//!
//! # Example
//!
//! ```
//! use dumpstore_durability::companion::CompanionLog;
//! use dumpstore_durability::recorder::{DumpRecorder, RecorderConfig};
//! use dumpstore_durability::testing::SharedBuffer;
//! use dumpstore_durability::sink::WriterSink;
//! use std::sync::Arc;
//!
//! let buffer = SharedBuffer::new();
//! let recorder = DumpRecorder::new(
//!     Box::new(WriterSink::new(buffer.clone())),
//!     RecorderConfig::default(),
//!     Arc::new(CompanionLog::new()),
//! )
//! .unwrap();
//!
//! assert_eq!(recorder.record(b"hello").unwrap(), Some(0));
//! recorder.close().unwrap();
//! ```

pub mod chunk;
pub mod config;
mod reporter;

pub use chunk::{
    chunk_path, parse_chunk_index, ChunkFiles, RotationCallback, DUMP_FILE_EXTENSION,
    LOG_FILE_EXTENSION,
};
pub use config::{ChunkConfig, RecorderConfig, RecorderConfigError, WriteFailurePolicy};

use crate::companion::thousands;
use crate::format::encode_frame_parts;
use crate::sink::{DumpSink, FileSink};
use chunk::ChunkRotator;
use dumpstore_core::{Error, Notifier, Result, Timestamp};
use parking_lot::Mutex;
use reporter::{ReporterSignal, SizeReporter};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source identity used for everything the recorder reports.
pub const RECORDER_SOURCE: &str = "[DumpRecorder]";

/// Lifecycle state of a recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderStatus {
    /// Accepting records
    Recording,
    /// Temporarily ignoring records (see [`DumpRecorder::enable`])
    Disabled,
    /// Closed by the host
    Closed,
    /// Stopped after an unrecoverable error
    Failed {
        /// What went wrong
        reason: String,
    },
}

impl RecorderStatus {
    /// Whether the recorder can never record again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecorderStatus::Closed | RecorderStatus::Failed { .. })
    }
}

/// Point-in-time counters of a recorder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecorderStats {
    /// Sequence number the next record will get
    pub next_sequence: u64,
    /// Index of the open chunk (always 0 outside chunking mode)
    pub chunk_index: u64,
    /// Bytes written to the open chunk
    pub chunk_bytes: u64,
    /// Frames written over the recorder's lifetime
    pub frames_written: u64,
    /// Sink writes that failed
    pub write_failures: u64,
}

struct RecorderState {
    sink: Option<Box<dyn DumpSink>>,
    status: RecorderStatus,
    next_sequence: u64,
    chunk_bytes: u64,
    frames_written: u64,
    write_failures: u64,
    rotator: Option<ChunkRotator>,
    /// Reused frame buffer
    scratch: Vec<u8>,
    /// Last file-backed sink, kept after release for the final size report
    name: Option<PathBuf>,
    final_size_reported: bool,
}

impl RecorderState {
    fn sink_name(&self) -> Option<PathBuf> {
        self.sink
            .as_ref()
            .and_then(|sink| sink.nameable())
            .map(|n| n.name().to_path_buf())
    }

    fn size_report(&self) -> String {
        let prefix = self
            .name
            .as_ref()
            .map(|path| format!("Dump file, {}, ", path.display()))
            .unwrap_or_default();
        format!("{}size: {} B", prefix, thousands(self.chunk_bytes))
    }
}

struct Shared {
    state: Mutex<RecorderState>,
    notifier: Arc<dyn Notifier>,
    signal: Arc<ReporterSignal>,
    write_failure: WriteFailurePolicy,
    reports_size: bool,
}

impl Shared {
    /// Close the open chunk pair and open the next one.
    fn rotate(&self, state: &mut RecorderState) -> Result<()> {
        let Some(rotator) = state.rotator.as_mut() else {
            return Ok(());
        };

        let finished = rotator.current_files();
        tracing::debug!(
            chunk = finished.index,
            bytes = state.chunk_bytes,
            "Rotating dump chunk"
        );

        if let Some(mut sink) = state.sink.take() {
            if let Err(e) = sink.close() {
                tracing::warn!(path = %finished.dump.display(), error = %e, "Failed to close dump chunk");
            }
        }
        if let Some(mut log) = self.notifier.redirect(None) {
            if let Err(e) = log.flush() {
                tracing::warn!(path = %finished.log.display(), error = %e, "Failed to flush log chunk");
            }
        }

        rotator.dispatch(finished);
        rotator.advance();

        let (dump, log) = rotator.open_current()?;
        self.notifier.redirect(Some(Box::new(log)));
        state.name = Some(dump.path().to_path_buf());
        state.sink = Some(Box::new(dump));
        state.chunk_bytes = 0;
        Ok(())
    }

    /// Enter the terminal `Failed` state.
    ///
    /// The caller holds the state lock the reporter thread needs, so the
    /// final size report is emitted here, before the sinks are released.
    /// The reporter is only signalled; joining happens in `close`.
    fn fail(&self, state: &mut RecorderState, reason: String) {
        tracing::error!(reason = %reason, "Dump recorder stopped");
        self.notifier
            .notify(RECORDER_SOURCE, &format!("Recording stopped: {}", reason));

        state.status = RecorderStatus::Failed { reason };
        if self.reports_size {
            self.notifier.notify(RECORDER_SOURCE, &state.size_report());
            state.final_size_reported = true;
        }
        if let Err(e) = self.release_sinks(state) {
            tracing::warn!(error = %e, "Failed to close dump sink");
        }
        self.signal.raise();
    }

    /// Close the dump sink and, in chunking mode, detach the companion log.
    ///
    /// Does nothing once the sink is gone, so the host's later redirects
    /// are never undone by a repeated close.
    fn release_sinks(&self, state: &mut RecorderState) -> io::Result<()> {
        let Some(mut sink) = state.sink.take() else {
            return Ok(());
        };
        let result = sink.close();

        if state.rotator.is_some() {
            if let Some(mut log) = self.notifier.redirect(None) {
                if let Err(e) = log.flush() {
                    tracing::warn!(error = %e, "Failed to flush log chunk");
                }
            }
        }
        result
    }

    fn report_size(&self) {
        let message = {
            let state = self.state.lock();
            if state.final_size_reported {
                return;
            }
            state.size_report()
        };
        self.notifier.notify(RECORDER_SOURCE, &message);
    }
}

/// Append-only recorder of opaque byte payloads.
///
/// Dropping the recorder closes it.
pub struct DumpRecorder {
    shared: Arc<Shared>,
    reporter: Mutex<Option<SizeReporter>>,
}

impl DumpRecorder {
    /// Record into a single, unrotated sink.
    pub fn new(
        sink: Box<dyn DumpSink>,
        config: RecorderConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        Self::build(sink, None, config, notifier)
    }

    /// Record into a single file, appending if it already exists.
    pub fn create_file(
        path: impl AsRef<Path>,
        config: RecorderConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let sink = FileSink::append(path)?;
        tracing::info!(path = %path.display(), "Opened dump file");
        Self::new(Box::new(sink), config, notifier)
    }

    /// Record into a rotating family of chunk files named after `base`.
    ///
    /// Creates `base.dump.0` and `base.log.0` and redirects `notifier` to the
    /// log file. `on_rotate` receives each finished chunk pair.
    pub fn chunked(
        base: impl Into<PathBuf>,
        chunking: ChunkConfig,
        on_rotate: Option<RotationCallback>,
        config: RecorderConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        chunking
            .validate()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let base = base.into();
        let rotator = ChunkRotator::new(base, chunking, on_rotate);
        let (dump, log) = rotator.open_current()?;

        if let Some(mut previous) = notifier.redirect(Some(Box::new(log))) {
            let _ = previous.flush();
        }
        tracing::info!(
            path = %dump.path().display(),
            threshold = rotator.threshold(),
            "Opened chunked dump recording"
        );

        Self::build(Box::new(dump), Some(rotator), config, notifier)
    }

    fn build(
        sink: Box<dyn DumpSink>,
        rotator: Option<ChunkRotator>,
        config: RecorderConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let name = sink.nameable().map(|n| n.name().to_path_buf());
        let shared = Arc::new(Shared {
            state: Mutex::new(RecorderState {
                sink: Some(sink),
                status: RecorderStatus::Recording,
                next_sequence: 0,
                chunk_bytes: 0,
                frames_written: 0,
                write_failures: 0,
                rotator,
                scratch: Vec::new(),
                name,
                final_size_reported: false,
            }),
            notifier,
            signal: Arc::new(ReporterSignal::new()),
            write_failure: config.write_failure,
            reports_size: config.report_interval().is_some(),
        });

        let reporter = match config.report_interval() {
            Some(interval) => {
                let reporting = Arc::clone(&shared);
                Some(SizeReporter::spawn(
                    interval,
                    Arc::clone(&shared.signal),
                    move || reporting.report_size(),
                )?)
            }
            None => None,
        };

        Ok(DumpRecorder {
            shared,
            reporter: Mutex::new(reporter),
        })
    }

    /// Append one payload.
    ///
    /// Returns the sequence number assigned to it, or `None` if the
    /// recorder is disabled, closed or failed (nothing is written then).
    ///
    /// # Errors
    ///
    /// - `ChunkOpenFailed`: rotation could not open the next chunk; the
    ///   recorder is now `Failed` and later calls return `Ok(None)`
    /// - `WriteFailed`: the sink rejected the frame; the sequence number is
    ///   not consumed. Bytes of the frame that did reach the sink are
    ///   discarded; if the sink cannot discard them the recorder is now
    ///   `Failed`, whatever the write failure policy
    pub fn record(&self, payload: &[u8]) -> Result<Option<u64>> {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;

        if state.status != RecorderStatus::Recording {
            return Ok(None);
        }

        let sequence = state.next_sequence;
        state.scratch.clear();
        encode_frame_parts(&mut state.scratch, sequence, Timestamp::now(), payload);
        let frame_len = state.scratch.len();

        let must_rotate = state
            .rotator
            .as_ref()
            .map_or(false, |r| r.should_rotate(state.chunk_bytes, frame_len));
        if must_rotate {
            if let Err(e) = self.shared.rotate(state) {
                self.shared.fail(state, e.to_string());
                return Err(e);
            }
        }

        let Some(sink) = state.sink.as_mut() else {
            return Ok(None);
        };
        if let Err(torn) = sink.write_frame(&state.scratch) {
            state.write_failures += 1;
            let rewound = match torn.written {
                0 => true,
                written => match sink.discard_tail(written) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(sequence, written, error = %e, "Failed to discard partial frame");
                        false
                    }
                },
            };

            let err = Error::WriteFailed(torn.error);
            tracing::warn!(sequence, error = %err, "Dump write failed");
            self.shared.notifier.notify(
                RECORDER_SOURCE,
                &format!("Failed to write record {}: {}", sequence, err),
            );
            if !rewound {
                self.shared
                    .fail(state, format!("partial frame left in dump: {}", err));
            } else if self.shared.write_failure == WriteFailurePolicy::Disable {
                self.shared.fail(state, err.to_string());
            }
            return Err(err);
        }

        state.chunk_bytes += frame_len as u64;
        state.frames_written += 1;
        state.next_sequence += 1;
        Ok(Some(sequence))
    }

    /// Resume recording after [`disable`](Self::disable).
    ///
    /// Has no effect on a closed or failed recorder.
    pub fn enable(&self) {
        let mut state = self.shared.state.lock();
        if state.status == RecorderStatus::Disabled {
            state.status = RecorderStatus::Recording;
        }
    }

    /// Ignore records until [`enable`](Self::enable) is called.
    pub fn disable(&self) {
        let mut state = self.shared.state.lock();
        if state.status == RecorderStatus::Recording {
            state.status = RecorderStatus::Disabled;
        }
    }

    /// Whether `record` currently writes.
    pub fn is_recording(&self) -> bool {
        self.shared.state.lock().status == RecorderStatus::Recording
    }

    /// Stop recording and release the sinks.
    ///
    /// Waits for the size reporter's final report, which sees the size as
    /// of this call. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            if !state.status.is_terminal() {
                state.status = RecorderStatus::Closed;
            }
        }

        self.shared.signal.raise();
        let reporter = self.reporter.lock().take();
        if let Some(reporter) = reporter {
            reporter.stop();
        }

        let mut state = self.shared.state.lock();
        self.shared.release_sinks(&mut state)?;
        Ok(())
    }

    /// Path of the live dump file, if the sink is file-backed.
    pub fn dump_file(&self) -> Option<PathBuf> {
        self.shared.state.lock().sink_name()
    }

    /// Names of the open chunk pair, in chunking mode.
    pub fn chunk_files(&self) -> Option<ChunkFiles> {
        let state = self.shared.state.lock();
        state.rotator.as_ref().map(|r| r.current_files())
    }

    /// Current lifecycle state.
    pub fn status(&self) -> RecorderStatus {
        self.shared.state.lock().status.clone()
    }

    /// Snapshot of the recorder's counters.
    pub fn stats(&self) -> RecorderStats {
        let state = self.shared.state.lock();
        RecorderStats {
            next_sequence: state.next_sequence,
            chunk_index: state.rotator.as_ref().map_or(0, |r| r.index()),
            chunk_bytes: state.chunk_bytes,
            frames_written: state.frames_written,
            write_failures: state.write_failures,
        }
    }
}

impl Drop for DumpRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "Failed to close dump recorder on drop");
        }
    }
}
