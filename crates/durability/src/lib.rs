//! Durability layer for dumpstore
//!
//! This crate handles everything that touches disk:
//!
//! - Frame format: sequence-numbered, timestamped length-prefixed frames
//! - Sinks: file-backed and in-memory byte destinations
//! - Companion log: the text log paired with each dump chunk
//! - Recorder: thread-safe frame appender with size-based chunk rotation
//! - Reader: offline decoding of single dumps and whole chunk families
//! - Test helpers for sinks and notifiers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod companion; // Timestamped text log, default Notifier
pub mod format; // Binary frame encode/decode
pub mod reader; // Offline replay
pub mod recorder; // DumpRecorder, chunk rotation, size reporting
pub mod sink; // Dump sinks (file, writer)
pub mod testing; // In-memory sinks and notifiers for tests

// === Re-exports ===
pub use companion::CompanionLog;
pub use format::{decode_frame, decode_frames, encode_frame, frame_len, FRAME_HEADER_SIZE};
pub use reader::{list_chunks, read_chunked, DumpReader};
pub use recorder::{
    ChunkConfig, ChunkFiles, DumpRecorder, RecorderConfig, RecorderConfigError, RecorderStats,
    RecorderStatus, RotationCallback, WriteFailurePolicy, RECORDER_SOURCE,
};
pub use sink::{DumpSink, FileSink, WriterSink};
