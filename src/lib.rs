//! dumpstore - Chunked binary dump recorder
//!
//! dumpstore captures a stream of opaque byte payloads into append-only dump
//! files. Every payload is framed with a sequence number and a wall-clock
//! timestamp, and long captures can be split into size-bounded chunks, each
//! paired with a text log covering the same time window.
//!
//! # Quick Start
//!
//! ```ignore
//! use dumpstore::{ChunkConfig, CompanionLog, DumpReader, DumpRecorder, RecorderConfig};
//! use std::sync::Arc;
//!
//! let recorder = DumpRecorder::chunked(
//!     "/var/dumps/capture",
//!     ChunkConfig::from_kb(64 * 1024),
//!     None,
//!     RecorderConfig::default(),
//!     Arc::new(CompanionLog::new()),
//! )?;
//!
//! recorder.record(b"payload")?;
//! recorder.close()?;
//!
//! let payloads = DumpReader::open("/var/dumps/capture.dump.0")?.payloads()?;
//! ```
//!
//! # Architecture
//!
//! Shared types (records, timestamps, errors and the notifier seam) live in
//! `dumpstore-core`. Everything that touches disk lives in
//! `dumpstore-durability`. Both are re-exported here.

pub use dumpstore_core::*;
pub use dumpstore_durability::*;
