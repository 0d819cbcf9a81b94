//! Chunk rotation state.
//!
//! A chunked recording is a numbered family of file pairs sharing a base
//! path:
//!
//! ```text
//! capture.dump.0   capture.log.0
//! capture.dump.1   capture.log.1
//! ...
//! ```
//!
//! The rotator tracks which index is open and hands finished pairs to the
//! rotation callback on a thread of their own.

use super::config::ChunkConfig;
use crate::sink::FileSink;
use dumpstore_core::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Extension tag of dump chunks
pub const DUMP_FILE_EXTENSION: &str = "dump";

/// Extension tag of companion log chunks
pub const LOG_FILE_EXTENSION: &str = "log";

/// Callback receiving each finished chunk pair.
///
/// Runs on its own thread; the recorder never waits for it. The files are
/// closed and will not be written again by the recorder.
pub type RotationCallback = Arc<dyn Fn(ChunkFiles) + Send + Sync>;

/// File names of one chunk pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFiles {
    /// Chunk index
    pub index: u64,
    /// `base.dump.{index}`
    pub dump: PathBuf,
    /// `base.log.{index}`
    pub log: PathBuf,
}

impl ChunkFiles {
    /// Names of chunk `index` for `base`.
    pub fn for_index(base: &Path, index: u64) -> Self {
        ChunkFiles {
            index,
            dump: chunk_path(base, DUMP_FILE_EXTENSION, index),
            log: chunk_path(base, LOG_FILE_EXTENSION, index),
        }
    }
}

/// Generate a chunk file path.
///
/// Format: `{base}.{extension}.{index}`, appended to the base file name
/// rather than replacing its extension.
pub fn chunk_path(base: &Path, extension: &str, index: u64) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!(".{}.{}", extension, index));
    PathBuf::from(name)
}

/// Extract the chunk index from a directory entry name.
///
/// Returns `None` unless `file_name` is exactly `{base_name}.{extension}.{N}`.
pub fn parse_chunk_index(base_name: &str, extension: &str, file_name: &str) -> Option<u64> {
    let rest = file_name.strip_prefix(base_name)?;
    let rest = rest.strip_prefix('.')?;
    let rest = rest.strip_prefix(extension)?;
    let digits = rest.strip_prefix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Rotation bookkeeping for a chunking recorder.
pub(crate) struct ChunkRotator {
    base: PathBuf,
    config: ChunkConfig,
    index: u64,
    callback: Option<RotationCallback>,
}

impl ChunkRotator {
    pub(crate) fn new(base: PathBuf, config: ChunkConfig, callback: Option<RotationCallback>) -> Self {
        ChunkRotator {
            base,
            config,
            index: 0,
            callback,
        }
    }

    /// Index of the open chunk
    pub(crate) fn index(&self) -> u64 {
        self.index
    }

    pub(crate) fn threshold(&self) -> u64 {
        self.config.threshold_bytes
    }

    /// Names of the open chunk
    pub(crate) fn current_files(&self) -> ChunkFiles {
        ChunkFiles::for_index(&self.base, self.index)
    }

    /// Whether a frame of `frame_len` bytes must start a new chunk.
    ///
    /// An empty chunk always takes the frame, so oversized frames never
    /// leave empty chunks behind.
    pub(crate) fn should_rotate(&self, chunk_bytes: u64, frame_len: usize) -> bool {
        chunk_bytes > 0 && chunk_bytes + frame_len as u64 > self.config.threshold_bytes
    }

    /// Create the dump and log files of the open chunk.
    pub(crate) fn open_current(&self) -> Result<(FileSink, FileSink)> {
        let files = self.current_files();
        let dump = FileSink::create(&files.dump).map_err(|source| Error::ChunkOpenFailed {
            path: files.dump.clone(),
            source,
        })?;
        let log = match FileSink::create(&files.log) {
            Ok(log) => log,
            Err(source) => {
                // Leave no dump chunk behind without its log.
                drop(dump);
                if let Err(e) = std::fs::remove_file(&files.dump) {
                    tracing::warn!(path = %files.dump.display(), error = %e, "Failed to remove orphaned dump chunk");
                }
                return Err(Error::ChunkOpenFailed {
                    path: files.log,
                    source,
                });
            }
        };
        Ok((dump, log))
    }

    /// Move to the next index.
    pub(crate) fn advance(&mut self) {
        self.index += 1;
    }

    /// Hand a finished chunk to the callback without waiting for it.
    pub(crate) fn dispatch(&self, finished: ChunkFiles) {
        let Some(callback) = self.callback.clone() else {
            return;
        };

        let index = finished.index;
        let spawned = thread::Builder::new()
            .name(format!("dump-rotate-{}", index))
            .spawn(move || callback(finished));

        if let Err(e) = spawned {
            tracing::error!(chunk = index, error = %e, "Failed to spawn rotation callback thread");
        }
    }
}
