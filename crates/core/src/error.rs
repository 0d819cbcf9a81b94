//! Error types for dumpstore
//!
//! This module defines all error types used by the recorder and reader.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dumpstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for dump recording and decoding
#[derive(Debug, Error)]
pub enum Error {
    /// The buffer ended in the middle of a frame.
    ///
    /// Raised by the frame decoder when fewer than a full header remains, or
    /// when the declared payload length runs past the end of the buffer. The
    /// whole decode fails; records decoded before the bad frame are discarded.
    #[error("Truncated frame at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedFrame {
        /// Byte offset of the frame that could not be decoded
        offset: usize,
        /// Bytes required to finish the frame
        needed: usize,
        /// Bytes left in the buffer from `offset`
        available: usize,
    },

    /// A chunk file could not be opened.
    ///
    /// Terminal for the recorder that hit it.
    #[error("Failed to open chunk file {}: {source}", path.display())]
    ChunkOpenFailed {
        /// Path of the chunk file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Writing a frame to the dump sink failed
    #[error("Failed to write dump frame: {0}")]
    WriteFailed(#[source] io::Error),

    /// I/O error (reading dumps, listing chunks, ...)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Invalid recorder configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether this error by itself leaves the recorder unable to accept records.
    ///
    /// Ignores the recorder's write failure policy: a `WriteFailed` under a
    /// policy that stops recording reports `false` here. The recorder's
    /// status is the authoritative answer.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Error::ChunkOpenFailed { .. })
    }
}
