//! Dump sinks.
//!
//! A sink is where encoded frames go. The recorder only needs `Write` plus
//! an explicit close; file-backed sinks additionally expose their path via
//! the [`Nameable`] capability.

use dumpstore_core::Nameable;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A frame write that did not complete.
#[derive(Debug)]
pub struct FrameWriteError {
    /// Bytes of the frame that reached the sink before the failure
    pub written: usize,
    /// The failure itself
    pub error: io::Error,
}

/// Destination for encoded frames.
pub trait DumpSink: Write + Send {
    /// The sink's filesystem identity, if it has one.
    fn nameable(&self) -> Option<&dyn Nameable> {
        None
    }

    /// Write one whole frame.
    ///
    /// On failure, reports how many bytes of the frame were accepted so the
    /// caller can rewind them with [`discard_tail`](Self::discard_tail).
    fn write_frame(&mut self, frame: &[u8]) -> Result<(), FrameWriteError> {
        let mut written = 0;
        while written < frame.len() {
            match self.write(&frame[written..]) {
                Ok(0) => {
                    return Err(FrameWriteError {
                        written,
                        error: io::ErrorKind::WriteZero.into(),
                    })
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(FrameWriteError { written, error }),
            }
        }
        Ok(())
    }

    /// Remove the last `len` bytes written.
    ///
    /// Sinks that cannot rewind return `Unsupported`.
    fn discard_tail(&mut self, len: usize) -> io::Result<()> {
        let _ = len;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "sink cannot discard written bytes",
        ))
    }

    /// Flush and release the sink.
    ///
    /// Writes after close are a caller error.
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

/// File-backed sink.
///
/// Frames are written straight to the file so that a crashed process leaves
/// every completed `record` call on disk.
pub struct FileSink {
    file: Option<File>,
    path: PathBuf,
}

impl FileSink {
    /// Create (or truncate) a file for a fresh chunk.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        Ok(FileSink {
            file: Some(file),
            path,
        })
    }

    /// Open a file for appending, creating it if missing.
    pub fn append(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(FileSink {
            file: Some(file),
            path,
        })
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("dump file {} is closed", self.path.display()),
            )
        })
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file_mut()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Nameable for FileSink {
    fn name(&self) -> &Path {
        &self.path
    }
}

impl DumpSink for FileSink {
    fn nameable(&self) -> Option<&dyn Nameable> {
        Some(self)
    }

    fn discard_tail(&mut self, len: usize) -> io::Result<()> {
        let file = self.file_mut()?;
        let end = file.metadata()?.len();
        let keep = end.checked_sub(len as u64).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot discard {} bytes from a {} byte file", len, end),
            )
        })?;
        file.set_len(keep)?;
        file.seek(SeekFrom::End(0))?;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Sink over an arbitrary writer (socket, pipe, in-memory buffer, ...).
///
/// Not nameable.
pub struct WriterSink<W> {
    inner: W,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        WriterSink { inner }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> Write for WriterSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write + Send> DumpSink for WriterSink<W> {}
