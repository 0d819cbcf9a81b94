//! Testing utilities for the recorder
//!
//! In-memory stand-ins for the recorder's collaborators:
//!
//! - **SharedBuffer**: Cloneable in-memory writer whose bytes stay inspectable
//!   after the recorder takes ownership of a clone
//! - **FailingWriter**: Writer that errors after a byte budget is exhausted,
//!   optionally with a short write first and recovery afterwards
//! - **CollectingNotifier**: Notifier that records every message and redirect
//!
//! # Example
//!
//! ```
//! use dumpstore_durability::testing::SharedBuffer;
//! use std::io::Write;
//!
//! let buffer = SharedBuffer::new();
//! let mut writer = buffer.clone();
//! writer.write_all(b"frame").unwrap();
//! assert_eq!(buffer.contents(), b"frame");
//! ```

use crate::sink::DumpSink;
use dumpstore_core::{LogDestination, Notifier};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Cloneable in-memory writer.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    /// Contents decoded as UTF-8 (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer that accepts a byte budget, then fails.
///
/// A write larger than the remaining budget is short: it accepts what is
/// left and the next write fails. With [`partial`](Self::partial) the writer
/// recovers after a fixed number of failures.
///
/// Used bare it is a rewindable [`DumpSink`]; wrapped in a
/// [`WriterSink`](crate::sink::WriterSink) it cannot rewind.
pub struct FailingWriter {
    budget: usize,
    failures: Option<usize>,
    output: SharedBuffer,
}

impl FailingWriter {
    /// Accept `budget` bytes, then fail every write
    pub fn after(budget: usize) -> Self {
        FailingWriter {
            budget,
            failures: None,
            output: SharedBuffer::new(),
        }
    }

    /// Accept `accept` bytes, fail the next `then_fail` writes, then recover
    pub fn partial(accept: usize, then_fail: usize) -> Self {
        FailingWriter {
            budget: accept,
            failures: Some(then_fail),
            output: SharedBuffer::new(),
        }
    }

    /// Handle on the bytes accepted so far
    pub fn output(&self) -> SharedBuffer {
        self.output.clone()
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            match self.failures {
                None => return Err(injected_failure()),
                Some(0) => return self.output.write(buf),
                Some(ref mut left) => {
                    *left -= 1;
                    return Err(injected_failure());
                }
            }
        }
        let accepted = buf.len().min(self.budget);
        self.budget -= accepted;
        self.output.write(&buf[..accepted])
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DumpSink for FailingWriter {
    fn discard_tail(&mut self, len: usize) -> io::Result<()> {
        let mut bytes = self.output.bytes.lock();
        let keep = bytes.len().saturating_sub(len);
        bytes.truncate(keep);
        Ok(())
    }
}

fn injected_failure() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "injected write failure")
}

/// Notifier that keeps every message in memory.
#[derive(Default)]
pub struct CollectingNotifier {
    messages: Mutex<Vec<(String, String)>>,
    destination: Mutex<Option<LogDestination>>,
    redirects: Mutex<usize>,
}

impl CollectingNotifier {
    /// Empty notifier
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(source, message)` pairs received, in order
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().clone()
    }

    /// Messages containing `needle`
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(_, message)| message.contains(needle))
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Number of `redirect` calls that attached a destination
    pub fn redirect_count(&self) -> usize {
        *self.redirects.lock()
    }

    /// Whether a destination is currently attached
    pub fn has_destination(&self) -> bool {
        self.destination.lock().is_some()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, source: &str, message: &str) {
        self.messages
            .lock()
            .push((source.to_string(), message.to_string()));
        if let Some(destination) = self.destination.lock().as_mut() {
            let _ = writeln!(destination, "{} {}", source, message.trim_end_matches('\n'));
        }
    }

    fn redirect(&self, destination: Option<LogDestination>) -> Option<LogDestination> {
        if destination.is_some() {
            *self.redirects.lock() += 1;
        }
        std::mem::replace(&mut *self.destination.lock(), destination)
    }
}
