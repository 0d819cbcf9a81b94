//! Companion text log.
//!
//! [`CompanionLog`] is the process-wide notifier the recorder reports through.
//! Every message is emitted as a `tracing` event; when a destination is
//! attached, it is also appended there as a timestamped line:
//!
//! ```text
//! 2024/03/09 14:02:11 [DumpRecorder] size: 1,048,576 B
//! ```
//!
//! In chunking mode the recorder swaps the destination at every rotation so
//! each `base.dump.N` has a `base.log.N` covering the same time window.
//! The host owns the log and hands an `Arc` to the recorder; there is no
//! global instance.

use crate::sink::FileSink;
use dumpstore_core::{LogDestination, Notifier};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::path::Path;

const LINE_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Redirectable text log.
#[derive(Default)]
pub struct CompanionLog {
    /// Guarded separately from any recorder lock; always acquired second.
    destination: Mutex<Option<LogDestination>>,
}

impl CompanionLog {
    /// Log with no text destination (tracing only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Log writing to `destination`.
    pub fn with_destination(destination: LogDestination) -> Self {
        CompanionLog {
            destination: Mutex::new(Some(destination)),
        }
    }

    /// Log appending to the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let sink = FileSink::append(path.as_ref())?;
        Ok(Self::with_destination(Box::new(sink)))
    }

    /// Whether a text destination is attached.
    pub fn has_destination(&self) -> bool {
        self.destination.lock().is_some()
    }

    /// Flush the current destination, if any.
    pub fn flush(&self) -> io::Result<()> {
        match self.destination.lock().as_mut() {
            Some(destination) => destination.flush(),
            None => Ok(()),
        }
    }

    fn format_line(source: &str, message: &str) -> String {
        let now = chrono::Local::now();
        format!(
            "{} {} {}\n",
            now.format(LINE_TIME_FORMAT),
            source,
            message.trim_end_matches('\n')
        )
    }
}

impl Notifier for CompanionLog {
    fn notify(&self, source: &str, message: &str) {
        tracing::info!(source, "{}", message.trim_end_matches('\n'));

        let mut guard = self.destination.lock();
        if let Some(destination) = guard.as_mut() {
            let line = Self::format_line(source, message);
            if let Err(e) = destination.write_all(line.as_bytes()) {
                tracing::warn!(error = %e, "Failed to write companion log line");
            }
        }
    }

    fn redirect(&self, destination: Option<LogDestination>) -> Option<LogDestination> {
        let mut guard = self.destination.lock();
        std::mem::replace(&mut *guard, destination)
    }
}

/// Format a byte count with thousands separators: `1234567` → `"1,234,567"`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SharedBuffer;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1_000), "1,000");
        assert_eq!(thousands(123_456), "123,456");
        assert_eq!(thousands(1_234_567), "1,234,567");
        assert_eq!(thousands(u64::MAX), "18,446,744,073,709,551,615");
    }

    #[test]
    fn test_notify_writes_timestamped_line() {
        let buffer = SharedBuffer::new();
        let log = CompanionLog::with_destination(Box::new(buffer.clone()));

        log.notify("[DumpRecorder]", "size: 1,024 B\n");

        let text = buffer.text();
        let line = text.lines().next().unwrap();
        // "YYYY/MM/DD HH:MM:SS " prefix
        assert_eq!(line.as_bytes()[4], b'/');
        assert_eq!(line.as_bytes()[7], b'/');
        assert_eq!(line.as_bytes()[13], b':');
        assert!(line.ends_with("[DumpRecorder] size: 1,024 B"));
        assert_eq!(text.matches('\n').count(), 1);
    }

    #[test]
    fn test_notify_without_destination() {
        let log = CompanionLog::new();
        assert!(!log.has_destination());
        log.notify("[test]", "goes to tracing only");
        log.flush().unwrap();
    }

    #[test]
    fn test_redirect_swaps_destination() {
        let first = SharedBuffer::new();
        let second = SharedBuffer::new();
        let log = CompanionLog::with_destination(Box::new(first.clone()));

        log.notify("[test]", "one");
        let previous = log.redirect(Some(Box::new(second.clone())));
        assert!(previous.is_some());
        log.notify("[test]", "two");

        assert!(first.text().contains("one"));
        assert!(!first.text().contains("two"));
        assert!(second.text().contains("two"));

        assert!(log.redirect(None).is_some());
        assert!(!log.has_destination());
    }

    #[test]
    fn test_open_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let log = CompanionLog::open(&path).unwrap();
        log.notify("[test]", "later");
        log.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("earlier\n"));
        assert!(text.trim_end().ends_with("[test] later"));
    }
}
