//! Background size reporter
//!
//! Periodically reports the current chunk size through the notifier.
//!
//! # Thread Lifecycle
//!
//! - `ReporterSignal` is raised to ask the thread to stop
//! - The thread emits one final report after seeing the signal, then exits
//! - `SizeReporter::stop` raises the signal and joins, so the final report
//!   has happened by the time it returns
//!
//! The signal can be raised without joining (from paths that hold the
//! recorder lock the report needs); joining then happens later in `close`.

use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// One-shot stop signal shared with the reporter thread.
#[derive(Default)]
pub(crate) struct ReporterSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl ReporterSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Ask the reporter to stop. Raising twice is harmless.
    pub(crate) fn raise(&self) {
        let mut stopped = self.stopped.lock();
        *stopped = true;
        self.wake.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn is_raised(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep until `deadline` or until raised. Returns whether raised.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// Handle to a running size reporter thread.
pub(crate) struct SizeReporter {
    signal: Arc<ReporterSignal>,
    handle: JoinHandle<()>,
}

impl SizeReporter {
    /// Start reporting every `interval` until `signal` is raised.
    pub(crate) fn spawn<F>(interval: Duration, signal: Arc<ReporterSignal>, report: F) -> io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let thread_signal = Arc::clone(&signal);
        let handle = thread::Builder::new()
            .name("dump-size-reporter".to_string())
            .spawn(move || report_loop(interval, &thread_signal, report))?;

        Ok(SizeReporter { signal, handle })
    }

    /// Raise the signal and wait for the final report.
    pub(crate) fn stop(self) {
        self.signal.raise();
        if self.handle.join().is_err() {
            tracing::error!("Dump size reporter thread panicked");
        }
    }
}

fn report_loop<F: Fn()>(interval: Duration, signal: &ReporterSignal, report: F) {
    tracing::debug!(interval_ms = interval.as_millis() as u64, "Dump size reporter started");
    loop {
        let stopped = signal.wait_until(Instant::now() + interval);
        report();
        if stopped {
            break;
        }
    }
    tracing::debug!("Dump size reporter stopped");
}
