//! Collaborator traits
//!
//! The recorder talks to the rest of the process through two small seams:
//!
//! - [`Nameable`]: capability of sinks that live at a filesystem path
//! - [`Notifier`]: the process-wide text log the recorder reports through,
//!   whose destination follows the recorder's chunk boundaries

use std::io::Write;
use std::path::Path;

/// Boxed text-log destination handed to [`Notifier::redirect`]
pub type LogDestination = Box<dyn Write + Send>;

/// A sink with a stable filesystem identity.
///
/// Only file-backed sinks implement this. Callers discover it through a
/// capability query rather than by inspecting the concrete sink type.
pub trait Nameable {
    /// Path of the underlying file
    fn name(&self) -> &Path;
}

/// Text-log collaborator.
///
/// Thread safety: both methods may be called from the recording thread, the
/// size reporter thread and the host concurrently (requires Send + Sync).
///
/// Implementations must never call back into a recorder; the recorder may
/// hold its own lock while calling either method.
pub trait Notifier: Send + Sync {
    /// Emit one formatted message on behalf of `source`
    fn notify(&self, source: &str, message: &str);

    /// Replace the text destination, returning the previous one.
    ///
    /// `None` detaches the current destination; messages keep flowing to
    /// whatever other outputs the implementation has.
    fn redirect(&self, destination: Option<LogDestination>) -> Option<LogDestination>;
}
