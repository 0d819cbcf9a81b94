//! Core types and traits for dumpstore
//!
//! This crate defines the foundational types shared by the recorder and reader:
//! - Record: One captured payload with its sequence number and timestamp
//! - Timestamp: Nanosecond wall-clock instant
//! - Error: Error type hierarchy
//! - Traits: Collaborator seams (Nameable, Notifier)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod record;
pub mod timestamp;
pub mod traits;

pub use error::{Error, Result};
pub use record::Record;
pub use timestamp::Timestamp;
pub use traits::{LogDestination, Nameable, Notifier};
