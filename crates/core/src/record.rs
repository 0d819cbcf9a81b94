//! The in-memory unit of a dump

use crate::timestamp::Timestamp;

/// One captured payload.
///
/// Sequence numbers are assigned by the recorder when the payload is
/// appended, never by the caller. Within one recorder they start at 0 and
/// are gapless across chunk rotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Position of this record in the logical stream
    pub sequence: u64,
    /// Wall-clock time the record was appended
    pub timestamp: Timestamp,
    /// Opaque payload bytes (may be empty)
    pub payload: Vec<u8>,
}

impl Record {
    /// Create a new record
    pub fn new(sequence: u64, timestamp: Timestamp, payload: impl Into<Vec<u8>>) -> Self {
        Record {
            sequence,
            timestamp,
            payload: payload.into(),
        }
    }

    /// Consume the record, keeping only its payload
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
