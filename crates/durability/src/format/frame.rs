//! Dump frame format.
//!
//! A dump file is a bare concatenation of frames. There is no file header,
//! footer, or checksum, and no frame ever spans two chunk files.
//!
//! # Frame Layout
//!
//! ```text
//! ┌────────────────┬──────────────────────┬──────────────┬─────────────────────┐
//! │ Sequence (i64) │ Timestamp nanos (i64)│ Length (i32) │ Payload (Length)    │
//! └────────────────┴──────────────────────┴──────────────┴─────────────────────┘
//! ```
//!
//! All integers are little-endian. A length of zero or below carries no
//! payload bytes.

use byteorder::{ByteOrder, LittleEndian};
use dumpstore_core::{Error, Record, Result, Timestamp};

/// Size of the fixed frame header in bytes
pub const FRAME_HEADER_SIZE: usize = 20;

const SEQUENCE_OFFSET: usize = 0;
const TIMESTAMP_OFFSET: usize = 8;
const LENGTH_OFFSET: usize = 16;

/// Total encoded size of a frame carrying `payload_len` bytes
#[inline]
pub fn frame_len(payload_len: usize) -> usize {
    FRAME_HEADER_SIZE + payload_len
}

/// Serialize a record into a new frame buffer.
///
/// Payloads longer than `i32::MAX` bytes cannot be represented in the
/// length field; passing one is a caller error.
pub fn encode_frame(record: &Record) -> Vec<u8> {
    let mut buf = Vec::with_capacity(frame_len(record.payload.len()));
    encode_frame_into(&mut buf, record);
    buf
}

/// Append one frame for `record` to `buf`.
pub fn encode_frame_into(buf: &mut Vec<u8>, record: &Record) {
    encode_frame_parts(buf, record.sequence, record.timestamp, &record.payload);
}

/// Append one frame built from borrowed parts to `buf`.
///
/// Lets the recorder frame a caller's buffer without first copying it into
/// a [`Record`].
pub fn encode_frame_parts(buf: &mut Vec<u8>, sequence: u64, timestamp: Timestamp, payload: &[u8]) {
    debug_assert!(
        payload.len() <= i32::MAX as usize,
        "payload of {} bytes does not fit the frame length field",
        payload.len()
    );

    let mut header = [0u8; FRAME_HEADER_SIZE];
    LittleEndian::write_i64(&mut header[SEQUENCE_OFFSET..TIMESTAMP_OFFSET], sequence as i64);
    LittleEndian::write_i64(
        &mut header[TIMESTAMP_OFFSET..LENGTH_OFFSET],
        timestamp.as_nanos(),
    );
    LittleEndian::write_i32(
        &mut header[LENGTH_OFFSET..FRAME_HEADER_SIZE],
        payload.len() as i32,
    );

    buf.reserve(frame_len(payload.len()));
    buf.extend_from_slice(&header);
    buf.extend_from_slice(payload);
}

/// Decode the frame starting at `offset`.
///
/// Returns the record and the offset just past it.
pub fn decode_frame(buf: &[u8], offset: usize) -> Result<(Record, usize)> {
    let available = buf.len().saturating_sub(offset);
    if available < FRAME_HEADER_SIZE {
        return Err(Error::TruncatedFrame {
            offset,
            needed: FRAME_HEADER_SIZE,
            available,
        });
    }

    let header = &buf[offset..offset + FRAME_HEADER_SIZE];
    let sequence = LittleEndian::read_i64(&header[SEQUENCE_OFFSET..TIMESTAMP_OFFSET]);
    let timestamp = LittleEndian::read_i64(&header[TIMESTAMP_OFFSET..LENGTH_OFFSET]);
    let length = LittleEndian::read_i32(&header[LENGTH_OFFSET..FRAME_HEADER_SIZE]);

    // Negative lengths are read as "no payload".
    let payload_len = usize::try_from(length).unwrap_or(0);
    let needed = frame_len(payload_len);
    if available < needed {
        return Err(Error::TruncatedFrame {
            offset,
            needed,
            available,
        });
    }

    let start = offset + FRAME_HEADER_SIZE;
    let payload = buf[start..start + payload_len].to_vec();
    let record = Record::new(sequence as u64, Timestamp::from_nanos(timestamp), payload);

    Ok((record, start + payload_len))
}

/// Decode every frame in `buf`.
///
/// Stops cleanly at the end of the buffer. A partial trailing frame fails
/// the whole decode.
pub fn decode_frames(buf: &[u8]) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let (record, next) = decode_frame(buf, offset)?;
        records.push(record);
        offset = next;
    }

    Ok(records)
}
