//! On-disk byte formats.
//!
//! Serialization lives here, apart from the recorder that decides when and
//! where frames are written.
//!
//! # Module Structure
//!
//! - `frame`: Dump frame encode/decode

pub mod frame;

pub use frame::{
    decode_frame, decode_frames, encode_frame, encode_frame_into, encode_frame_parts, frame_len,
    FRAME_HEADER_SIZE,
};
