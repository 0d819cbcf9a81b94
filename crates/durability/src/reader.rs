//! Dump reader for offline replay.
//!
//! Reads a finished dump fully into memory and hands its contents back as
//! records, as one concatenated byte stream, or as a finite channel of
//! payloads. Chunked recordings are read as a whole family with
//! [`read_chunked`].

use crate::format::decode_frames;
use crate::recorder::{chunk_path, parse_chunk_index, DUMP_FILE_EXTENSION};
use dumpstore_core::{Error, Record, Result};
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::Path;

/// In-memory view of one dump file.
#[derive(Debug, Clone)]
pub struct DumpReader {
    data: Vec<u8>,
}

impl DumpReader {
    /// Read the dump file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Read a dump from any byte source until EOF.
    pub fn from_reader(mut source: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        Ok(DumpReader { data })
    }

    /// Raw dump bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Decode every record in file order.
    ///
    /// A partial trailing frame fails with `TruncatedFrame`.
    pub fn records(&self) -> Result<Vec<Record>> {
        decode_frames(&self.data)
    }

    /// Payloads in file order, headers dropped.
    pub fn payloads(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.records()?.into_iter().map(Record::into_payload).collect())
    }

    /// All payloads concatenated, readable as a byte stream.
    ///
    /// Record boundaries are not preserved.
    pub fn into_byte_reader(self) -> Result<Cursor<Vec<u8>>> {
        let records = self.records()?;
        let total = records.iter().map(|r| r.payload.len()).sum();

        let mut bytes = Vec::with_capacity(total);
        for record in records {
            bytes.extend_from_slice(&record.payload);
        }
        Ok(Cursor::new(bytes))
    }

    /// Payloads delivered one by one through a channel.
    ///
    /// The channel is pre-filled and disconnected after the last payload,
    /// so receivers see end-of-stream once it is drained.
    pub fn into_channel(self) -> Result<crossbeam_channel::Receiver<Vec<u8>>> {
        let records = self.records()?;
        let (tx, rx) = crossbeam_channel::bounded(records.len());

        for record in records {
            // Capacity covers every payload and `rx` is alive, so this never blocks or fails.
            let _ = tx.send(record.into_payload());
        }
        drop(tx);

        Ok(rx)
    }
}

/// Indexes of the dump chunks present for `base`, ascending.
///
/// Gaps are reported as-is; a family whose early chunks were removed by
/// the rotation callback still lists its remaining indexes.
pub fn list_chunks(base: impl AsRef<Path>) -> Result<Vec<u64>> {
    let base = base.as_ref();
    let base_name = base
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| Error::InvalidConfig(format!("{} has no file name", base.display())))?;
    let dir = match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut indexes = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(index) = parse_chunk_index(&base_name, DUMP_FILE_EXTENSION, &name) {
            indexes.push(index);
        }
    }

    indexes.sort_unstable();
    Ok(indexes)
}

/// Decode every chunk of `base` in index order.
///
/// Sequence numbers continue across chunks, so the result reads as one
/// recording.
pub fn read_chunked(base: impl AsRef<Path>) -> Result<Vec<Record>> {
    let base = base.as_ref();
    let mut records = Vec::new();

    for index in list_chunks(base)? {
        let path = chunk_path(base, DUMP_FILE_EXTENSION, index);
        records.extend(DumpReader::open(&path)?.records()?);
    }

    Ok(records)
}
