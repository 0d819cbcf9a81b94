//! Chunk rotation tests
//!
//! These tests verify size-based rotation against real files:
//! - The triggering frame goes to the new chunk, never split
//! - No chunk exceeds the threshold unless it holds a single frame
//! - Sequence numbers continue across chunks
//! - The rotation callback sees each finished pair exactly once
//! - Companion log lines land in the chunk of their time window
//! - A failed rotation stops the recorder for good

use crossbeam_channel::{unbounded, Receiver};
use dumpstore_core::{Error, Notifier};
use dumpstore_durability::testing::CollectingNotifier;
use dumpstore_durability::{
    frame_len, list_chunks, read_chunked, ChunkConfig, ChunkFiles, CompanionLog, DumpReader,
    DumpRecorder, RecorderConfig, RecorderStatus, RotationCallback,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Callback forwarding finished chunks into a channel
fn channel_callback() -> (RotationCallback, Receiver<ChunkFiles>) {
    let (tx, rx) = unbounded();
    let callback: RotationCallback = Arc::new(move |files: ChunkFiles| {
        let _ = tx.send(files);
    });
    (callback, rx)
}

fn chunk_payloads(files: &ChunkFiles) -> Vec<Vec<u8>> {
    DumpReader::open(&files.dump).unwrap().payloads().unwrap()
}

#[test]
fn test_rotation_after_two_frames() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("cap");
    let (callback, rotated) = channel_callback();

    // "a" + "bb" fit in 45 bytes, "ccc" does not
    let threshold = (frame_len(1) + frame_len(2)) as u64;
    let recorder = DumpRecorder::chunked(
        &base,
        ChunkConfig::new(threshold),
        Some(callback),
        RecorderConfig::default(),
        Arc::new(CollectingNotifier::new()),
    )
    .unwrap();

    assert_eq!(recorder.record(b"a").unwrap(), Some(0));
    assert_eq!(recorder.record(b"bb").unwrap(), Some(1));
    assert_eq!(recorder.stats().chunk_index, 0);
    assert_eq!(recorder.record(b"ccc").unwrap(), Some(2));
    assert_eq!(recorder.stats().chunk_index, 1);
    recorder.close().unwrap();

    let finished = rotated.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(finished, ChunkFiles::for_index(&base, 0));
    assert!(rotated.recv_timeout(Duration::from_millis(200)).is_err());

    let first = DumpReader::open(&finished.dump).unwrap().records().unwrap();
    let seqs: Vec<u64> = first.iter().map(|r| r.sequence).collect();
    assert_eq!(seqs, vec![0, 1]);

    let second = DumpReader::open(ChunkFiles::for_index(&base, 1).dump)
        .unwrap()
        .records()
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].sequence, 2);
    assert_eq!(second[0].payload, b"ccc");

    assert!(finished.log.exists());
    assert_eq!(list_chunks(&base).unwrap(), vec![0, 1]);
}

#[test]
fn test_no_rotation_under_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("roomy");
    let (callback, rotated) = channel_callback();

    let recorder = DumpRecorder::chunked(
        &base,
        ChunkConfig::for_testing(),
        Some(callback),
        RecorderConfig::default(),
        Arc::new(CollectingNotifier::new()),
    )
    .unwrap();
    for payload in ["a", "bb", "ccc"] {
        recorder.record(payload.as_bytes()).unwrap();
    }
    recorder.close().unwrap();

    assert!(rotated.recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(list_chunks(&base).unwrap(), vec![0]);
    assert_eq!(
        chunk_payloads(&ChunkFiles::for_index(&base, 0)),
        vec![b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()]
    );
}

#[test]
fn test_oversized_frame_gets_own_chunk() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("big");

    let recorder = DumpRecorder::chunked(
        &base,
        ChunkConfig::new(64),
        None,
        RecorderConfig::default(),
        Arc::new(CollectingNotifier::new()),
    )
    .unwrap();

    recorder.record(&[1u8; 200]).unwrap();
    recorder.record(&[2u8; 200]).unwrap();
    recorder.record(b"small").unwrap();
    recorder.close().unwrap();

    // No empty chunk before the first oversized frame
    assert_eq!(list_chunks(&base).unwrap(), vec![0, 1, 2]);
    assert_eq!(chunk_payloads(&ChunkFiles::for_index(&base, 0)), vec![vec![1u8; 200]]);
    assert_eq!(chunk_payloads(&ChunkFiles::for_index(&base, 2)), vec![b"small".to_vec()]);
}

#[test]
fn test_companion_log_follows_chunks() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("logged");
    let log = Arc::new(CompanionLog::new());

    let recorder = DumpRecorder::chunked(
        &base,
        ChunkConfig::new(frame_len(10) as u64),
        None,
        RecorderConfig::default(),
        log.clone(),
    )
    .unwrap();
    assert!(log.has_destination());

    log.notify("[host]", "during chunk zero");
    recorder.record(&[0u8; 10]).unwrap();
    recorder.record(&[1u8; 10]).unwrap();
    log.notify("[host]", "during chunk one");
    recorder.close().unwrap();

    assert!(!log.has_destination());
    log.notify("[host]", "after close");

    let zero = std::fs::read_to_string(ChunkFiles::for_index(&base, 0).log).unwrap();
    let one = std::fs::read_to_string(ChunkFiles::for_index(&base, 1).log).unwrap();
    assert!(zero.contains("[host] during chunk zero"));
    assert!(!zero.contains("during chunk one"));
    assert!(one.contains("[host] during chunk one"));
    assert!(!one.contains("after close"));
}

#[test]
fn test_slow_callback_does_not_block_recording() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("slow");
    let (tx, rx) = unbounded();
    let callback: RotationCallback = Arc::new(move |files: ChunkFiles| {
        std::thread::sleep(Duration::from_millis(300));
        let _ = tx.send(files.index);
    });

    let recorder = DumpRecorder::chunked(
        &base,
        ChunkConfig::new(frame_len(4) as u64),
        Some(callback),
        RecorderConfig::default(),
        Arc::new(CollectingNotifier::new()),
    )
    .unwrap();

    for i in 0..5u32 {
        recorder.record(&i.to_le_bytes()).unwrap();
    }
    // Four rotations happened while every callback was still sleeping
    assert_eq!(recorder.stats().chunk_index, 4);
    recorder.close().unwrap();

    let mut indexes: Vec<u64> = (0..4)
        .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap())
        .collect();
    indexes.sort_unstable();
    assert_eq!(indexes, vec![0, 1, 2, 3]);
}

#[test]
fn test_callback_may_remove_finished_chunk() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("upload");
    let (tx, rx) = unbounded();
    let callback: RotationCallback = Arc::new(move |files: ChunkFiles| {
        let payloads = DumpReader::open(&files.dump).unwrap().payloads().unwrap();
        std::fs::remove_file(&files.dump).unwrap();
        std::fs::remove_file(&files.log).unwrap();
        let _ = tx.send(payloads);
    });

    let recorder = DumpRecorder::chunked(
        &base,
        ChunkConfig::new(frame_len(3) as u64),
        Some(callback),
        RecorderConfig::default(),
        Arc::new(CollectingNotifier::new()),
    )
    .unwrap();
    recorder.record(b"one").unwrap();
    recorder.record(b"two").unwrap();

    let shipped = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(shipped, vec![b"one".to_vec()]);
    recorder.close().unwrap();

    assert_eq!(list_chunks(&base).unwrap(), vec![1]);
    let remaining = read_chunked(&base).unwrap();
    assert_eq!(remaining[0].sequence, 1);
}

#[test]
fn test_rotation_failure_stops_recorder() {
    let temp_dir = TempDir::new().unwrap();
    let dump_dir = temp_dir.path().join("vanishing");
    std::fs::create_dir(&dump_dir).unwrap();
    let base = dump_dir.join("cap");
    let notifier = Arc::new(CollectingNotifier::new());

    let recorder = DumpRecorder::chunked(
        &base,
        ChunkConfig::new(frame_len(4) as u64),
        None,
        RecorderConfig::default(),
        notifier.clone(),
    )
    .unwrap();
    assert_eq!(recorder.record(b"kept").unwrap(), Some(0));

    std::fs::remove_dir_all(&dump_dir).unwrap();

    let err = recorder.record(b"lost").unwrap_err();
    assert!(matches!(err, Error::ChunkOpenFailed { .. }));
    assert!(err.is_terminal());
    assert!(matches!(recorder.status(), RecorderStatus::Failed { .. }));
    assert!(!notifier.matching("Recording stopped").is_empty());
    assert!(!notifier.has_destination());

    assert_eq!(recorder.record(b"ignored").unwrap(), None);
    recorder.enable();
    assert_eq!(recorder.record(b"still ignored").unwrap(), None);
    recorder.close().unwrap();
    assert!(matches!(recorder.status(), RecorderStatus::Failed { .. }));
}

#[test]
fn test_construction_fails_in_missing_dir() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("missing").join("cap");

    let result = DumpRecorder::chunked(
        &base,
        ChunkConfig::for_testing(),
        None,
        RecorderConfig::default(),
        Arc::new(CollectingNotifier::new()),
    );
    assert!(matches!(result, Err(Error::ChunkOpenFailed { .. })));
}

#[test]
fn test_zero_threshold_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let result = DumpRecorder::chunked(
        temp_dir.path().join("cap"),
        ChunkConfig::new(0),
        None,
        RecorderConfig::default(),
        Arc::new(CollectingNotifier::new()),
    );
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
    assert!(list_chunks(temp_dir.path().join("cap")).unwrap().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_chunks_respect_threshold(
        threshold in 21u64..400,
        sizes in prop::collection::vec(0usize..120, 1..40)
    ) {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("prop");

        let recorder = DumpRecorder::chunked(
            &base,
            ChunkConfig::new(threshold),
            None,
            RecorderConfig::default(),
            Arc::new(CollectingNotifier::new()),
        )
        .unwrap();
        for (i, size) in sizes.iter().enumerate() {
            recorder.record(&vec![i as u8; *size]).unwrap();
        }
        recorder.close().unwrap();

        for index in list_chunks(&base).unwrap() {
            let files = ChunkFiles::for_index(&base, index);
            let len = std::fs::metadata(&files.dump).unwrap().len();
            let frames = DumpReader::open(&files.dump).unwrap().records().unwrap().len();
            prop_assert!(frames >= 1);
            prop_assert!(len <= threshold || frames == 1);
        }

        let records = read_chunked(&base).unwrap();
        prop_assert_eq!(records.len(), sizes.len());
        for (i, record) in records.iter().enumerate() {
            prop_assert_eq!(record.sequence, i as u64);
            prop_assert_eq!(record.payload.len(), sizes[i]);
        }
    }
}
