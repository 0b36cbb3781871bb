//! Segment Tests
//!
//! These tests verify:
//! - Append and point reads through the segment index
//! - The read-only threshold
//! - Replaying a segment file

use std::fs;

use segmentkv::error::KvsError;
use segmentkv::storage::{segment_name, segment_timestamp, Segment};
use tempfile::TempDir;

// =============================================================================
// Naming Tests
// =============================================================================

#[test]
fn test_segment_name_round_trip() {
    let name = segment_name("users", 1_700_000_000_000);
    assert_eq!(name, "users_1700000000000");
    assert_eq!(segment_timestamp(&name), Some(1_700_000_000_000));
}

#[test]
fn test_segment_timestamp_with_underscored_table() {
    assert_eq!(segment_timestamp("user_events_42"), Some(42));
    assert_eq!(segment_timestamp("no-timestamp"), None);
    assert_eq!(segment_timestamp("t_abc"), None);
}

// =============================================================================
// Write / Read Tests
// =============================================================================

#[test]
fn test_create_empty_segment() {
    let temp = TempDir::new().unwrap();

    let segment = Segment::create("t_1", temp.path(), 100).unwrap();

    assert_eq!(segment.size(), 0);
    assert!(!segment.is_read_only());
    assert_eq!(fs::metadata(segment.path()).unwrap().len(), 0);
}

#[test]
fn test_create_existing_segment_fails() {
    let temp = TempDir::new().unwrap();
    Segment::create("t_1", temp.path(), 100).unwrap();

    let err = Segment::create("t_1", temp.path(), 100).unwrap_err();
    assert!(err.is_already_exists());
}

#[test]
fn test_write_then_read() {
    let temp = TempDir::new().unwrap();
    let mut segment = Segment::create("t_1", temp.path(), 1000).unwrap();

    assert!(segment.write(b"a", Some(b"1")).unwrap());
    assert!(segment.write(b"b", Some(b"2")).unwrap());
    assert!(segment.write(b"a", Some(b"3")).unwrap());

    assert_eq!(segment.read(b"a").unwrap(), Some(b"3".to_vec()));
    assert_eq!(segment.read(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(segment.read(b"missing").unwrap(), None);

    assert_eq!(segment.size(), 30);
    assert_eq!(segment.index().get(b"a"), Some(20));
}

#[test]
fn test_tombstone_hides_value() {
    let temp = TempDir::new().unwrap();
    let mut segment = Segment::create("t_1", temp.path(), 1000).unwrap();

    segment.write(b"a", Some(b"1")).unwrap();
    assert!(segment.delete(b"a").unwrap());

    assert_eq!(segment.read(b"a").unwrap(), None);
    assert!(segment.read_at(10).unwrap().is_tombstone());
}

#[test]
fn test_read_only_after_threshold() {
    let temp = TempDir::new().unwrap();
    // One 10-byte record fills it exactly
    let mut segment = Segment::create("t_1", temp.path(), 10).unwrap();

    assert!(segment.write(b"a", Some(b"1")).unwrap());
    assert!(segment.is_read_only());

    assert!(!segment.write(b"b", Some(b"2")).unwrap());
    assert!(!segment.delete(b"a").unwrap());
    assert_eq!(segment.size(), 10);
    assert_eq!(fs::metadata(segment.path()).unwrap().len(), 10);
}

#[test]
fn test_oversized_append_is_accepted() {
    let temp = TempDir::new().unwrap();
    let mut segment = Segment::create("t_1", temp.path(), 5).unwrap();

    assert!(segment.write(b"key", Some(b"a long value")).unwrap());
    assert_eq!(segment.size(), 23);
    assert!(segment.is_read_only());
    assert_eq!(segment.read(b"key").unwrap(), Some(b"a long value".to_vec()));
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_replay_rebuilds_index() {
    let temp = TempDir::new().unwrap();
    {
        let mut segment = Segment::create("t_1", temp.path(), 1000).unwrap();
        segment.write(b"a", Some(b"1")).unwrap();
        segment.write(b"b", Some(b"2")).unwrap();
        segment.write(b"a", Some(b"3")).unwrap();
        segment.delete(b"b").unwrap();
    }

    let (segment, keys) = Segment::replay("t_1", temp.path(), 1000).unwrap();

    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"a".to_vec(), b"b".to_vec()]);
    assert_eq!(segment.size(), 39);
    assert_eq!(segment.read(b"a").unwrap(), Some(b"3".to_vec()));
    assert_eq!(segment.read(b"b").unwrap(), None);
}

#[test]
fn test_replay_truncated_file_fails() {
    let temp = TempDir::new().unwrap();
    {
        let mut segment = Segment::create("t_1", temp.path(), 1000).unwrap();
        segment.write(b"a", Some(b"1")).unwrap();
    }
    let path = temp.path().join("t_1");
    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(&[0, 0, 0, 4, b'x']);
    fs::write(&path, bytes).unwrap();

    let err = Segment::replay("t_1", temp.path(), 1000).unwrap_err();
    assert!(matches!(err, KvsError::Corrupt { offset: 10, .. }));
}

#[test]
fn test_replay_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let err = Segment::replay("t_404", temp.path(), 1000).unwrap_err();
    assert!(err.is_not_found());
}

// =============================================================================
// Failed Append Tests
// =============================================================================

#[cfg(target_os = "linux")]
#[test]
fn test_failed_append_that_cannot_roll_back_seals_segment() {
    use std::os::unix::fs::symlink;
    use std::path::Path;

    if !Path::new("/dev/full").exists() {
        return;
    }

    let temp = TempDir::new().unwrap();
    let mut segment = Segment::create("t_1", temp.path(), 1000).unwrap();
    segment.write(b"a", Some(b"1")).unwrap();

    // Every write fails with ENOSPC and the device cannot be truncated
    fs::remove_file(segment.path()).unwrap();
    symlink("/dev/full", segment.path()).unwrap();

    let err = segment.write(b"b", Some(b"2")).unwrap_err();
    assert!(matches!(err, KvsError::Io { .. }));

    assert_eq!(segment.size(), 10);
    assert_eq!(segment.index().get(b"b"), None);
    assert!(segment.is_read_only());
    assert!(!segment.write(b"c", Some(b"3")).unwrap());
    assert_eq!(segment.size(), 10);
}
