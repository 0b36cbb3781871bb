//! Record Tests
//!
//! These tests verify:
//! - Exact on-disk byte layout of set and tombstone records
//! - Sequential decoding with offsets
//! - Truncated and malformed input

use std::io::Cursor;

use segmentkv::storage::{DecodeError, Record, RecordReader};

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_set_record_layout() {
    let record = Record::set(b"a".to_vec(), b"1".to_vec());
    let encoded = record.encode();

    assert_eq!(&encoded[..], &[0, 0, 0, 1, b'a', 0, 0, 0, 1, b'1']);
    assert_eq!(record.encoded_size(), 10);
}

#[test]
fn test_tombstone_layout() {
    let record = Record::tombstone(b"key".to_vec());
    let encoded = record.encode();

    assert_eq!(
        &encoded[..],
        &[0, 0, 0, 3, b'k', b'e', b'y', 0xff, 0xff, 0xff, 0xff]
    );
    assert!(record.is_tombstone());
    assert_eq!(record.value(), None);
}

#[test]
fn test_empty_value_is_not_tombstone() {
    let record = Record::set(b"k".to_vec(), Vec::new());
    let encoded = record.encode();

    assert_eq!(&encoded[..], &[0, 0, 0, 1, b'k', 0, 0, 0, 0]);

    let decoded = Record::decode(&mut Cursor::new(encoded.to_vec()))
        .unwrap()
        .unwrap();
    assert!(!decoded.is_tombstone());
    assert_eq!(decoded.value(), Some(&b""[..]));
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_empty_input() {
    let decoded = Record::decode(&mut Cursor::new(Vec::new())).unwrap();
    assert!(decoded.is_none());
}

#[test]
fn test_reader_reports_offsets() {
    let mut data = Vec::new();
    data.extend_from_slice(&Record::set(b"a".to_vec(), b"1".to_vec()).encode());
    data.extend_from_slice(&Record::set(b"bb".to_vec(), b"22".to_vec()).encode());
    data.extend_from_slice(&Record::tombstone(b"a".to_vec()).encode());

    let records: Vec<(u64, Record)> = RecordReader::new(Cursor::new(data))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0], (0, Record::set(b"a".to_vec(), b"1".to_vec())));
    assert_eq!(records[1], (10, Record::set(b"bb".to_vec(), b"22".to_vec())));
    assert_eq!(records[2], (22, Record::tombstone(b"a".to_vec())));
}

#[test]
fn test_truncated_value_is_error() {
    let encoded = Record::set(b"key".to_vec(), b"value".to_vec()).encode();
    let truncated = encoded[..encoded.len() - 2].to_vec();

    let err = Record::decode(&mut Cursor::new(truncated)).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { field: "value" }));
}

#[test]
fn test_truncated_length_is_error() {
    let err = Record::decode(&mut Cursor::new(vec![0, 0])).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { .. }));
}

#[test]
fn test_missing_value_length_is_error() {
    let err = Record::decode(&mut Cursor::new(vec![0, 0, 0, 1, b'k'])).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { field: "value length" }));
}

#[test]
fn test_negative_key_length_is_error() {
    let data = (-5i32).to_be_bytes().to_vec();
    let err = Record::decode(&mut Cursor::new(data)).unwrap_err();
    assert!(matches!(err, DecodeError::InvalidLength { field: "key", len: -5 }));
}

#[test]
fn test_reader_stops_after_error() {
    let mut data = Record::set(b"a".to_vec(), b"1".to_vec()).encode().to_vec();
    data.extend_from_slice(&[0, 0, 0, 9, b'x']);

    let mut reader = RecordReader::new(Cursor::new(data));
    assert!(reader.next_record().unwrap().is_some());
    assert!(reader.next_record().is_err());
    assert_eq!(reader.offset(), 10);
    assert!(reader.next_record().unwrap().is_none());
}
