//! Codec Tests
//!
//! Tests for command and response encoding/decoding.

use std::io::Cursor;

use segmentkv::error::KvsError;
use segmentkv::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, Command, CommandType, Response, Status,
    HEADER_SIZE, MAX_PAYLOAD_SIZE,
};

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_create_database_layout() {
    let cmd = Command::CreateDatabase {
        database: "db1".to_string(),
    };
    let encoded = encode_command(&cmd);

    assert_eq!(
        &encoded[..],
        &[0x01, 0, 0, 0, 7, 0, 0, 0, 3, b'd', b'b', b'1']
    );
}

#[test]
fn test_encode_decode_set() {
    let cmd = Command::Set {
        database: "db1".to_string(),
        table: "t1".to_string(),
        key: b"mykey".to_vec(),
        value: b"myvalue".to_vec(),
    };
    let encoded = encode_command(&cmd);

    assert_eq!(encoded[0], CommandType::Set as u8);
    assert_eq!(decode_command(&encoded).unwrap(), cmd);
}

#[test]
fn test_encode_decode_binary_key() {
    let cmd = Command::Get {
        database: "db1".to_string(),
        table: "t1".to_string(),
        key: vec![0x00, 0xff, 0x10],
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();

    match decoded {
        Command::Get { key, .. } => assert_eq!(key, vec![0x00, 0xff, 0x10]),
        _ => panic!("Expected GET command"),
    }
}

#[test]
fn test_decode_unknown_command() {
    let bytes = [0x7f, 0, 0, 0, 0];
    let err = decode_command(&bytes).unwrap_err();
    assert!(matches!(err, KvsError::Protocol(_)));
}

#[test]
fn test_decode_wrong_field_count() {
    // CREATE_TABLE with only one field
    let bytes = [0x02, 0, 0, 0, 7, 0, 0, 0, 3, b'd', b'b', b'1'];
    let err = decode_command(&bytes).unwrap_err();
    assert!(err.to_string().contains("expected 2 fields"));
}

#[test]
fn test_decode_incomplete_header() {
    let err = decode_command(&[0x04, 0, 0]).unwrap_err();
    assert!(matches!(err, KvsError::Protocol(_)));
}

#[test]
fn test_decode_incomplete_payload() {
    let cmd = Command::Delete {
        database: "db1".to_string(),
        table: "t1".to_string(),
        key: b"k".to_vec(),
    };
    let encoded = encode_command(&cmd);

    let err = decode_command(&encoded[..encoded.len() - 1]).unwrap_err();
    assert!(matches!(err, KvsError::Protocol(_)));
}

#[test]
fn test_decode_invalid_utf8_name() {
    let bytes = [0x01, 0, 0, 0, 6, 0, 0, 0, 2, 0xc3, 0x28];
    let err = decode_command(&bytes).unwrap_err();
    assert!(err.to_string().contains("UTF-8"));
}

#[test]
fn test_decode_oversized_payload() {
    let len = (MAX_PAYLOAD_SIZE + 1).to_be_bytes();
    let bytes = [0x04, len[0], len[1], len[2], len[3]];
    let err = decode_command(&bytes).unwrap_err();
    assert!(err.to_string().contains("too large"));
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_response_ok() {
    let response = Response::ok(Some(b"value".to_vec()));
    let encoded = encode_response(&response);

    assert_eq!(encoded.len(), HEADER_SIZE + 5);
    assert_eq!(encoded[0], Status::Ok as u8);
    assert_eq!(decode_response(&encoded).unwrap(), response);
}

#[test]
fn test_response_ok_without_payload_is_null() {
    let response = Response::ok(None);
    assert_eq!(response.status, Status::Null);

    let encoded = encode_response(&response);
    assert_eq!(&encoded[..], &[0x01, 0, 0, 0, 0]);

    let decoded = decode_response(&encoded).unwrap();
    assert_eq!(decoded.payload, None);
}

#[test]
fn test_response_error() {
    let response = Response::error("Table t2 not found");
    let decoded = decode_response(&encode_response(&response)).unwrap();

    assert!(decoded.is_error());
    assert_eq!(decoded.payload_text().as_deref(), Some("Table t2 not found"));
}

#[test]
fn test_decode_unknown_status() {
    let err = decode_response(&[0x09, 0, 0, 0, 0]).unwrap_err();
    assert!(matches!(err, KvsError::Protocol(_)));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_commands_in_sequence() {
    let commands = vec![
        Command::CreateDatabase {
            database: "db1".to_string(),
        },
        Command::CreateTable {
            database: "db1".to_string(),
            table: "t1".to_string(),
        },
        Command::Set {
            database: "db1".to_string(),
            table: "t1".to_string(),
            key: b"a".to_vec(),
            value: b"1".to_vec(),
        },
    ];

    let mut buffer = Vec::new();
    for cmd in &commands {
        write_command(&mut buffer, cmd).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &commands {
        assert_eq!(&read_command(&mut cursor).unwrap(), expected);
    }

    let err = read_command(&mut cursor).unwrap_err();
    assert!(matches!(err, KvsError::Network(_)));
}

#[test]
fn test_stream_responses() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Response::ok(Some(b"1".to_vec()))).unwrap();
    write_response(&mut buffer, &Response::null()).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_response(&mut cursor).unwrap().payload, Some(b"1".to_vec()));
    assert_eq!(read_response(&mut cursor).unwrap().status, Status::Null);
}

#[test]
fn test_command_field_counts() {
    assert_eq!(CommandType::CreateDatabase.field_count(), 1);
    assert_eq!(CommandType::Set.field_count(), 4);
    assert_eq!(CommandType::from_u8(0x05), Some(CommandType::Delete));
    assert_eq!(CommandType::from_u8(0x00), None);

    let get = Command::Get {
        database: "d".to_string(),
        table: "t".to_string(),
        key: b"k".to_vec(),
    };
    assert!(!get.is_mutation());
}
