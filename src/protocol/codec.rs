//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload
//! A sequence of fields, each `field_len (4 bytes) + bytes`:
//! - CREATE_DATABASE: database
//! - CREATE_TABLE:    database, table
//! - SET:             database, table, key, value
//! - GET:             database, table, key
//! - DELETE:          database, table, key
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Command, CommandType, Response, Status};
use crate::error::{KvsError, Result};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Bytes {
    let fields: Vec<&[u8]> = match command {
        Command::CreateDatabase { database } => vec![database.as_bytes()],
        Command::CreateTable { database, table } => vec![database.as_bytes(), table.as_bytes()],
        Command::Set {
            database,
            table,
            key,
            value,
        } => vec![database.as_bytes(), table.as_bytes(), key, value],
        Command::Get { database, table, key } | Command::Delete { database, table, key } => {
            vec![database.as_bytes(), table.as_bytes(), key]
        }
    };

    let payload_len: usize = fields.iter().map(|f| 4 + f.len()).sum();

    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload_len);
    message.put_u8(command.command_type() as u8);
    message.put_u32(payload_len as u32);
    for field in fields {
        message.put_u32(field.len() as u32);
        message.put_slice(field);
    }

    message.freeze()
}

/// Decode a command from a complete frame
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_byte, payload) = split_frame(bytes, "command")?;

    let command_type = CommandType::from_u8(cmd_byte).ok_or_else(|| {
        KvsError::Protocol(format!("Unknown command type: 0x{:02x}", cmd_byte))
    })?;

    let fields = decode_fields(payload)?;
    if fields.len() != command_type.field_count() {
        return Err(KvsError::Protocol(format!(
            "{:?} command: expected {} fields, got {}",
            command_type,
            command_type.field_count(),
            fields.len()
        )));
    }

    let mut fields = fields.into_iter();
    let mut next = || fields.next().unwrap_or_default();

    let command = match command_type {
        CommandType::CreateDatabase => Command::CreateDatabase {
            database: into_name(next(), "database")?,
        },
        CommandType::CreateTable => Command::CreateTable {
            database: into_name(next(), "database")?,
            table: into_name(next(), "table")?,
        },
        CommandType::Set => Command::Set {
            database: into_name(next(), "database")?,
            table: into_name(next(), "table")?,
            key: next(),
            value: next(),
        },
        CommandType::Get => Command::Get {
            database: into_name(next(), "database")?,
            table: into_name(next(), "table")?,
            key: next(),
        },
        CommandType::Delete => Command::Delete {
            database: into_name(next(), "database")?,
            table: into_name(next(), "table")?,
            key: next(),
        },
    };

    Ok(command)
}

/// Split a payload into its length-prefixed fields
fn decode_fields(mut payload: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut fields = Vec::new();

    while payload.has_remaining() {
        if payload.remaining() < 4 {
            return Err(KvsError::Protocol(format!(
                "Truncated field length: {} trailing bytes",
                payload.remaining()
            )));
        }
        let len = payload.get_u32() as usize;

        if payload.remaining() < len {
            return Err(KvsError::Protocol(format!(
                "Incomplete field: expected {} bytes, got {}",
                len,
                payload.remaining()
            )));
        }
        fields.push(payload[..len].to_vec());
        payload.advance(len);
    }

    Ok(fields)
}

fn into_name(field: Vec<u8>, what: &str) -> Result<String> {
    String::from_utf8(field)
        .map_err(|_| KvsError::Protocol(format!("{} name is not valid UTF-8", what)))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Bytes {
    let payload = response.payload.as_deref().unwrap_or(&[]);

    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(response.status as u8);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);

    message.freeze()
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::Null,
        0x02 => Status::Error,
        _ => {
            return Err(KvsError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let payload = match status {
        Status::Null => None,
        Status::Ok | Status::Error => Some(payload.to_vec()),
    };

    Ok(Response { status, payload })
}

/// Validate the header of a frame and return (type byte, payload)
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(KvsError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(KvsError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = HEADER_SIZE + payload_len as usize;
    if bytes.len() < total_len {
        return Err(KvsError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).map_err(KvsError::Network)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(KvsError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut frame = vec![0u8; HEADER_SIZE + payload_len as usize];
    frame[..HEADER_SIZE].copy_from_slice(&header);
    reader
        .read_exact(&mut frame[HEADER_SIZE..])
        .map_err(KvsError::Network)?;

    Ok(frame)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer
        .write_all(&encode_command(command))
        .and_then(|_| writer.flush())
        .map_err(KvsError::Network)
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer
        .write_all(&encode_response(response))
        .and_then(|_| writer.flush())
        .map_err(KvsError::Network)
}
