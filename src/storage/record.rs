//! Record codec
//!
//! Binary framing of a single log entry. All integers are big-endian.
//!
//! ```text
//! ┌──────────────┬───────────┬────────────────┬─────────────┐
//! │ KeyLen: i32  │ Key bytes │ ValueLen: i32  │ Value bytes │
//! └──────────────┴───────────┴────────────────┴─────────────┘
//! ValueLen == -1 marks a tombstone, no value bytes follow.
//! ```

use std::io::{self, Read};

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Sentinel value length marking a tombstone
pub const TOMBSTONE_MARKER: i32 = -1;

/// Size of each length field
pub const LENGTH_FIELD_SIZE: u64 = 4;

/// Largest key or value that fits in a length field
pub const MAX_FIELD_LEN: usize = i32::MAX as usize;

/// Failure to decode a record from a byte stream
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected end of input while reading {field}")]
    Truncated { field: &'static str },

    #[error("invalid {field} length {len}")]
    InvalidLength { field: &'static str, len: i32 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One entry of a segment file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A key set to a value
    Set { key: Vec<u8>, value: Vec<u8> },

    /// A delete marker for a key
    Tombstone { key: Vec<u8> },
}

impl Record {
    pub fn set(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Record::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Record::Tombstone { key: key.into() }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            Record::Set { key, .. } | Record::Tombstone { key } => key,
        }
    }

    /// The value, `None` for a tombstone
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Record::Set { value, .. } => Some(value),
            Record::Tombstone { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<Vec<u8>> {
        match self {
            Record::Set { value, .. } => Some(value),
            Record::Tombstone { .. } => None,
        }
    }

    pub fn into_key(self) -> Vec<u8> {
        match self {
            Record::Set { key, .. } | Record::Tombstone { key } => key,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Record::Tombstone { .. })
    }

    /// Number of bytes `encode` produces
    pub fn encoded_size(&self) -> u64 {
        let value_len = self.value().map_or(0, |v| v.len() as u64);
        LENGTH_FIELD_SIZE + self.key().len() as u64 + LENGTH_FIELD_SIZE + value_len
    }

    /// Append the encoded record to `buf`.
    ///
    /// Key and value lengths must not exceed [`MAX_FIELD_LEN`]; callers that
    /// accept external input check this before encoding.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_size() as usize);

        let key = self.key();
        buf.put_i32(key.len() as i32);
        buf.put_slice(key);

        match self.value() {
            Some(value) => {
                buf.put_i32(value.len() as i32);
                buf.put_slice(value);
            }
            None => buf.put_i32(TOMBSTONE_MARKER),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_size() as usize);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Decode the next record from `reader`.
    ///
    /// Returns `Ok(None)` when the input ends exactly on a record boundary.
    /// Running out of input anywhere else is `DecodeError::Truncated`.
    pub fn decode<R: Read>(reader: &mut R) -> Result<Option<Record>, DecodeError> {
        let key_len = match read_length(reader, "key length", true)? {
            Some(len) => len,
            None => return Ok(None),
        };
        if key_len < 0 {
            return Err(DecodeError::InvalidLength {
                field: "key",
                len: key_len,
            });
        }
        let key = read_field(reader, key_len as u64, "key")?;

        let value_len = match read_length(reader, "value length", false)? {
            Some(len) => len,
            None => return Err(DecodeError::Truncated { field: "value length" }),
        };
        if value_len == TOMBSTONE_MARKER {
            return Ok(Some(Record::Tombstone { key }));
        }
        if value_len < 0 {
            return Err(DecodeError::InvalidLength {
                field: "value",
                len: value_len,
            });
        }
        let value = read_field(reader, value_len as u64, "value")?;

        Ok(Some(Record::Set { key, value }))
    }
}

/// Read a 4-byte length. With `at_boundary`, zero bytes available means the
/// stream ended cleanly and `None` is returned.
fn read_length<R: Read>(
    reader: &mut R,
    field: &'static str,
    at_boundary: bool,
) -> Result<Option<i32>, DecodeError> {
    let mut buf = [0u8; 4];
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DecodeError::Io(e)),
        }
    }

    match filled {
        0 if at_boundary => Ok(None),
        4 => Ok(Some(i32::from_be_bytes(buf))),
        _ => Err(DecodeError::Truncated { field }),
    }
}

/// Read exactly `len` bytes without trusting `len` for the allocation size.
fn read_field<R: Read>(reader: &mut R, len: u64, field: &'static str) -> Result<Vec<u8>, DecodeError> {
    let mut data = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut data)?;

    if data.len() as u64 != len {
        return Err(DecodeError::Truncated { field });
    }
    Ok(data)
}

/// Sequential reader over a stream of records that tracks where each one
/// starts.
pub struct RecordReader<R> {
    reader: R,
    /// Offset of the next record
    offset: u64,
    /// Set after the end of input or the first error
    finished: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            finished: false,
        }
    }

    /// Offset just past the last successfully decoded record
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Decode the next record together with its start offset
    pub fn next_record(&mut self) -> Result<Option<(u64, Record)>, DecodeError> {
        if self.finished {
            return Ok(None);
        }

        match Record::decode(&mut self.reader) {
            Ok(Some(record)) => {
                let start = self.offset;
                self.offset += record.encoded_size();
                Ok(Some((start, record)))
            }
            Ok(None) => {
                self.finished = true;
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    /// (start offset, record)
    type Item = Result<(u64, Record), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
