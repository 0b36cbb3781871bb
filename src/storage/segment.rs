//! Segment
//!
//! An append-only file of records belonging to one table. A segment tracks
//! its running size and becomes read-only for good once that size reaches
//! its capacity. No file handle is kept between operations: every append or
//! read opens the file, performs one unit of I/O and drops the handle.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Entity, KvsError, Result};

use super::index::{SegmentIndex, SegmentOffset};
use super::record::{DecodeError, Record, RecordReader, MAX_FIELD_LEN};

/// Build a segment file name: `<table>_<epoch_millis>`
pub fn segment_name(table_name: &str, created_at_millis: u64) -> String {
    format!("{}_{}", table_name, created_at_millis)
}

/// Parse the creation timestamp out of a segment file name.
/// "users_1700000000000" → Some(1700000000000)
pub fn segment_timestamp(name: &str) -> Option<u64> {
    let (_, millis) = name.rsplit_once('_')?;
    millis.parse().ok()
}

/// One append-only log file
#[derive(Debug)]
pub struct Segment {
    name: String,
    path: PathBuf,
    /// Offset where the next record will start (= bytes written so far)
    offset: SegmentOffset,
    /// Size at which the segment turns read-only
    capacity: u64,
    /// Set when a failed append could not be rolled back; the file may end
    /// in a partial record, so nothing more is appended to it
    sealed: bool,
    index: SegmentIndex,
}

impl Segment {
    /// Create a new, empty segment file under `table_dir`
    ///
    /// Fails with `AlreadyExists` if a file with that name is already there.
    pub fn create(name: &str, table_dir: &Path, capacity: u64) -> Result<Self> {
        let path = table_dir.join(name);

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => KvsError::already_exists(Entity::Segment, name),
                _ => KvsError::io(&path, e),
            })?;

        Ok(Self {
            name: name.to_string(),
            path,
            offset: 0,
            capacity,
            sealed: false,
            index: SegmentIndex::new(),
        })
    }

    /// Rebuild a segment by decoding its file from the start.
    ///
    /// Returns the segment, with its index and size taken from the replay,
    /// and every key seen in file order (duplicates included).
    pub fn replay(name: &str, table_dir: &Path, capacity: u64) -> Result<(Self, Vec<Vec<u8>>)> {
        let path = table_dir.join(name);

        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => KvsError::not_found(Entity::Segment, path.display().to_string()),
            _ => KvsError::io(&path, e),
        })?;

        let mut reader = RecordReader::new(BufReader::new(file));
        let mut index = SegmentIndex::new();
        let mut keys = Vec::new();

        loop {
            match reader.next_record() {
                Ok(Some((offset, record))) => {
                    index.on_updated(record.key(), offset);
                    keys.push(record.into_key());
                }
                Ok(None) => break,
                Err(e) => return Err(KvsError::decode(&path, reader.offset(), e)),
            }
        }

        let segment = Self {
            name: name.to_string(),
            path,
            offset: reader.offset(),
            capacity,
            sealed: false,
            index,
        };

        Ok((segment, keys))
    }

    /// Write a value, or a tombstone when `value` is `None`.
    ///
    /// Returns `Ok(false)` without touching the file if the segment is
    /// read-only; the caller has to move on to a new segment.
    pub fn write(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<bool> {
        match value {
            Some(value) => self.append(&Record::set(key, value)),
            None => self.delete(key),
        }
    }

    /// Append a tombstone for `key`. Same read-only rule as [`Segment::write`].
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        self.append(&Record::tombstone(key))
    }

    /// Read the newest value this segment holds for `key`.
    ///
    /// `None` if the key was never written here or its last record is a
    /// tombstone.
    pub fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.index.get(key) {
            Some(offset) => Ok(self.read_at(offset)?.into_value()),
            None => Ok(None),
        }
    }

    /// Decode the single record starting at `offset`
    pub fn read_at(&self, offset: SegmentOffset) -> Result<Record> {
        let mut file = File::open(&self.path).map_err(|e| KvsError::io(&self.path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| KvsError::io(&self.path, e))?;

        let mut reader = BufReader::new(file);
        match Record::decode(&mut reader) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(KvsError::decode(
                &self.path,
                offset,
                DecodeError::Truncated { field: "record" },
            )),
            Err(e) => Err(KvsError::decode(&self.path, offset, e)),
        }
    }

    /// True once the running size has reached the capacity, or after a
    /// failed append left bytes that could not be truncated away.
    ///
    /// Checked before each append, so the append that crosses the threshold
    /// still succeeds and only the next one is refused.
    pub fn is_read_only(&self) -> bool {
        self.sealed || self.offset >= self.capacity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far
    pub fn size(&self) -> u64 {
        self.offset
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn index(&self) -> &SegmentIndex {
        &self.index
    }

    fn append(&mut self, record: &Record) -> Result<bool> {
        if self.is_read_only() {
            return Ok(false);
        }

        if record.key().len() > MAX_FIELD_LEN || record.value().map_or(0, <[u8]>::len) > MAX_FIELD_LEN {
            return Err(KvsError::InvalidArgument(format!(
                "record for segment {} exceeds the {} byte field limit",
                self.name, MAX_FIELD_LEN
            )));
        }

        let bytes = record.encode();

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| KvsError::io(&self.path, e))?;

        if let Err(e) = file.write_all(&bytes) {
            // Drop whatever part of the record made it to disk so the file
            // keeps ending on a record boundary.
            if let Err(truncate_err) = file.set_len(self.offset) {
                tracing::error!(
                    "Failed to roll back partial append to {}, sealing it: {}",
                    self.path.display(),
                    truncate_err
                );
                self.sealed = true;
            }
            return Err(KvsError::io(&self.path, e));
        }

        self.index.on_updated(record.key(), self.offset);
        self.offset += bytes.len() as u64;

        Ok(true)
    }
}
