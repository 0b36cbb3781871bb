//! Log-structured table
//!
//! A table is a directory of segments. Writes and deletes always go to the
//! newest ("active") segment; when it fills up a fresh segment takes its
//! place and the old one is sealed for good. The table index remembers which
//! segment owns the newest record for each key, so a read costs one index
//! lookup plus one file read.

use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Entity, KvsError, Result};

use super::index::{SegmentId, TableIndex};
use super::segment::{segment_name, segment_timestamp, Segment};
use super::{validate_name, Table};

/// A table backed by an ordered run of segment files
#[derive(Debug)]
pub struct LogTable {
    name: String,
    path: PathBuf,
    segment_size: u64,
    /// Sealed segments, oldest first. Segment ids index into this vector,
    /// with `sealed.len()` naming the active segment.
    sealed: Vec<Segment>,
    active: Segment,
    index: TableIndex,
}

impl LogTable {
    /// Create the table directory under `database_dir` and its first segment
    pub fn create(name: &str, database_dir: &Path, segment_size: u64) -> Result<Self> {
        validate_name(Entity::Table, name)?;
        validate_segment_size(segment_size)?;

        let path = database_dir.join(name);
        fs::create_dir(&path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => KvsError::already_exists(Entity::Table, name),
            _ => KvsError::io(&path, e),
        })?;

        let active = match Segment::create(
            &segment_name(name, next_timestamp(None)),
            &path,
            segment_size,
        ) {
            Ok(segment) => segment,
            Err(e) => {
                // Recovery would hit the same error giving an empty table directory its first segment
                if let Err(remove_err) = fs::remove_dir(&path) {
                    tracing::error!(
                        "Failed to remove table directory {} after a failed create: {}",
                        path.display(),
                        remove_err
                    );
                }
                return Err(e);
            }
        };

        tracing::debug!("Created table {} at {}", name, path.display());

        Ok(Self {
            name: name.to_string(),
            path,
            segment_size,
            sealed: Vec::new(),
            active,
            index: TableIndex::new(),
        })
    }

    /// Assemble a table from segments rebuilt by recovery.
    ///
    /// `segments` must be in creation order and `index` must refer to their
    /// positions. The last segment becomes active; it keeps accepting writes
    /// while it is below the size threshold. A table without segments gets a
    /// fresh one.
    pub fn from_segments(
        name: &str,
        path: &Path,
        segment_size: u64,
        mut segments: Vec<Segment>,
        index: TableIndex,
    ) -> Result<Self> {
        validate_segment_size(segment_size)?;

        let active = match segments.pop() {
            Some(segment) => segment,
            None => Segment::create(
                &segment_name(name, next_timestamp(None)),
                path,
                segment_size,
            )?,
        };

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            segment_size,
            sealed: segments,
            active,
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn segment_size(&self) -> u64 {
        self.segment_size
    }

    /// Number of segments, sealed and active
    pub fn segment_count(&self) -> usize {
        self.sealed.len() + 1
    }

    pub fn active_segment(&self) -> &Segment {
        &self.active
    }

    /// All segments in creation order
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.sealed.iter().chain(std::iter::once(&self.active))
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        if id == self.sealed.len() {
            Some(&self.active)
        } else {
            self.sealed.get(id)
        }
    }

    pub fn index(&self) -> &TableIndex {
        &self.index
    }

    fn active_id(&self) -> SegmentId {
        self.sealed.len()
    }

    /// Seal the active segment and start a new one
    fn roll_over(&mut self) -> Result<()> {
        let created_at = next_timestamp(segment_timestamp(self.active.name()));
        let fresh = Segment::create(
            &segment_name(&self.name, created_at),
            &self.path,
            self.segment_size,
        )?;

        let sealed = mem::replace(&mut self.active, fresh);
        tracing::debug!(
            "Table {}: sealed segment {} at {} bytes, now writing to {}",
            self.name,
            sealed.name(),
            sealed.size(),
            self.active.name()
        );
        self.sealed.push(sealed);

        Ok(())
    }

    /// Append a value or tombstone to the active segment, rolling over first
    /// if it is full, and point the key at the segment that took it.
    fn append(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        if self.active.is_read_only() {
            self.roll_over()?;
        }

        debug_assert!(!self.active.is_read_only());

        // Not expected: the active segment was checked just above.
        if !self.active.write(key, value)? {
            tracing::warn!(
                "Table {}: segment {} refused an append, rolling over",
                self.name,
                self.active.name()
            );
            self.roll_over()?;

            if !self.active.write(key, value)? {
                return Err(KvsError::InvalidArgument(format!(
                    "fresh segment {} of table {} refused an append",
                    self.active.name(),
                    self.name
                )));
            }
        }

        let active_id = self.active_id();
        self.index.on_updated(key, active_id);
        Ok(())
    }
}

impl Table for LogTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.append(key, Some(value))
    }

    /// Resolves through the table index only: once a tombstone owns the key,
    /// older segments are never consulted.
    fn read(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let owner = match self.index.get(key) {
            Some(id) => id,
            None => return Ok(None),
        };

        match self.segment(owner) {
            Some(segment) => segment.read(key),
            None => Err(KvsError::not_found(
                Entity::Segment,
                format!("#{} of table {}", owner, self.name),
            )),
        }
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.append(key, None)
    }
}

fn validate_segment_size(segment_size: u64) -> Result<()> {
    if segment_size == 0 {
        return Err(KvsError::InvalidArgument(
            "segment size must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Current epoch millis, forced past `previous` so segment names stay unique
/// and sorted even when two segments are created within one millisecond.
fn next_timestamp(previous: Option<u64>) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    match previous {
        Some(prev) if now <= prev => prev + 1,
        _ => now,
    }
}
