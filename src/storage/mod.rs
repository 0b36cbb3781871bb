//! Storage Module
//!
//! Segmented, append-only storage for databases and their tables.
//!
//! ## Responsibilities
//! - Frame records on disk (set or tombstone)
//! - Append records to the active segment of a table, rolling to a new
//!   segment once the active one is full
//! - Keep per-segment and per-table indices in memory for point reads
//! - Cache recently used values per table
//!
//! ## On-disk Layout
//! ```text
//! {working_path}/
//!   └── {database}/
//!         └── {table}/
//!               ├── {table}_1700000000000   (sealed)
//!               ├── {table}_1700000004211   (sealed)
//!               └── {table}_1700000009876   (active)
//! ```
//!
//! ## Segment File Format
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Record 1                                         │
//! │ ┌────────────┬─────┬────────────┬──────────────┐ │
//! │ │KeyLen i32  │ Key │ValLen i32  │ Value        │ │
//! │ └────────────┴─────┴────────────┴──────────────┘ │
//! ├──────────────────────────────────────────────────┤
//! │ Record 2 ... (ValLen = -1 means tombstone)       │
//! └──────────────────────────────────────────────────┘
//! ```
//! No header, footer or magic: end of file ends the segment.

mod cache;
mod database;
mod index;
mod lru;
mod record;
mod segment;
mod table;

pub use cache::CachingTable;
pub use database::Database;
pub use index::{KeyIndex, SegmentId, SegmentIndex, SegmentOffset, TableIndex};
pub use lru::LruCache;
pub use record::{DecodeError, Record, RecordReader, MAX_FIELD_LEN, TOMBSTONE_MARKER};
pub use segment::{segment_name, segment_timestamp, Segment};

pub use table::LogTable;

use crate::error::{Entity, KvsError, Result};

/// Key-value operations shared by a plain table and its caching decorator
pub trait Table {
    fn name(&self) -> &str;

    /// Set `key` to `value`
    fn write(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Newest value of `key`, `None` if never written or deleted.
    /// Takes `&mut self` because readers may update cache recency.
    fn read(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Mark `key` as deleted
    fn delete(&mut self, key: &[u8]) -> Result<()>;
}

/// Longest file name most filesystems accept, in bytes
pub const MAX_NAME_LEN: usize = 255;

/// Room a segment name needs after its table name: `_` plus a u64 timestamp
const SEGMENT_SUFFIX_LEN: usize = 1 + 20;

/// Database and table names become directory names, so they must be a single
/// non-empty path component. A table name must also leave room for the
/// segment suffix, since its segment files are named after it.
pub(crate) fn validate_name(entity: Entity, name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(|c| c == '/' || c == '\\' || c == '\0');

    if invalid {
        return Err(KvsError::InvalidArgument(format!(
            "{} name '{}' is not a valid directory name",
            entity, name
        )));
    }

    let max_len = match entity {
        Entity::Table => MAX_NAME_LEN - SEGMENT_SUFFIX_LEN,
        _ => MAX_NAME_LEN,
    };
    if name.len() > max_len {
        return Err(KvsError::InvalidArgument(format!(
            "{} name is {} bytes long, the limit is {}",
            entity,
            name.len(),
            max_len
        )));
    }
    Ok(())
}
