//! Startup recovery
//!
//! Rebuilds every database, table and segment from the working directory
//! without any write traffic. The walk is depth-first:
//!
//! ```text
//! Root ──► Database ──► Table ──► Segment
//!  │          │           │          └─ decode records, build offset index
//!  │          │           └─ fold segment keys into the table index,
//!  │          │              last segment becomes active
//!  │          └─ register each table
//!  └─ register each database in the environment
//! ```
//!
//! Segments are replayed oldest first so that a later write to a key
//! overwrites the index entry left by an earlier one. Any failure aborts the
//! whole recovery.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::StorageOptions;
use crate::env::ExecutionEnvironment;
use crate::error::{Entity, KvsError, Result};
use crate::storage::{segment_timestamp, Database, LogTable, Segment, TableIndex};

/// Counters gathered while recovering
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    pub databases: usize,
    pub tables: usize,
    pub segments: usize,
    /// Total bytes replayed across all segments
    pub bytes: u64,
}

/// What the root level needs
#[derive(Debug, Clone)]
pub struct RootContext {
    pub working_path: PathBuf,
    pub options: StorageOptions,
}

/// What the database level needs
#[derive(Debug, Clone)]
pub struct DatabaseContext {
    pub name: String,
    pub path: PathBuf,
    pub options: StorageOptions,
}

/// What the table level needs
#[derive(Debug, Clone)]
pub struct TableContext {
    pub name: String,
    pub path: PathBuf,
    pub segment_size: u64,
}

/// What the segment level needs
#[derive(Debug, Clone, Copy)]
pub struct SegmentContext<'a> {
    pub name: &'a str,
    pub table_dir: &'a Path,
    pub capacity: u64,
}

impl RootContext {
    fn database(&self, name: &str) -> DatabaseContext {
        DatabaseContext {
            name: name.to_string(),
            path: self.working_path.join(name),
            options: self.options,
        }
    }
}

impl DatabaseContext {
    fn table(&self, name: &str) -> TableContext {
        TableContext {
            name: name.to_string(),
            path: self.path.join(name),
            segment_size: self.options.segment_size,
        }
    }
}

impl TableContext {
    fn segment<'a>(&'a self, name: &'a str) -> SegmentContext<'a> {
        SegmentContext {
            name,
            table_dir: &self.path,
            capacity: self.segment_size,
        }
    }
}

/// Recover everything under the environment's working directory and
/// register each database with it. A missing working directory is created.
pub fn recover(env: &ExecutionEnvironment) -> Result<RecoveryReport> {
    let root = RootContext {
        working_path: env.working_path().to_path_buf(),
        options: env.options(),
    };

    fs::create_dir_all(&root.working_path).map_err(|e| KvsError::io(&root.working_path, e))?;

    let mut report = RecoveryReport::default();
    for name in list_entries(&root.working_path, EntryKind::Directory)? {
        let database = recover_database(&root.database(&name))?;

        report.databases += 1;
        for table_name in database.table_names() {
            if let Some(table) = database.table(&table_name) {
                report.tables += 1;
                for segment in table.inner().segments() {
                    report.segments += 1;
                    report.bytes += segment.size();
                }
            }
        }

        env.add_database(database);
    }

    tracing::info!(
        "Recovered {} databases, {} tables, {} segments ({} bytes) from {}",
        report.databases,
        report.tables,
        report.segments,
        report.bytes,
        root.working_path.display()
    );

    Ok(report)
}

/// Rebuild one database and all of its tables
pub fn recover_database(ctx: &DatabaseContext) -> Result<Database> {
    let mut tables = Vec::new();
    for name in list_entries(&ctx.path, EntryKind::Directory)? {
        tables.push(recover_table(&ctx.table(&name))?);
    }

    tracing::info!("Recovered database {} with {} tables", ctx.name, tables.len());

    Ok(Database::with_tables(&ctx.name, ctx.path.clone(), ctx.options, tables))
}

/// Rebuild one table by replaying its segments in creation order
pub fn recover_table(ctx: &TableContext) -> Result<LogTable> {
    let mut names = list_entries(&ctx.path, EntryKind::File)?;
    names.sort_by(|a, b| (segment_timestamp(a), a).cmp(&(segment_timestamp(b), b)));

    let mut segments = Vec::with_capacity(names.len());
    let mut index = TableIndex::new();

    for name in &names {
        let (segment, keys) = recover_segment(&ctx.segment(name))?;

        let id = segments.len();
        for key in &keys {
            index.on_updated(key, id);
        }
        segments.push(segment);
    }

    let table = LogTable::from_segments(&ctx.name, &ctx.path, ctx.segment_size, segments, index)?;

    tracing::debug!(
        "Recovered table {}: {} segments, {} keys, active segment {} ({} bytes)",
        ctx.name,
        table.segment_count(),
        table.index().len(),
        table.active_segment().name(),
        table.active_segment().size()
    );

    Ok(table)
}

/// Replay one segment file. Returns the segment and every key it holds, in
/// file order.
pub fn recover_segment(ctx: &SegmentContext<'_>) -> Result<(Segment, Vec<Vec<u8>>)> {
    Segment::replay(ctx.name, ctx.table_dir, ctx.capacity)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    File,
}

/// Names of the entries of `dir`, sorted. Every entry must be of `kind`.
fn list_entries(dir: &Path, kind: EntryKind) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(KvsError::not_found(Entity::Directory, dir.display().to_string()));
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| KvsError::io(dir, e))? {
        let entry = entry.map_err(|e| KvsError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| KvsError::io(&path, e))?;

        let matches = match kind {
            EntryKind::Directory => file_type.is_dir(),
            EntryKind::File => file_type.is_file(),
        };
        if !matches {
            return Err(KvsError::InvalidArgument(format!(
                "unexpected entry {} while recovering, expected a {}",
                path.display(),
                if kind == EntryKind::Directory { "directory" } else { "segment file" }
            )));
        }

        let name = entry.file_name().into_string().map_err(|raw| {
            KvsError::InvalidArgument(format!("non UTF-8 name {:?} in {}", raw, dir.display()))
        })?;
        names.push(name);
    }

    names.sort();
    Ok(names)
}
