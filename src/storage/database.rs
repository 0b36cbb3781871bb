//! Database
//!
//! A named directory of tables. Tables are created on request and every
//! key operation is routed to its table by name.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::StorageOptions;
use crate::error::{Entity, KvsError, Result};

use super::cache::CachingTable;
use super::table::LogTable;
use super::{validate_name, Table};

/// A named collection of tables
#[derive(Debug)]
pub struct Database {
    name: String,
    path: PathBuf,
    options: StorageOptions,
    tables: HashMap<String, CachingTable<LogTable>>,
}

impl Database {
    /// Create the database directory `<root_dir>/<name>`.
    ///
    /// Fails with `AlreadyExists` if the directory is already there.
    pub fn create(name: &str, root_dir: &Path, options: StorageOptions) -> Result<Self> {
        validate_name(Entity::Database, name)?;

        let path = root_dir.join(name);
        fs::create_dir(&path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => KvsError::already_exists(Entity::Database, name),
            _ => KvsError::io(&path, e),
        })?;

        tracing::debug!("Created database {} at {}", name, path.display());

        Ok(Self::with_tables(name, path, options, Vec::new()))
    }

    /// Assemble a database from tables rebuilt by recovery
    pub fn with_tables(
        name: &str,
        path: PathBuf,
        options: StorageOptions,
        tables: Vec<LogTable>,
    ) -> Self {
        let tables = tables
            .into_iter()
            .map(|table| {
                let name = table.name().to_string();
                (name, CachingTable::new(table, options.cache_capacity))
            })
            .collect();

        Self {
            name: name.to_string(),
            path,
            options,
            tables,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> StorageOptions {
        self.options
    }

    /// Create a new table. Fails with `AlreadyExists` if the name is taken.
    pub fn create_table_if_not_exists(&mut self, table_name: &str) -> Result<()> {
        if self.tables.contains_key(table_name) {
            return Err(KvsError::already_exists(Entity::Table, table_name));
        }

        let table = LogTable::create(table_name, &self.path, self.options.segment_size)?;
        self.tables.insert(
            table_name.to_string(),
            CachingTable::new(table, self.options.cache_capacity),
        );
        Ok(())
    }

    pub fn write(&mut self, table_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.table_mut(table_name)?.write(key, value)
    }

    pub fn read(&mut self, table_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.table_mut(table_name)?.read(key)
    }

    pub fn delete(&mut self, table_name: &str, key: &[u8]) -> Result<()> {
        self.table_mut(table_name)?.delete(key)
    }

    pub fn contains_table(&self, table_name: &str) -> bool {
        self.tables.contains_key(table_name)
    }

    pub fn table(&self, table_name: &str) -> Option<&CachingTable<LogTable>> {
        self.tables.get(table_name)
    }

    /// Table names in sorted order
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    fn table_mut(&mut self, table_name: &str) -> Result<&mut CachingTable<LogTable>> {
        self.tables
            .get_mut(table_name)
            .ok_or_else(|| KvsError::not_found(Entity::Table, table_name))
    }
}
