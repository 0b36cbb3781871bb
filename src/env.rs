//! Execution environment
//!
//! Registry of loaded databases plus the working directory they live in.
//! Each database sits behind its own mutex, so at most one operation runs
//! against a database (and therefore against any of its tables) at a time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::{Config, StorageOptions};
use crate::error::{Entity, KvsError, Result};
use crate::recovery::{self, RecoveryReport};
use crate::storage::Database;

/// Shared handle to a loaded database
pub type DatabaseHandle = Arc<Mutex<Database>>;

pub struct ExecutionEnvironment {
    working_path: PathBuf,
    options: StorageOptions,
    databases: RwLock<HashMap<String, DatabaseHandle>>,
}

impl ExecutionEnvironment {
    /// An empty environment; nothing is read from disk
    pub fn new(working_path: impl Into<PathBuf>, options: StorageOptions) -> Self {
        Self {
            working_path: working_path.into(),
            options,
            databases: RwLock::new(HashMap::new()),
        }
    }

    /// Build an environment for `config` and replay everything under its
    /// working directory. Any recovery failure aborts initialization.
    pub fn initialize(config: &Config) -> Result<(Self, RecoveryReport)> {
        let env = Self::new(&config.working_path, config.storage_options());
        let report = recovery::recover(&env)?;
        Ok((env, report))
    }

    pub fn get_database(&self, name: &str) -> Option<DatabaseHandle> {
        self.databases.read().get(name).cloned()
    }

    /// Register a database, replacing any database of the same name
    pub fn add_database(&self, database: Database) -> DatabaseHandle {
        let name = database.name().to_string();
        let handle = Arc::new(Mutex::new(database));
        self.databases.write().insert(name, Arc::clone(&handle));
        handle
    }

    /// Create a database on disk and register it
    pub fn create_database(&self, name: &str) -> Result<DatabaseHandle> {
        let mut databases = self.databases.write();
        if databases.contains_key(name) {
            return Err(KvsError::already_exists(Entity::Database, name));
        }

        let database = Database::create(name, &self.working_path, self.options)?;
        let handle = Arc::new(Mutex::new(database));
        databases.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    pub fn working_path(&self) -> &Path {
        &self.working_path
    }

    pub fn options(&self) -> StorageOptions {
        self.options
    }

    /// Names of loaded databases in sorted order
    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.read().keys().cloned().collect();
        names.sort();
        names
    }
}
