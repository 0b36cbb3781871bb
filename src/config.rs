//! Configuration for SegmentKV
//!
//! Centralized configuration with sensible defaults. Values can be built in
//! code through [`ConfigBuilder`] or loaded from a `.properties` file.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{KvsError, Result};

/// Default capacity of a single segment, in payload bytes
pub const DEFAULT_SEGMENT_SIZE: u64 = 100_000;

/// Default number of entries kept by each table's LRU cache
pub const DEFAULT_CACHE_CAPACITY: usize = 5_000;

pub const DEFAULT_WORKING_PATH: &str = "db_files";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

const WORKING_PATH_KEY: &str = "kvs.workingPath";
const HOST_KEY: &str = "kvs.host";
const PORT_KEY: &str = "kvs.port";

/// Main configuration for a SegmentKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all databases
    /// Internal structure:
    ///   {working_path}/
    ///     └── {database}/
    ///           └── {table}/
    ///                 └── {table}_{epoch_millis}   (segment files)
    pub working_path: PathBuf,

    /// Segment capacity in bytes before it becomes read-only
    pub segment_size_limit: u64,

    /// Entries kept in each table's LRU cache (0 disables caching)
    pub cache_capacity: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_path: PathBuf::from(DEFAULT_WORKING_PATH),
            segment_size_limit: DEFAULT_SEGMENT_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            listen_addr: format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT),
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The part of the configuration the storage layer cares about
    pub fn storage_options(&self) -> StorageOptions {
        StorageOptions {
            segment_size: self.segment_size_limit,
            cache_capacity: self.cache_capacity,
        }
    }

    /// Load `kvs.workingPath`, `kvs.host` and `kvs.port` from a properties file.
    ///
    /// A missing file or missing key falls back to the default value. A key
    /// that is present but malformed is an error.
    pub fn from_properties(path: &Path) -> Result<Self> {
        let properties = match fs::read_to_string(path) {
            Ok(text) => parse_properties(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Config file {} not found, using defaults",
                    path.display()
                );
                HashMap::new()
            }
            Err(e) => return Err(KvsError::io(path, e)),
        };

        let mut builder = Config::builder();

        match properties.get(WORKING_PATH_KEY) {
            Some(dir) => builder = builder.working_path(dir),
            None => tracing::warn!("{} not set, using {}", WORKING_PATH_KEY, DEFAULT_WORKING_PATH),
        }

        let host = properties
            .get(HOST_KEY)
            .map(String::as_str)
            .unwrap_or(DEFAULT_HOST);
        let port = match properties.get(PORT_KEY) {
            Some(raw) => raw.parse::<u16>().map_err(|e| {
                KvsError::Config(format!("{} must be a port number, got '{}': {}", PORT_KEY, raw, e))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(builder.listen_addr(format!("{}:{}", host, port)).build())
    }
}

/// Minimal `.properties` parser: `key=value` or `key: value` per line,
/// `#` and `!` start comments.
fn parse_properties(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| match parse_property_line(line) {
            Some(pair) => Some(pair),
            None => {
                tracing::warn!("Ignoring unparseable properties line: {:?}", line);
                None
            }
        })
        .collect()
}

/// Split one trimmed line into key and value. The key ends at the first `=`,
/// `:` or whitespace; whitespace around a single `=` or `:` is skipped.
/// "kvs.port=4321", "kvs.port : 4321" and "kvs.port 4321" are all accepted.
fn parse_property_line(line: &str) -> Option<(String, String)> {
    let split = line.find(|c: char| c == '=' || c == ':' || c.is_whitespace())?;
    let key = &line[..split];
    if key.is_empty() {
        return None;
    }

    let rest = line[split..].trim_start();
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .unwrap_or(rest);

    Some((key.to_string(), rest.trim().to_string()))
}

/// Storage parameters handed down to databases and tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageOptions {
    /// Segment capacity in bytes
    pub segment_size: u64,

    /// LRU cache capacity per table
    pub cache_capacity: usize,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            segment_size: DEFAULT_SEGMENT_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the working directory (root for all databases)
    pub fn working_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.working_path = path.into();
        self
    }

    /// Set the segment size limit (in bytes)
    pub fn segment_size_limit(mut self, size: u64) -> Self {
        self.config.segment_size_limit = size;
        self
    }

    /// Set the per-table cache capacity (in entries)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
