//! Error types for SegmentKV
//!
//! Provides a unified error type for all operations. Storage failures always
//! carry the name or path they concern so the command layer can turn them
//! into a readable message without extra bookkeeping.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::storage::DecodeError;

/// Result type alias using KvsError
pub type Result<T> = std::result::Result<T, KvsError>;

/// The kind of object an existence check was made against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Database,
    Table,
    Segment,
    Key,
    Directory,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Database => "Database",
            Entity::Table => "Table",
            Entity::Segment => "Segment",
            Entity::Key => "Key",
            Entity::Directory => "Directory",
        };
        f.write_str(name)
    }
}

/// Unified error type for SegmentKV operations
#[derive(Debug, Error)]
pub enum KvsError {
    // -------------------------------------------------------------------------
    // Existence Errors
    // -------------------------------------------------------------------------
    #[error("{entity} {name} not found")]
    NotFound { entity: Entity, name: String },

    #[error("{entity} {name} already exists")]
    AlreadyExists { entity: Entity, name: String },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt segment {} at offset {offset}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        offset: u64,
        #[source]
        source: DecodeError,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(#[source] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server is shut down")]
    ServerClosed,
}

impl KvsError {
    pub fn not_found(entity: Entity, name: impl Into<String>) -> Self {
        KvsError::NotFound {
            entity,
            name: name.into(),
        }
    }

    pub fn already_exists(entity: Entity, name: impl Into<String>) -> Self {
        KvsError::AlreadyExists {
            entity,
            name: name.into(),
        }
    }

    /// Wrap an I/O failure with the path it happened on
    pub fn io(path: &Path, source: io::Error) -> Self {
        KvsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Wrap a decode failure, keeping plain I/O failures in the `Io` kind
    pub fn decode(path: &Path, offset: u64, source: DecodeError) -> Self {
        match source {
            DecodeError::Io(err) => KvsError::io(path, err),
            source => KvsError::Corrupt {
                path: path.to_path_buf(),
                offset,
                source,
            },
        }
    }

    /// Returns true for the `NotFound` kind
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvsError::NotFound { .. })
    }

    /// Returns true for the `AlreadyExists` kind
    pub fn is_already_exists(&self) -> bool {
        matches!(self, KvsError::AlreadyExists { .. })
    }
}
