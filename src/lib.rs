//! # SegmentKV
//!
//! An append-only, segmented key-value store:
//! - Databases hold tables, tables hold an ordered list of segment files
//! - Writes and deletes append records to the active segment
//! - In-memory per-table index plus an LRU cache for reads
//! - Startup recovery rebuilds every index by replaying the segment files
//! - TCP client protocol served through a single command worker
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │                  (Multiple Clients)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                │
//! │              (Single Worker Command Queue)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                ExecutionEnvironment                         │
//! │              (Database Registry, Recovery)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ CachingTable│ ───────▶ │  LogTable   │
//!   │    (LRU)    │          │ (Segments)  │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod recovery;
pub mod env;
pub mod engine;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvsError, Result};
pub use config::Config;
pub use engine::Engine;
pub use env::ExecutionEnvironment;
pub use storage::Database;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SegmentKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
