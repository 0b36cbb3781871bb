//! Storage Tests
//!
//! Record framing, segments, tables, caching and databases.

mod record_tests;
mod segment_tests;
