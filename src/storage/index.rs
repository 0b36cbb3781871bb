//! In-memory key indices
//!
//! Both indices share one shape: the newest update for a key replaces the
//! previous one.
//! - [`SegmentIndex`]: key → byte offset of the key's last record in a segment
//! - [`TableIndex`]: key → position of the segment owning the key's newest write

use std::collections::HashMap;

/// Byte offset of a record from the start of its segment file
pub type SegmentOffset = u64;

/// Position of a segment within its table, in creation order
pub type SegmentId = usize;

/// Key → segment offset
pub type SegmentIndex = KeyIndex<SegmentOffset>;

/// Key → owning segment
pub type TableIndex = KeyIndex<SegmentId>;

/// Last-writer-wins mapping from a byte key to a small copyable location
#[derive(Debug, Clone)]
pub struct KeyIndex<V> {
    entries: HashMap<Vec<u8>, V>,
}

impl<V: Copy> KeyIndex<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Point `key` at `location`, replacing any earlier entry
    pub fn on_updated(&mut self, key: &[u8], location: V) {
        match self.entries.get_mut(key) {
            Some(slot) => *slot = location,
            None => {
                self.entries.insert(key.to_vec(), location);
            }
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<V> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.keys().map(Vec::as_slice)
    }
}

impl<V: Copy> Default for KeyIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}
