//! Caching table decorator
//!
//! Wraps any [`Table`] with an LRU cache of values. Writes and deletes hit the
//! table first and only then update the cache, so the cache never holds a
//! value the table does not.

use crate::error::Result;

use super::lru::LruCache;
use super::Table;

/// A table with an LRU value cache in front of reads
#[derive(Debug)]
pub struct CachingTable<T> {
    inner: T,
    cache: LruCache<Vec<u8>, Vec<u8>>,
}

impl<T: Table> CachingTable<T> {
    pub fn new(inner: T, capacity: usize) -> Self {
        Self {
            inner,
            cache: LruCache::new(capacity),
        }
    }

    /// Whether `key` would currently be served without touching the table
    pub fn is_cached(&self, key: &[u8]) -> bool {
        self.cache.contains(key)
    }

    pub fn cache(&self) -> &LruCache<Vec<u8>, Vec<u8>> {
        &self.cache
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Table> Table for CachingTable<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn write(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.write(key, value)?;
        self.cache.put(key.to_vec(), value.to_vec());
        Ok(())
    }

    /// A miss that finds a value in the table also fills the cache.
    fn read(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.cache.get(key) {
            return Ok(Some(value.clone()));
        }

        let value = self.inner.read(key)?;
        if let Some(value) = &value {
            self.cache.put(key.to_vec(), value.clone());
        }
        Ok(value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.inner.delete(key)?;
        self.cache.remove(key);
        Ok(())
    }
}
