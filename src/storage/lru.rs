//! Least-recently-used cache
//!
//! Nodes live in a `Vec` arena and are chained into a doubly linked list by
//! index; a `HashMap` maps each key to its slot. Every hit or insert moves the
//! node to the head, eviction drops the tail.
//!
//! ```text
//!   head (most recent)                      tail (least recent)
//!     │                                        │
//!     ▼                                        ▼
//!   [slot 3] ⇄ [slot 0] ⇄ [slot 5] ⇄ ... ⇄ [slot 1]
//! ```

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Fixed-capacity map evicting the least recently used entry
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, usize>,
    slots: Vec<Option<Node<K, V>>>,
    /// Slots freed by removals, reused before the arena grows
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    hits: u64,
    misses: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// A capacity of 0 produces a cache that never stores anything.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up `key` and mark it as most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = match self.map.get(key) {
            Some(&idx) => idx,
            None => {
                self.misses += 1;
                return None;
            }
        };

        self.hits += 1;
        self.touch(idx);
        self.slots[idx].as_ref().map(|node| &node.value)
    }

    /// Look up `key` without changing its recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.slots[idx].as_ref().map(|node| &node.value)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Insert or replace `key`, marking it as most recently used.
    ///
    /// Returns the entry evicted to stay within capacity, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.capacity == 0 {
            return Some((key, value));
        }

        if let Some(&idx) = self.map.get(&key) {
            if let Some(node) = self.slots[idx].as_mut() {
                node.value = value;
            }
            self.touch(idx);
            return None;
        }

        let node = Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        self.map.insert(key, idx);
        self.push_front(idx);

        if self.map.len() > self.capacity {
            return self.pop_lru();
        }
        None
    }

    /// Remove `key`, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        self.release(idx).map(|(_, value)| value)
    }

    /// Remove and return the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let idx = self.tail?;
        let (key, value) = self.release(idx)?;
        self.map.remove(&key);
        Some((key, value))
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        let slots = &self.slots;
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = slots[cursor?].as_ref()?;
            cursor = node.next;
            Some(&node.key)
        })
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// (hits, misses) counted by `get`
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    fn touch(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    /// Unlink a slot and free it. The map entry is left to the caller.
    fn release(&mut self, idx: usize) -> Option<(K, V)> {
        self.unlink(idx);
        let node = self.slots[idx].take()?;
        self.free.push(idx);
        Some((node.key, node.value))
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_ref() {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.slots[p].as_mut() {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.slots[n].as_mut() {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = None;
            node.next = None;
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;

        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(node) = self.slots[h].as_mut() {
                    node.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }
}
