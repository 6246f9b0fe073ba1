//! Size-bounded backend with least-recently-used eviction.

use super::{CacheBackend, Instance, PutOutcome, TypeKey};
use lru::LruCache;
use std::num::NonZeroUsize;

pub struct LruBackend {
    entries: LruCache<TypeKey, Instance>,
}

impl LruBackend {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl CacheBackend for LruBackend {
    fn get(&mut self, key: &TypeKey) -> Option<Instance> {
        // Marks the entry as most recently used.
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: TypeKey, value: Instance) -> PutOutcome {
        match self.entries.push(key.clone(), value) {
            Some((old_key, old_value)) if old_key == key => PutOutcome::Replaced(old_value),
            Some((evicted_key, _)) => PutOutcome::Evicted(evicted_key),
            None => PutOutcome::Inserted,
        }
    }

    fn remove(&mut self, key: &TypeKey) -> Option<Instance> {
        self.entries.pop(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn kind(&self) -> &'static str {
        "lru"
    }
}
