//! Unbounded map backend. Entries stay cached until explicitly evicted.

use super::{CacheBackend, Instance, PutOutcome, TypeKey};
use std::collections::HashMap;

#[derive(Default)]
pub struct UnboundedBackend {
    entries: HashMap<TypeKey, Instance>,
}

impl UnboundedBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for UnboundedBackend {
    fn get(&mut self, key: &TypeKey) -> Option<Instance> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: TypeKey, value: Instance) -> PutOutcome {
        match self.entries.insert(key, value) {
            Some(old) => PutOutcome::Replaced(old),
            None => PutOutcome::Inserted,
        }
    }

    fn remove(&mut self, key: &TypeKey) -> Option<Instance> {
        self.entries.remove(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn kind(&self) -> &'static str {
        "unbounded"
    }
}
