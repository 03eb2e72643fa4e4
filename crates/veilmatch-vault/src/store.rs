//! Injected key-value stores for the authority's monotonic sets.
//!
//! `VerifiedSet` (address -> bool) and `SettledSet` (order id -> bool) only
//! ever grow. The trait has no way to clear a key.

use std::collections::HashSet;
use std::hash::Hash;

pub trait FlagStore<K> {
    fn is_set(&self, key: &K) -> bool;

    /// Set `key`. Returns `true` if it was not set before.
    fn set(&mut self, key: K) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`FlagStore`].
#[derive(Debug, Clone)]
pub struct MemoryFlagStore<K> {
    keys: HashSet<K>,
}

impl<K> Default for MemoryFlagStore<K> {
    fn default() -> Self {
        Self {
            keys: HashSet::new(),
        }
    }
}

impl<K: Hash + Eq> MemoryFlagStore<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K: Hash + Eq> FlagStore<K> for MemoryFlagStore<K> {
    fn is_set(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    fn set(&mut self, key: K) -> bool {
        self.keys.insert(key)
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;

    use super::*;

    #[test]
    fn set_reports_first_insertion_only() {
        let mut store = MemoryFlagStore::new();
        let addr = Address::repeat_byte(1);
        assert!(!store.is_set(&addr));
        assert!(store.set(addr));
        assert!(!store.set(addr));
        assert!(store.is_set(&addr));
        assert_eq!(store.len(), 1);
    }
}
