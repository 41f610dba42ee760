//! Local key/value store served alongside the ring protocol.
//!
//! Plain CRUD over a concurrent map. Ownership is only consulted when keys
//! move between nodes: a joining node takes over `(predecessor, self]` from
//! its successor through [`KvStore::drain_range`].

use crate::node::Identifier;
use crate::partitioner::{Partitioner, SipPartitioner};
use crate::ring::{IdSpace, Interval};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

pub struct KvStore {
    entries: DashMap<String, String>,
    partitioner: SipPartitioner,
}

impl KvStore {
    pub fn new(space: IdSpace) -> Self {
        Self {
            entries: DashMap::new(),
            partitioner: SipPartitioner::new(space),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    /// Inserts a new key. Returns `false` and leaves the store untouched if
    /// the key already exists.
    pub fn insert(&self, key: String, value: String) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// Stores entries handed over by another node, overwriting stale copies.
    pub fn absorb(&self, entries: Vec<(String, String)>) {
        for (key, value) in entries {
            self.entries.insert(key, value);
        }
    }

    /// Removes and returns every entry whose key hashes into `(lower, upper]`.
    pub fn drain_range(&self, lower: Identifier, upper: Identifier) -> Vec<(String, String)> {
        let range = Interval::open_closed(lower, upper);
        let moving: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| range.contains(self.partitioner.identifier(entry.key().as_bytes())))
            .map(|entry| entry.key().clone())
            .collect();

        moving
            .into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .collect()
    }

    pub fn identifier_of(&self, key: &str) -> Identifier {
        self.partitioner.identifier_for(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
