//! Finger table: the per-node routing table of `m` entries.

use crate::node::{Identifier, NodeRef};
use crate::ring::interval::{IdSpace, Interval};
use serde::{Deserialize, Serialize};

/// One routing entry.
///
/// `start` is `(n + 2^i) mod 2^m`, fixed when the table is built;
/// `successor` is the live pointer maintenance keeps accurate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerEntry {
    pub start: Identifier,
    pub successor: NodeRef,
}

/// Exactly `m` entries ordered by `start`.
///
/// # Invariants
///
/// - `entries[0].successor` is this node's immediate successor on the ring.
/// - Outside of join, no entry of a multi-node ring points at the owner as
///   a placeholder; evicted entries are repointed at the immediate successor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerTable {
    entries: Vec<FingerEntry>,
}

impl FingerTable {
    /// Builds a table for `owner` with every entry pointing at the owner
    /// itself, the placeholder used before real routing data arrives.
    pub fn new(owner: &NodeRef, space: IdSpace) -> Self {
        let entries = (0..space.bits())
            .map(|i| FingerEntry {
                start: space.finger_start(owner.id, i),
                successor: owner.clone(),
            })
            .collect();
        Self { entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FingerEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[FingerEntry] {
        &self.entries
    }

    /// `finger[0].successor`
    pub fn successor(&self) -> &NodeRef {
        &self.entries[0].successor
    }

    /// Installs `node` as the successor of entry `index`.
    /// Returns the previous value, or `None` if the index is out of range.
    pub fn set(&mut self, index: usize, node: NodeRef) -> Option<NodeRef> {
        self.entries
            .get_mut(index)
            .map(|entry| std::mem::replace(&mut entry.successor, node))
    }

    /// The farthest finger that still lies strictly inside `(from, id)`.
    ///
    /// Scans from the highest entry down; `None` means no finger precedes
    /// `id`, and the caller answers with `from` itself.
    pub fn closest_preceding(&self, from: Identifier, id: Identifier) -> Option<&NodeRef> {
        let window = Interval::open(from, id);
        self.entries
            .iter()
            .rev()
            .map(|entry| &entry.successor)
            .find(|node| window.contains(node.id))
    }

    /// Repoints every entry referring to `dead` at `replacement`.
    /// Entry 0 is left alone; the successor list owns fail-over for it.
    /// Returns how many entries changed.
    pub fn evict(&mut self, dead: &NodeRef, replacement: &NodeRef) -> usize {
        let mut evicted = 0;
        for entry in self.entries.iter_mut().skip(1) {
            if entry.successor.is(dead) {
                entry.successor = replacement.clone();
                evicted += 1;
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64) -> NodeRef {
        NodeRef::new(id, "127.0.0.1", 5000 + id as u16)
    }

    #[test]
    fn test_starts_are_fixed_powers_of_two() {
        let space = IdSpace::new(3).unwrap();
        let table = FingerTable::new(&node(5), space);

        let starts: Vec<u64> = table.entries().iter().map(|e| e.start.0).collect();
        assert_eq!(starts, vec![6, 7, 1]);
        assert!(table.entries().iter().all(|e| e.successor == node(5)));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_closest_preceding_scans_from_far_end() {
        let space = IdSpace::new(3).unwrap();
        let mut table = FingerTable::new(&node(0), space);
        table.set(0, node(3));
        table.set(1, node(3));
        table.set(2, node(5));

        // (0, 6): finger 2 (node 5) is the farthest that precedes 6
        assert_eq!(table.closest_preceding(Identifier(0), Identifier(6)), Some(&node(5)));
        // (0, 4): node 5 overshoots, node 3 qualifies
        assert_eq!(table.closest_preceding(Identifier(0), Identifier(4)), Some(&node(3)));
        // (0, 2): nothing precedes
        assert_eq!(table.closest_preceding(Identifier(0), Identifier(2)), None);
    }

    #[test]
    fn test_evict_leaves_first_entry() {
        let space = IdSpace::new(3).unwrap();
        let mut table = FingerTable::new(&node(5), space);
        table.set(0, node(0));
        table.set(1, node(0));
        table.set(2, node(3));

        assert_eq!(table.evict(&node(3), &node(0)), 1);
        assert_eq!(table.get(2).unwrap().successor, node(0));

        let mut table = FingerTable::new(&node(5), space);
        table.set(0, node(3));
        assert_eq!(table.evict(&node(3), &node(0)), 0);
        assert_eq!(table.successor(), &node(3));
    }

    #[test]
    fn test_set_out_of_range() {
        let space = IdSpace::new(3).unwrap();
        let mut table = FingerTable::new(&node(5), space);
        assert_eq!(table.set(3, node(1)), None);
        assert_eq!(table.set(2, node(1)), Some(node(5)));
    }
}
