//! Successor list for fault tolerance.
//!
//! Instead of only the direct successor, each node keeps up to `m` next
//! successors so the ring survives the loss of its immediate neighbour.
//! Slots that are not yet known hold `None` placeholders, so a well-formed
//! list always has exactly `m` slots.

use crate::node::NodeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessorList {
    slots: Vec<Option<NodeRef>>,
}

impl SuccessorList {
    /// Empty list, as held by a node that has not joined yet.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// `[first, nil, nil, ...]` with `capacity` slots.
    pub fn seeded(first: NodeRef, capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.push(Some(first));
        slots.resize(capacity.max(1), None);
        Self { slots }
    }

    /// Number of slots, placeholders included.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Option<NodeRef>] {
        &self.slots
    }

    /// Known entries only, nearest first.
    pub fn live(&self) -> Vec<NodeRef> {
        self.slots.iter().flatten().cloned().collect()
    }

    pub fn head(&self) -> Option<&NodeRef> {
        self.slots.first().and_then(|s| s.as_ref())
    }

    /// Drops the first slot and returns the nearest remaining known entry,
    /// skipping placeholders, which becomes the new head.
    pub fn shift(&mut self) -> Option<NodeRef> {
        if self.slots.is_empty() {
            return None;
        }
        self.slots.remove(0);
        while matches!(self.slots.first(), Some(None)) {
            self.slots.remove(0);
        }
        self.head().cloned()
    }

    /// Replaces the head slot, keeping the rest of the list.
    pub fn set_head(&mut self, node: NodeRef) {
        match self.slots.first_mut() {
            Some(slot) => *slot = Some(node),
            None => self.slots.push(Some(node)),
        }
    }

    /// Reconciles with the successor's own list: prepend the successor, cut
    /// at the first occurrence of `owner` (the walk has wrapped), drop
    /// duplicates, then truncate and pad back to `capacity` slots.
    pub fn reconcile(&mut self, owner: &NodeRef, successor: &NodeRef, theirs: &[NodeRef], capacity: usize) {
        let mut seen = HashSet::new();
        let mut slots: Vec<Option<NodeRef>> = Vec::with_capacity(capacity);

        for node in std::iter::once(successor).chain(theirs.iter()) {
            if node.is(owner) || slots.len() == capacity {
                break;
            }
            if seen.insert(node.id) {
                slots.push(Some(node.clone()));
            }
        }

        slots.resize(capacity, None);
        self.slots = slots;
    }

    /// Pads with placeholders back to `capacity` after a shrinking fail-over.
    pub fn pad(&mut self, capacity: usize) {
        if self.slots.len() < capacity {
            self.slots.resize(capacity, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64) -> NodeRef {
        NodeRef::new(id, "127.0.0.1", 5000 + id as u16)
    }

    #[test]
    fn test_seeded_has_placeholders() {
        let list = SuccessorList::seeded(node(3), 3);
        assert_eq!(list.len(), 3);
        assert_eq!(list.live(), vec![node(3)]);
        assert_eq!(list.head(), Some(&node(3)));
    }

    #[test]
    fn test_reconcile_prepends_successor_and_stops_at_owner() {
        let mut list = SuccessorList::seeded(node(3), 3);
        // node 0 reconciling with successor 3 whose list is [5, 0, nil]
        list.reconcile(&node(0), &node(3), &[node(5), node(0)], 3);
        assert_eq!(list.slots(), &[Some(node(3)), Some(node(5)), None]);
    }

    #[test]
    fn test_reconcile_truncates_and_dedups() {
        let mut list = SuccessorList::new();
        list.reconcile(&node(0), &node(1), &[node(1), node(2), node(3), node(4)], 3);
        assert_eq!(list.slots(), &[Some(node(1)), Some(node(2)), Some(node(3))]);
    }

    #[test]
    fn test_shift_skips_placeholders() {
        let mut list = SuccessorList::seeded(node(3), 3);
        assert_eq!(list.shift(), None);
        assert!(list.is_empty());

        let mut list = SuccessorList::new();
        list.reconcile(&node(0), &node(3), &[node(5)], 3);
        assert_eq!(list.shift(), Some(node(5)));
        assert_eq!(list.len(), 2);

        list.pad(3);
        assert_eq!(list.slots(), &[Some(node(5)), None, None]);
    }
}
