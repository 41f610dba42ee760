//! Mutable ring-local state of one node.
//!
//! `NodeState` is owned by a single [`ChordNode`](crate::chord::ChordNode)
//! behind one lock. Nothing here performs I/O; the node snapshots what it
//! needs, makes its remote calls unlocked, then applies the outcome here in
//! one critical section.

use crate::node::{display_opt, NodeRef};
use crate::ring::{FingerEntry, FingerTable, IdSpace, SuccessorList};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Membership lifecycle of a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Unjoined,
    Joining,
    Stable,
}

#[derive(Clone, Debug)]
pub struct NodeState {
    me: NodeRef,
    space: IdSpace,
    pub phase: Phase,
    pub predecessor: Option<NodeRef>,
    pub fingers: FingerTable,
    pub successors: SuccessorList,
}

impl NodeState {
    pub fn new(me: NodeRef, space: IdSpace) -> Self {
        let fingers = FingerTable::new(&me, space);
        Self {
            me,
            space,
            phase: Phase::Unjoined,
            predecessor: None,
            fingers,
            successors: SuccessorList::new(),
        }
    }

    pub fn me(&self) -> &NodeRef {
        &self.me
    }

    pub fn space(&self) -> IdSpace {
        self.space
    }

    /// `finger[0].successor`
    pub fn successor(&self) -> NodeRef {
        self.fingers.successor().clone()
    }

    /// Installs a new immediate successor in both the finger table and the
    /// head of the successor list.
    pub fn set_successor(&mut self, node: NodeRef) {
        self.fingers.set(0, node.clone());
        if !self.successors.is_empty() {
            self.successors.set_head(node);
        }
    }

    /// Rebuilds the finger table with every entry pointing at self.
    pub fn reset_fingers(&mut self) {
        self.fingers = FingerTable::new(&self.me, self.space);
    }

    /// No predecessor and nobody but self to route to.
    pub fn is_isolated(&self) -> bool {
        self.predecessor.is_none() && self.fingers.successor().is(&self.me)
    }

    /// Drops a dead node from the routing table, pointing the affected
    /// fingers at the immediate successor instead.
    pub fn evict(&mut self, dead: &NodeRef) -> usize {
        let fallback = self.successor();
        if fallback.is(dead) {
            return 0;
        }
        self.fingers.evict(dead, &fallback)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            node: self.me.clone(),
            phase: self.phase,
            predecessor: self.predecessor.clone(),
            fingers: self.fingers.entries().to_vec(),
            successors: self.successors.slots().to_vec(),
        }
    }
}

/// Point-in-time snapshot served by the `summary` RPC.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub node: NodeRef,
    pub phase: Phase,
    pub predecessor: Option<NodeRef>,
    pub fingers: Vec<FingerEntry>,
    pub successors: Vec<Option<NodeRef>>,
}

impl Summary {
    pub fn successor(&self) -> Option<&NodeRef> {
        self.fingers.first().map(|f| &f.successor)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Node: {} ({:?})", self.node, self.phase)?;
        writeln!(f, "Predecessor: {}", display_opt(&self.predecessor))?;
        writeln!(f, "FingerTable:")?;
        for (i, entry) in self.fingers.iter().enumerate() {
            writeln!(f, "  [{}] start={} -> {}", i, entry.start, entry.successor)?;
        }
        write!(f, "SuccessorList: [")?;
        for (i, slot) in self.successors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", display_opt(slot))?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64) -> NodeRef {
        NodeRef::new(id, "127.0.0.1", 5000 + id as u16)
    }

    #[test]
    fn test_new_state_is_unjoined() {
        let state = NodeState::new(node(0), IdSpace::new(3).unwrap());
        assert_eq!(state.phase, Phase::Unjoined);
        assert_eq!(state.successor(), node(0));
        assert!(state.successors.is_empty());
        assert!(state.is_isolated());
    }

    #[test]
    fn test_set_successor_updates_list_head() {
        let mut state = NodeState::new(node(0), IdSpace::new(3).unwrap());
        state.successors = SuccessorList::seeded(node(0), 3);
        state.set_successor(node(3));
        assert_eq!(state.successor(), node(3));
        assert_eq!(state.successors.head(), Some(&node(3)));
        assert!(!state.is_isolated());
    }

    #[test]
    fn test_evict_repoints_at_successor() {
        let mut state = NodeState::new(node(5), IdSpace::new(3).unwrap());
        state.set_successor(node(0));
        state.fingers.set(1, node(0));
        state.fingers.set(2, node(3));

        assert_eq!(state.evict(&node(3)), 1);
        assert_eq!(state.fingers.get(2).unwrap().successor, node(0));
        // the successor itself is not evicted from the routing table
        assert_eq!(state.evict(&node(0)), 0);
    }

    #[test]
    fn test_summary_display() {
        let mut state = NodeState::new(node(0), IdSpace::new(3).unwrap());
        state.predecessor = Some(node(5));
        state.successors = SuccessorList::seeded(node(0), 3);
        let dump = state.summary().to_string();

        assert!(dump.contains("Predecessor: {5}@127.0.0.1:5005"));
        assert!(dump.contains("[2] start=4 -> {0}@127.0.0.1:5000"));
        assert!(dump.ends_with("SuccessorList: [{0}@127.0.0.1:5000, nil, nil]"));
    }
}
