//! Maps external keys into the identifier space.

use crate::node::Identifier;
use crate::ring::IdSpace;
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// A partitioner converts keys into ring identifiers.
///
/// Partitioners are stateless and thread-safe; every node of a ring must use
/// the same one so they agree on key ownership.
pub trait Partitioner: Send + Sync + 'static {
    fn identifier(&self, key: &[u8]) -> Identifier;
}

/// SipHash-1-3 with fixed keys, reduced modulo `2^m`.
#[derive(Clone, Debug)]
pub struct SipPartitioner {
    space: IdSpace,
}

impl SipPartitioner {
    pub fn new(space: IdSpace) -> Self {
        Self { space }
    }

    pub fn identifier_for(&self, key: &str) -> Identifier {
        self.identifier(key.as_bytes())
    }
}

impl Partitioner for SipPartitioner {
    fn identifier(&self, key: &[u8]) -> Identifier {
        let mut hasher = SipHasher13::new();
        hasher.write(key);
        self.space.wrap(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_is_deterministic_and_in_space() {
        let space = IdSpace::new(3).unwrap();
        let partitioner = SipPartitioner::new(space);

        let a = partitioner.identifier_for("user_100");
        assert_eq!(a, partitioner.identifier_for("user_100"));
        for i in 0..1000 {
            let id = partitioner.identifier_for(&format!("key_{}", i));
            assert!(space.contains(id));
        }
    }

    #[test]
    fn test_keys_spread_over_space() {
        let space = IdSpace::new(4).unwrap();
        let partitioner = SipPartitioner::new(space);
        let mut seen = std::collections::HashSet::new();
        for i in 0..1000 {
            seen.insert(partitioner.identifier_for(&format!("key_{}", i)));
        }
        assert_eq!(seen.len(), 16, "every identifier should be hit by 1000 keys");
    }
}
