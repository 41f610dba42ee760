//! Modular-interval arithmetic over the identifier space.
//!
//! Every routing and maintenance decision on the ring reduces to "does this
//! identifier fall between these two, going clockwise?". Each call site picks
//! its own endpoint inclusivity, so all four combinations are supported.
//!
//! # Wraparound
//!
//! When `lower > upper` the interval passes through 0. When `lower == upper`
//! the interval is the whole circle (the clockwise walk from `lower` back to
//! itself), and the shared endpoint is a member if either bound is inclusive.
//! Under this convention `(n, n)` is "everything except n", which is what lets
//! a single-node ring answer every lookup.

use crate::error::{Error, Result};
use crate::node::Identifier;
use serde::{Deserialize, Serialize};

/// Tests whether `value` lies in the cyclic interval from `lower` to `upper`.
///
/// * `lower_inclusive == true` means `[lower, ...`, otherwise `(lower, ...`
/// * `upper_inclusive == true` means `..., upper]`, otherwise `..., upper)`
pub fn in_range(
    value: Identifier,
    lower: Identifier,
    lower_inclusive: bool,
    upper: Identifier,
    upper_inclusive: bool,
) -> bool {
    let (v, lo, hi) = (value.0, lower.0, upper.0);
    if lo == hi {
        return v != lo || lower_inclusive || upper_inclusive;
    }

    let after_lower = if lower_inclusive { v >= lo } else { v > lo };
    let before_upper = if upper_inclusive { v <= hi } else { v < hi };

    if lo < hi {
        after_lower && before_upper
    } else {
        // looping through 0
        after_lower || before_upper
    }
}

/// A cyclic interval with independently open or closed endpoints.
///
/// Thin wrapper around [`in_range`] so call sites read like the algorithm:
/// `Interval::open_closed(n, succ).contains(id)` for `id ∈ (n, succ]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    pub lower: Identifier,
    pub lower_inclusive: bool,
    pub upper: Identifier,
    pub upper_inclusive: bool,
}

impl Interval {
    /// `(lower, upper)`
    pub fn open(lower: Identifier, upper: Identifier) -> Self {
        Self { lower, lower_inclusive: false, upper, upper_inclusive: false }
    }

    /// `(lower, upper]`
    pub fn open_closed(lower: Identifier, upper: Identifier) -> Self {
        Self { lower, lower_inclusive: false, upper, upper_inclusive: true }
    }

    /// `[lower, upper)`
    pub fn closed_open(lower: Identifier, upper: Identifier) -> Self {
        Self { lower, lower_inclusive: true, upper, upper_inclusive: false }
    }

    /// `[lower, upper]`
    pub fn closed(lower: Identifier, upper: Identifier) -> Self {
        Self { lower, lower_inclusive: true, upper, upper_inclusive: true }
    }

    #[inline]
    pub fn contains(&self, value: Identifier) -> bool {
        in_range(value, self.lower, self.lower_inclusive, self.upper, self.upper_inclusive)
    }
}

/// The identifier space `[0, 2^m)`.
///
/// `m` is fixed for the lifetime of a ring; every node must agree on it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSpace {
    bits: u32,
}

impl IdSpace {
    pub const MAX_BITS: u32 = 63;

    pub fn new(bits: u32) -> Result<Self> {
        if bits == 0 || bits > Self::MAX_BITS {
            return Err(Error::InvalidConfig(format!(
                "identifier bit length must be in 1..={}, got {}",
                Self::MAX_BITS,
                bits
            )));
        }
        Ok(Self { bits })
    }

    /// `m`: the number of bits, and the length of the finger table.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// `2^m`
    #[inline]
    pub fn size(&self) -> u64 {
        1u64 << self.bits
    }

    #[inline]
    fn mask(&self) -> u64 {
        self.size() - 1
    }

    /// Reduces an arbitrary value into the space.
    #[inline]
    pub fn wrap(&self, value: u64) -> Identifier {
        Identifier(value & self.mask())
    }

    pub fn contains(&self, id: Identifier) -> bool {
        id.0 < self.size()
    }

    /// `(id + 2^i) mod 2^m`, the start of finger `i`.
    pub fn finger_start(&self, id: Identifier, i: u32) -> Identifier {
        self.wrap(id.0.wrapping_add(1u64 << i))
    }

    /// `(id - 2^i) mod 2^m`, the last identifier whose finger `i` could be `id`.
    pub fn preceding_by_pow(&self, id: Identifier, i: u32) -> Identifier {
        self.wrap(id.0.wrapping_sub(1u64 << i))
    }

    /// Iteration cap for `find_predecessor`: at most `2^m` nodes, each hop
    /// covering at least one finger.
    pub fn lookup_iteration_cap(&self) -> u64 {
        self.size().saturating_mul(self.bits as u64)
    }

    /// Every identifier in the space, in order. Only sensible for small `m`.
    pub fn iter(&self) -> impl Iterator<Item = Identifier> {
        (0..self.size()).map(Identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn id(v: u64) -> Identifier {
        Identifier(v)
    }

    /// Walks clockwise from `lower` to `upper` and collects the members.
    fn enumerate(space: IdSpace, lower: u64, lower_inclusive: bool, upper: u64, upper_inclusive: bool) -> BTreeSet<u64> {
        let size = space.size();
        let mut len = (upper + size - lower) % size;
        if len == 0 {
            len = size;
        }
        let mut members = BTreeSet::new();
        for k in 0..=len {
            let point = (lower + k) % size;
            let include = if k == 0 {
                lower_inclusive
            } else if k == len {
                upper_inclusive
            } else {
                true
            };
            if include {
                members.insert(point);
            }
        }
        members
    }

    #[test]
    fn test_non_wrapping_interval() {
        assert!(Interval::open_closed(id(0), id(3)).contains(id(3)));
        assert!(!Interval::open_closed(id(0), id(3)).contains(id(0)));
        assert!(Interval::closed_open(id(0), id(3)).contains(id(0)));
        assert!(!Interval::closed_open(id(0), id(3)).contains(id(3)));
        assert!(!Interval::open(id(3), id(5)).contains(id(3)));
        assert!(Interval::open(id(3), id(5)).contains(id(4)));
        assert!(Interval::closed(id(3), id(5)).contains(id(5)));
    }

    #[test]
    fn test_wrapping_interval() {
        // (5, 0] over m = 3 is {6, 7, 0}
        let iv = Interval::open_closed(id(5), id(0));
        assert!(iv.contains(id(6)));
        assert!(iv.contains(id(7)));
        assert!(iv.contains(id(0)));
        assert!(!iv.contains(id(5)));
        assert!(!iv.contains(id(1)));

        // [3, 0) is {3, ..., 7}
        let iv = Interval::closed_open(id(3), id(0));
        assert!(iv.contains(id(3)));
        assert!(iv.contains(id(7)));
        assert!(!iv.contains(id(0)));
    }

    #[test]
    fn test_equal_bounds_cover_whole_ring() {
        let open = Interval::open(id(5), id(5));
        assert!(!open.contains(id(5)));
        assert!(open.contains(id(4)));
        assert!(open.contains(id(6)));

        assert!(Interval::open_closed(id(5), id(5)).contains(id(5)));
        assert!(Interval::closed_open(id(5), id(5)).contains(id(5)));
        assert!(Interval::closed(id(5), id(5)).contains(id(0)));
    }

    #[test]
    fn test_id_space() {
        let space = IdSpace::new(3).unwrap();
        assert_eq!(space.size(), 8);
        assert_eq!(space.finger_start(id(5), 0), id(6));
        assert_eq!(space.finger_start(id(5), 2), id(1));
        assert_eq!(space.preceding_by_pow(id(3), 2), id(7));
        assert_eq!(space.preceding_by_pow(id(0), 0), id(7));
        assert_eq!(space.lookup_iteration_cap(), 24);
        assert_eq!(space.wrap(13), id(5));
        assert_eq!(space.iter().count(), 8);
    }

    #[test]
    fn test_id_space_rejects_bad_width() {
        assert!(IdSpace::new(0).is_err());
        assert!(IdSpace::new(64).is_err());
        let wide = IdSpace::new(63).unwrap();
        assert_eq!(wide.preceding_by_pow(id(0), 62), id(1u64 << 62));
    }

    proptest! {
        #[test]
        fn prop_in_range_matches_enumeration(
            bits in 1u32..=6,
            lower in 0u64..64,
            upper in 0u64..64,
            value in 0u64..64,
            lower_inclusive in any::<bool>(),
            upper_inclusive in any::<bool>(),
        ) {
            let space = IdSpace::new(bits).unwrap();
            let (lower, upper, value) = (lower % space.size(), upper % space.size(), value % space.size());
            let members = enumerate(space, lower, lower_inclusive, upper, upper_inclusive);
            prop_assert_eq!(
                in_range(id(value), id(lower), lower_inclusive, id(upper), upper_inclusive),
                members.contains(&value)
            );
        }
    }
}
