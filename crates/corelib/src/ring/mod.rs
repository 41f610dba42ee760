//! Ring structures local to one node.
//!
//! Interval arithmetic over the identifier space, the finger table used for
//! routing, and the successor list used for fault tolerance.

pub mod finger;
pub mod interval;
pub mod successor;

pub use finger::{FingerEntry, FingerTable};
pub use interval::{in_range, IdSpace, Interval};
pub use successor::SuccessorList;
