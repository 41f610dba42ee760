//! Node configuration.

use crate::error::Result;
use crate::ring::IdSpace;
use std::time::Duration;

/// Identifier-space width used when nothing else is configured.
pub const DEFAULT_ID_BITS: u32 = 3;

/// Tunables for one ring member.
///
/// Every node of a ring must use the same `id_bits`; the intervals are local.
#[derive(Clone, Debug)]
pub struct ChordConfig {
    /// `m`: bit length of the identifier space.
    pub id_bits: u32,
    pub stabilize_interval: Duration,
    pub fix_fingers_interval: Duration,
    pub check_predecessor_interval: Duration,
    /// Deadline for a single remote call; expiry means the peer is dead.
    pub rpc_timeout: Duration,
    /// Upper bound on one maintenance pass. `None` uses the pass's interval.
    pub maintenance_deadline: Option<Duration>,
}

impl Default for ChordConfig {
    fn default() -> Self {
        Self {
            id_bits: DEFAULT_ID_BITS,
            stabilize_interval: Duration::from_secs(3),
            fix_fingers_interval: Duration::from_secs(3),
            check_predecessor_interval: Duration::from_secs(1),
            rpc_timeout: Duration::from_secs(2),
            maintenance_deadline: None,
        }
    }
}

impl ChordConfig {
    pub fn new(id_bits: u32) -> Self {
        Self {
            id_bits,
            ..Self::default()
        }
    }

    pub fn with_stabilize_interval(mut self, interval: Duration) -> Self {
        self.stabilize_interval = interval;
        self
    }

    pub fn with_fix_fingers_interval(mut self, interval: Duration) -> Self {
        self.fix_fingers_interval = interval;
        self
    }

    pub fn with_check_predecessor_interval(mut self, interval: Duration) -> Self {
        self.check_predecessor_interval = interval;
        self
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    pub fn with_maintenance_deadline(mut self, deadline: Duration) -> Self {
        self.maintenance_deadline = Some(deadline);
        self
    }

    /// Checks the bit length and returns the identifier space it describes.
    pub fn validate(&self) -> Result<IdSpace> {
        IdSpace::new(self.id_bits)
    }

    /// Successor lists hold as many entries as the finger table.
    pub fn successor_list_len(&self) -> usize {
        self.id_bits as usize
    }

    pub(crate) fn deadline_for(&self, interval: Duration) -> Duration {
        self.maintenance_deadline.unwrap_or(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_maintenance_schedule() {
        let config = ChordConfig::default();
        assert_eq!(config.id_bits, 3);
        assert_eq!(config.stabilize_interval, Duration::from_secs(3));
        assert_eq!(config.check_predecessor_interval, Duration::from_secs(1));
        assert_eq!(config.deadline_for(config.stabilize_interval), Duration::from_secs(3));
    }

    #[test]
    fn test_validate() {
        assert!(ChordConfig::new(0).validate().is_err());
        assert_eq!(ChordConfig::new(6).validate().unwrap().size(), 64);

        let config = ChordConfig::new(4).with_maintenance_deadline(Duration::from_millis(200));
        assert_eq!(config.deadline_for(Duration::from_secs(3)), Duration::from_millis(200));
        assert_eq!(config.successor_list_len(), 4);
    }
}
