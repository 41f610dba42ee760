//! Periodic ring upkeep.

use super::ChordNode;
use crate::peer::PeerLink;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handles to the background maintenance tasks of one node.
pub struct Maintenance {
    handles: Vec<JoinHandle<()>>,
}

impl Maintenance {
    /// Stops all maintenance tasks. A pass in flight is dropped at its
    /// next suspension point.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

/// Starts stabilize, fix_fingers and check_predecessor on their own
/// schedules. Each task awaits its previous pass, so passes of the same
/// kind never overlap, and each pass is cut off at the configured deadline.
pub fn spawn_maintenance<L: PeerLink>(node: Arc<ChordNode<L>>) -> Maintenance {
    tracing::info!("{} starting maintenance tasks", node.me());
    let config = node.config().clone();

    let stabilize = {
        let node = node.clone();
        let every = config.stabilize_interval;
        let deadline = config.deadline_for(every);
        tokio::spawn(async move {
            node.stabilize_loop(every, deadline).await;
        })
    };

    let fix_fingers = {
        let node = node.clone();
        let every = config.fix_fingers_interval;
        let deadline = config.deadline_for(every);
        tokio::spawn(async move {
            node.fix_fingers_loop(every, deadline).await;
        })
    };

    let check_predecessor = {
        let every = config.check_predecessor_interval;
        let deadline = config.deadline_for(every);
        tokio::spawn(async move {
            node.check_predecessor_loop(every, deadline).await;
        })
    };

    Maintenance {
        handles: vec![stabilize, fix_fingers, check_predecessor],
    }
}

fn ticker(every: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

impl<L: PeerLink> ChordNode<L> {
    /// Spawns the maintenance tasks for this node.
    pub fn start_maintenance(self: &Arc<Self>) -> Maintenance {
        spawn_maintenance(self.clone())
    }

    async fn stabilize_loop(self: Arc<Self>, every: Duration, deadline: Duration) {
        let mut interval = ticker(every);
        loop {
            interval.tick().await;
            if tokio::time::timeout(deadline, self.stabilize()).await.is_err() {
                tracing::warn!("{} stabilize pass exceeded {:?}", self.me, deadline);
            }
        }
    }

    async fn fix_fingers_loop(self: Arc<Self>, every: Duration, deadline: Duration) {
        let mut interval = ticker(every);
        loop {
            interval.tick().await;
            if tokio::time::timeout(deadline, self.fix_fingers()).await.is_err() {
                tracing::warn!("{} fix_fingers pass exceeded {:?}", self.me, deadline);
            }
        }
    }

    async fn check_predecessor_loop(self: Arc<Self>, every: Duration, deadline: Duration) {
        let mut interval = ticker(every);
        loop {
            interval.tick().await;
            match tokio::time::timeout(deadline, self.check_predecessor()).await {
                Ok(_) => {}
                Err(_) => tracing::warn!("{} check_predecessor pass exceeded {:?}", self.me, deadline),
            }
        }
    }
}
