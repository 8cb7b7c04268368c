//! Change-trigger loop: watches the topology version and requests
//! reconciliation cycles.
//!
//! The watcher never runs a cycle inline; it only parks triggers on the
//! reconciler's bounded channel, so a slow cycle cannot block delivery of
//! the next notification.

use crate::reconciler::Reconciler;
use crate::topology::TopologyClient;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Polls the topology version and triggers the reconciler on change.
pub struct TopologyWatcher {
    topology: Arc<dyn TopologyClient>,
    poll_interval: Duration,
}

impl TopologyWatcher {
    /// Creates a watcher polling at the given interval.
    pub fn new(topology: Arc<dyn TopologyClient>, poll_interval: Duration) -> Self {
        Self {
            topology,
            poll_interval,
        }
    }

    /// Spawns the watch loop.
    ///
    /// The first observed version counts as a change, so the daemon
    /// converges once at startup. A failed version read is logged and
    /// retried at the next poll; delivery is at-least-once. The loop exits
    /// once the reconciler enters shutdown.
    pub fn spawn(self, reconciler: Arc<Reconciler>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.poll_interval.as_secs(), "Watching topology for changes");
            let mut last_version: Option<String> = None;

            loop {
                if reconciler.is_shutdown() {
                    break;
                }

                match self.topology.version().await {
                    Ok(version) => {
                        if last_version.as_deref() != Some(version.as_str()) {
                            debug!(version = %version, "Topology version changed");
                            reconciler.trigger();
                            last_version = Some(version);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read topology version");
                    }
                }

                tokio::time::sleep(self.poll_interval).await;
            }

            info!("Topology watcher stopped");
        })
    }
}
