//! Topology snapshot reader contract.

use crate::error::Result;
use async_trait::async_trait;
use phs_types::Host;

/// Read contract against the cluster metadata service.
///
/// A snapshot is sourced fresh on every reconciliation cycle; the agent
/// never caches host records across cycles. All failures surface as
/// [`crate::RouteSyncError::TopologyUnavailable`].
#[async_trait]
pub trait TopologyClient: Send + Sync {
    /// Returns the local host record.
    async fn local_host(&self) -> Result<Host>;

    /// Returns the full host list, the local host included.
    async fn hosts(&self) -> Result<Vec<Host>>;

    /// Returns an opaque topology version token.
    ///
    /// The token changes whenever the published topology changes; the
    /// change-trigger loop polls it to decide when to reconcile. Delivery
    /// of changes is at-least-once, not exactly-once.
    async fn version(&self) -> Result<String>;
}
