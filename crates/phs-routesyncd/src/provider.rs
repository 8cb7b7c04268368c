//! Platform capability contracts: interface resolution and route table
//! access.
//!
//! Each target platform supplies its own implementations; the
//! reconciliation core never references platform call conventions.

use crate::error::Result;
use async_trait::async_trait;
use phs_types::{InterfaceDescriptor, RouteEntry};
use std::net::Ipv4Addr;

/// Maps a local IP address to a local network interface descriptor.
#[async_trait]
pub trait InterfaceResolver: Send + Sync {
    /// Resolves the interface that carries the given local address.
    ///
    /// Fails with [`crate::RouteSyncError::InterfaceResolution`] if no
    /// interface carries the address.
    async fn resolve_interface(&self, ip: Ipv4Addr) -> Result<InterfaceDescriptor>;
}

/// Enumerates and mutates the platform routing table.
///
/// The routing table is a single shared mutable resource; callers must
/// serialize access. The reconciler guarantees at most one cycle touches
/// the provider at a time.
///
/// Implementations should bound each call with their own deadline and
/// report an exceeded deadline as an ordinary error, never a panic.
#[async_trait]
pub trait RouteTableProvider: Send + Sync {
    /// Lists the routes currently bound to the given interface.
    ///
    /// Fails with [`crate::RouteSyncError::Provider`].
    async fn list_routes(&self, interface_index: u32) -> Result<Vec<RouteEntry>>;

    /// Adds a single route entry.
    ///
    /// Fails with [`crate::RouteSyncError::RouteApply`]; failures are
    /// per-entry (duplicate, invalid gateway, etc.).
    async fn add_route(&self, entry: &RouteEntry) -> Result<()>;

    /// Removes a single route entry.
    ///
    /// Fails with [`crate::RouteSyncError::RouteApply`].
    async fn remove_route(&self, entry: &RouteEntry) -> Result<()>;

    /// Releases provider resources. Guaranteed to be called once on
    /// shutdown, after any in-flight cycle has finished.
    async fn close(&self) -> Result<()>;
}
