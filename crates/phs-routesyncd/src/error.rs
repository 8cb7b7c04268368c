//! Error types for route synchronization.
//!
//! The variants follow the cycle's error policy: some are fatal to a whole
//! reconciliation cycle, some affect a single host record, and some affect a
//! single route operation. [`RouteSyncError::is_cycle_fatal`] encodes the
//! distinction.

use phs_types::{ParseError, RouteEntry};
use std::net::Ipv4Addr;
use thiserror::Error;

/// Result type alias for route synchronization operations.
pub type Result<T> = std::result::Result<T, RouteSyncError>;

/// Errors that can occur during route synchronization.
#[derive(Debug, Clone, Error)]
pub enum RouteSyncError {
    /// Reading topology from the metadata service failed. Fatal to the
    /// cycle; retried on the next trigger or fallback poll.
    #[error("Topology unavailable: {operation}: {message}")]
    TopologyUnavailable {
        /// The read that failed (e.g., "self/host", "hosts", "version").
        operation: String,
        /// Error message.
        message: String,
    },

    /// The local host record does not carry a routable agent IP. Fatal to
    /// the cycle.
    #[error("Local host '{uuid}' has no routable agent IP: {source}")]
    LocalHostUnresolvable {
        /// UUID of the local host record.
        uuid: String,
        /// The underlying parse failure.
        #[source]
        source: ParseError,
    },

    /// The local agent IP could not be mapped to a network interface.
    /// Fatal to the cycle.
    #[error("Failed to resolve interface for {ip}: {message}")]
    InterfaceResolution {
        /// The local address that could not be resolved.
        ip: Ipv4Addr,
        /// Error message.
        message: String,
    },

    /// A single host record in the topology is malformed. The host is
    /// excluded from desired state and the cycle continues.
    #[error("Malformed topology record for host '{uuid}': {message}")]
    MalformedTopology {
        /// UUID of the offending host record.
        uuid: String,
        /// What was wrong with the record.
        message: String,
    },

    /// Enumerating the current route table failed. Fatal to the cycle,
    /// since a diff against an unknown current state is meaningless.
    #[error("Route table provider failed: {operation}: {message}")]
    Provider {
        /// The provider call that failed (e.g., "list", "close").
        operation: String,
        /// Error message.
        message: String,
    },

    /// A single route mutation failed. Remaining changeset entries are
    /// still applied and the cycle reports partial success.
    #[error("Failed to {operation} route [{route}]: {message}")]
    RouteApply {
        /// "add" or "remove".
        operation: &'static str,
        /// The offending route entry, rendered.
        route: String,
        /// Error message.
        message: String,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl RouteSyncError {
    /// Creates a topology unavailable error.
    pub fn topology_unavailable(
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::TopologyUnavailable {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates an interface resolution error.
    pub fn interface_resolution(ip: Ipv4Addr, message: impl Into<String>) -> Self {
        Self::InterfaceResolution {
            ip,
            message: message.into(),
        }
    }

    /// Creates a malformed topology error for one host record.
    pub fn malformed_topology(uuid: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedTopology {
            uuid: uuid.into(),
            message: message.into(),
        }
    }

    /// Creates a provider error.
    pub fn provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a route apply error tagged with the offending entry.
    pub fn route_apply(
        operation: &'static str,
        route: &RouteEntry,
        message: impl Into<String>,
    ) -> Self {
        Self::RouteApply {
            operation,
            route: route.to_string(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error aborts a whole reconciliation cycle
    /// before any mutation is attempted.
    pub fn is_cycle_fatal(&self) -> bool {
        matches!(
            self,
            RouteSyncError::TopologyUnavailable { .. }
                | RouteSyncError::LocalHostUnresolvable { .. }
                | RouteSyncError::InterfaceResolution { .. }
                | RouteSyncError::Provider { .. }
        )
    }
}
