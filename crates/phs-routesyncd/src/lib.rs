//! Per-host-subnet route synchronization.
//!
//! Keeps the local routing table consistent with the cluster topology
//! published by the metadata service: every peer host owns a private
//! subnet, reachable through a route whose gateway is that host's agent IP
//! (host-gateway networking).
//!
//! The crate is organized around one reconciliation cycle:
//!
//! 1. [`topology`]: read the local host and the full host list
//! 2. [`provider`]: resolve the local interface and read current routes
//! 3. [`desired`]: turn the topology snapshot into the target route set
//! 4. [`diff`]: compute the minimal ordered changeset
//! 5. [`reconciler`]: apply the changeset and report a [`CycleResult`]
//!
//! Cycles are driven by the [`watch`] loop, which polls the topology
//! version, and are serialized so at most one touches the routing table at
//! a time.

pub mod desired;
pub mod diff;
pub mod error;
pub mod metadata;
pub mod provider;
pub mod reconciler;
pub mod topology;
pub mod watch;

pub use desired::{build_desired, DesiredRoutes};
pub use diff::{diff, Changeset, RouteReplace};
pub use error::{Result, RouteSyncError};
pub use metadata::{MetadataClient, DEFAULT_METADATA_ADDRESS};
pub use provider::{InterfaceResolver, RouteTableProvider};
pub use reconciler::{CycleResult, Reconciler};
pub use topology::TopologyClient;
pub use watch::TopologyWatcher;

// Shared types, re-exported for consumers of the library.
pub use phs_types::{Host, InterfaceDescriptor, RouteEntry, RouteSet, SubnetV4};
