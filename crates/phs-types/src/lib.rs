//! Common types for per-host-subnet networking.
//!
//! This crate provides type-safe representations of the primitives shared by
//! the per-host-subnet agents:
//!
//! - [`Host`]: a cluster member as published by the metadata service
//! - [`SubnetV4`]: an IPv4 network in CIDR notation
//! - [`RouteEntry`]: one routing-table entry
//! - [`RouteSet`]: a gateway-keyed collection of route entries
//! - [`InterfaceDescriptor`]: a resolved local network interface

mod host;
mod ip;
mod route;

pub use host::{Host, PER_HOST_SUBNET_LABEL};
pub use ip::SubnetV4;
pub use route::{InterfaceDescriptor, RouteEntry, RouteSet};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid subnet format: {0}")]
    InvalidSubnet(String),

    #[error("invalid prefix length: {0} (must be 0-32)")]
    InvalidPrefixLen(u8),
}
