//! Cluster host record as published by the metadata service.

use crate::{ParseError, SubnetV4};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Host label carrying the per-host subnet assignment in CIDR form.
pub const PER_HOST_SUBNET_LABEL: &str = "io.rancher.network.per_host_subnet.subnet";

/// A cluster member.
///
/// Sourced fresh from the metadata service on every reconciliation cycle
/// and never mutated by the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Opaque unique identifier, immutable for the host's lifetime.
    pub uuid: String,

    /// Human-readable host name.
    #[serde(default)]
    pub name: String,

    /// The host's routable address; used both as the diff key and as the
    /// gateway for routes to this host's subnet.
    #[serde(default)]
    pub agent_ip: String,

    /// Arbitrary host labels.
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl Host {
    /// Returns the raw per-host subnet label, if the host carries one.
    ///
    /// Hosts without the label do not participate in per-host-subnet
    /// routing.
    pub fn subnet_label(&self) -> Option<&str> {
        self.labels.get(PER_HOST_SUBNET_LABEL).map(String::as_str)
    }

    /// Parses the per-host subnet label into a subnet.
    ///
    /// Returns `None` for hosts without the label and a [`ParseError`] for
    /// hosts whose label is present but malformed.
    pub fn subnet(&self) -> Option<Result<SubnetV4, ParseError>> {
        self.subnet_label().map(str::parse)
    }

    /// Parses the host's agent IP as an IPv4 address.
    pub fn agent_addr(&self) -> Result<Ipv4Addr, ParseError> {
        self.agent_ip
            .parse()
            .map_err(|_| ParseError::InvalidIpAddress(self.agent_ip.clone()))
    }
}
