//! Desired-state builder: turns a topology snapshot into the target route
//! set.

use crate::error::RouteSyncError;
use phs_types::{Host, InterfaceDescriptor, RouteEntry, RouteSet};
use tracing::debug;

/// Output of the desired-state builder for one cycle.
#[derive(Debug, Clone, Default)]
pub struct DesiredRoutes {
    /// Routes that should exist on the local interface.
    pub routes: RouteSet,
    /// Hosts excluded because their records were malformed. One entry per
    /// offending host; the rest of the topology is unaffected.
    pub rejected: Vec<RouteSyncError>,
    /// Hosts silently skipped because they carry no subnet label.
    pub unlabeled: usize,
}

/// Builds the set of routes that should exist, given the local host and the
/// full host list.
///
/// Pure over its inputs: no I/O, no retained state. The local host is
/// always excluded (its subnet is locally reachable); peers without a
/// subnet label are skipped; peers with an unparsable subnet label or agent
/// IP are rejected individually without aborting the rest.
pub fn build_desired(local: &Host, hosts: &[Host], iface: InterfaceDescriptor) -> DesiredRoutes {
    let mut desired = DesiredRoutes::default();

    for host in hosts {
        // Link-local routes for the local host are already in place.
        if host.uuid == local.uuid {
            continue;
        }

        let Some(label) = host.subnet_label() else {
            debug!(uuid = %host.uuid, "Host carries no subnet label, skipping");
            desired.unlabeled += 1;
            continue;
        };

        let subnet = match label.parse() {
            Ok(subnet) => subnet,
            Err(e) => {
                desired.rejected.push(RouteSyncError::malformed_topology(
                    &host.uuid,
                    format!("subnet label '{}': {}", label, e),
                ));
                continue;
            }
        };

        let gateway = match host.agent_addr() {
            Ok(addr) => addr,
            Err(e) => {
                desired.rejected.push(RouteSyncError::malformed_topology(
                    &host.uuid,
                    format!("agent IP: {}", e),
                ));
                continue;
            }
        };

        desired
            .routes
            .insert(RouteEntry::to_subnet(subnet, gateway, iface));
    }

    desired
}

#[cfg(test)]
mod tests {
    use super::*;
    use phs_types::PER_HOST_SUBNET_LABEL;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::net::Ipv4Addr;

    fn host(uuid: &str, agent_ip: &str, subnet: Option<&str>) -> Host {
        let mut labels = HashMap::new();
        if let Some(subnet) = subnet {
            labels.insert(PER_HOST_SUBNET_LABEL.to_string(), subnet.to_string());
        }
        Host {
            uuid: uuid.to_string(),
            agent_ip: agent_ip.to_string(),
            labels,
            ..Host::default()
        }
    }

    const IFACE: InterfaceDescriptor = InterfaceDescriptor::new(7, 25);

    #[test]
    fn test_builds_one_route_per_labeled_peer() {
        let local = host("h1", "10.0.0.1", Some("192.168.1.0/24"));
        let hosts = vec![
            local.clone(),
            host("h2", "10.0.0.2", Some("192.168.2.0/24")),
            host("h3", "10.0.0.3", Some("192.168.3.0/24")),
        ];

        let desired = build_desired(&local, &hosts, IFACE);

        assert!(desired.rejected.is_empty());
        assert_eq!(desired.routes.len(), 2);

        let gw2: Ipv4Addr = "10.0.0.2".parse().unwrap();
        let route = desired.routes.get(&gw2).unwrap();
        assert_eq!(route.destination, Ipv4Addr::new(192, 168, 2, 0));
        assert_eq!(route.mask, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(route.interface_index, 7);
        assert_eq!(route.metric, 25);
    }

    #[test]
    fn test_local_host_always_excluded() {
        // Even with a subnet label, the local host never produces a route.
        let local = host("h1", "10.0.0.1", Some("192.168.1.0/24"));
        let desired = build_desired(&local, std::slice::from_ref(&local), IFACE);

        assert!(desired.routes.is_empty());
        assert!(desired.rejected.is_empty());
    }

    #[test]
    fn test_unlabeled_hosts_skipped_silently() {
        let local = host("h1", "10.0.0.1", None);
        let hosts = vec![
            local.clone(),
            host("h2", "10.0.0.2", Some("192.168.2.0/24")),
            host("h4", "10.0.0.4", None),
        ];

        let desired = build_desired(&local, &hosts, IFACE);

        assert_eq!(desired.routes.len(), 1);
        assert_eq!(desired.unlabeled, 1);
        assert!(desired.rejected.is_empty());
    }

    #[test]
    fn test_malformed_host_does_not_abort_the_rest() {
        let local = host("h1", "10.0.0.1", None);
        let hosts = vec![
            local.clone(),
            host("h2", "10.0.0.2", Some("192.168.2.0/24")),
            host("h5", "10.0.0.5", Some("not-a-subnet")),
            host("h6", "bogus-ip", Some("192.168.6.0/24")),
            host("h3", "10.0.0.3", Some("192.168.3.0/24")),
        ];

        let desired = build_desired(&local, &hosts, IFACE);

        assert_eq!(desired.routes.len(), 2);
        assert_eq!(desired.rejected.len(), 2);
        for err in &desired.rejected {
            assert!(matches!(
                err,
                RouteSyncError::MalformedTopology { .. }
            ));
        }
    }

    #[test]
    fn test_subnet_label_host_bits_masked() {
        let local = host("h1", "10.0.0.1", None);
        let hosts = vec![host("h2", "10.0.0.2", Some("192.168.2.17/24"))];

        let desired = build_desired(&local, &hosts, IFACE);
        let gw: Ipv4Addr = "10.0.0.2".parse().unwrap();
        assert_eq!(
            desired.routes.get(&gw).unwrap().destination,
            Ipv4Addr::new(192, 168, 2, 0)
        );
    }
}
