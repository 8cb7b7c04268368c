//! IPv4 subnet type with safe parsing.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 network in CIDR notation (e.g., 192.168.2.0/24).
///
/// The network address is always stored with host bits cleared, so
/// `"192.168.2.5/24"` parses to `192.168.2.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubnetV4 {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl SubnetV4 {
    /// Creates a new subnet, masking any host bits off the address.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix length exceeds 32.
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, ParseError> {
        if prefix_len > 32 {
            return Err(ParseError::InvalidPrefixLen(prefix_len));
        }

        let mask = prefix_mask(prefix_len);
        let network = Ipv4Addr::from(u32::from(address) & u32::from(mask));

        Ok(SubnetV4 {
            network,
            prefix_len,
        })
    }

    /// Returns the network address of this subnet.
    pub const fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Returns the prefix length in bits.
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns the subnet mask in dotted form (e.g., 255.255.255.0).
    pub fn mask(&self) -> Ipv4Addr {
        prefix_mask(self.prefix_len)
    }

    /// Returns true if the given address falls within this subnet.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & u32::from(self.mask()) == u32::from(self.network)
    }
}

fn prefix_mask(prefix_len: u8) -> Ipv4Addr {
    // Shifting u32 by 32 is undefined, guard the /0 case.
    let bits = if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len))
    };
    Ipv4Addr::from(bits)
}

impl fmt::Display for SubnetV4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for SubnetV4 {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, len_str) = s
            .rsplit_once('/')
            .ok_or_else(|| ParseError::InvalidSubnet(s.to_string()))?;

        let address: Ipv4Addr = addr_str
            .parse()
            .map_err(|_| ParseError::InvalidSubnet(s.to_string()))?;
        let prefix_len: u8 = len_str
            .parse()
            .map_err(|_| ParseError::InvalidSubnet(s.to_string()))?;

        SubnetV4::new(address, prefix_len)
    }
}
