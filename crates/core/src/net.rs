//! Interface addressing: an IP address as configured on a network interface.
//!
//! `InterfaceIpAddress` is a plain value: two instances are equal when all of
//! their fields are equal. Optional addresses are modelled with `Option`, so
//! "no broadcast address" has exactly one representation.
//!
//! No default broadcast address is derived from the subnet. Callers that want
//! one must supply it explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::AddressError;

/// An IP network prefix (`address/len`) with host bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpPrefix {
    address: IpAddr,
    prefix_len: u8,
}

impl IpPrefix {
    pub fn new(address: IpAddr, prefix_len: u8) -> Result<Self, AddressError> {
        let max = max_prefix_len(&address);
        if prefix_len > max {
            return Err(AddressError::PrefixTooLong { len: prefix_len, max });
        }
        Ok(Self {
            address: mask(address, prefix_len),
            prefix_len,
        })
    }

    /// The network address (host bits zeroed).
    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Whether `ip` falls inside this prefix.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        same_family(&self.address, ip) && mask(*ip, self.prefix_len) == self.address
    }
}

fn max_prefix_len(address: &IpAddr) -> u8 {
    match address {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask(address: IpAddr, prefix_len: u8) -> IpAddr {
    match address {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let mask = u32::MAX.checked_shl(32 - u32::from(prefix_len)).unwrap_or(0);
            IpAddr::V4(Ipv4Addr::from(bits & mask))
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let mask = u128::MAX.checked_shl(128 - u32::from(prefix_len)).unwrap_or(0);
            IpAddr::V6(Ipv6Addr::from(bits & mask))
        }
    }
}

fn same_family(a: &IpAddr, b: &IpAddr) -> bool {
    a.is_ipv4() == b.is_ipv4()
}

impl FromStr for IpPrefix {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError::InvalidPrefix(s.to_string());
        let (addr, len) = s.split_once('/').ok_or_else(invalid)?;
        let address: IpAddr = addr.trim().parse().map_err(|_| invalid())?;
        let prefix_len: u8 = len.trim().parse().map_err(|_| invalid())?;
        Self::new(address, prefix_len)
    }
}

impl TryFrom<String> for IpPrefix {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IpPrefix> for String {
    fn from(prefix: IpPrefix) -> Self {
        prefix.to_string()
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// A single IP address configured on an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "InterfaceIpAddressRaw")]
pub struct InterfaceIpAddress {
    ip_address: IpAddr,
    subnet_address: IpPrefix,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    broadcast_address: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    peer_address: Option<IpAddr>,
}

impl InterfaceIpAddress {
    /// A regular interface address with no broadcast or peer address.
    pub fn new(ip_address: IpAddr, subnet_address: IpPrefix) -> Result<Self, AddressError> {
        if !same_family(&ip_address, &subnet_address.address()) {
            return Err(AddressError::VersionMismatch {
                field: "subnet_address",
            });
        }
        Ok(Self {
            ip_address,
            subnet_address,
            broadcast_address: None,
            peer_address: None,
        })
    }

    /// Set a non-default broadcast address.
    pub fn with_broadcast(self, broadcast: IpAddr) -> Result<Self, AddressError> {
        if !same_family(&self.ip_address, &broadcast) {
            return Err(AddressError::VersionMismatch {
                field: "broadcast_address",
            });
        }
        Ok(Self {
            broadcast_address: Some(broadcast),
            ..self
        })
    }

    /// Set the peer address of a point-to-point interface.
    pub fn with_peer(self, peer: IpAddr) -> Result<Self, AddressError> {
        if !same_family(&self.ip_address, &peer) {
            return Err(AddressError::VersionMismatch {
                field: "peer_address",
            });
        }
        Ok(Self {
            peer_address: Some(peer),
            ..self
        })
    }

    pub fn ip_address(&self) -> IpAddr {
        self.ip_address
    }

    pub fn subnet_address(&self) -> IpPrefix {
        self.subnet_address
    }

    pub fn broadcast_address(&self) -> Option<IpAddr> {
        self.broadcast_address
    }

    pub fn peer_address(&self) -> Option<IpAddr> {
        self.peer_address
    }

    /// Point-to-point interfaces carry a peer address.
    pub fn is_point_to_point(&self) -> bool {
        self.peer_address.is_some()
    }
}

/// Wire form, checked through the constructors on the way in.
#[derive(Deserialize)]
struct InterfaceIpAddressRaw {
    ip_address: IpAddr,
    subnet_address: IpPrefix,
    #[serde(default)]
    broadcast_address: Option<IpAddr>,
    #[serde(default)]
    peer_address: Option<IpAddr>,
}

impl TryFrom<InterfaceIpAddressRaw> for InterfaceIpAddress {
    type Error = AddressError;

    fn try_from(raw: InterfaceIpAddressRaw) -> Result<Self, Self::Error> {
        let mut address = Self::new(raw.ip_address, raw.subnet_address)?;
        if let Some(broadcast) = raw.broadcast_address {
            address = address.with_broadcast(broadcast)?;
        }
        if let Some(peer) = raw.peer_address {
            address = address.with_peer(peer)?;
        }
        Ok(address)
    }
}

/// Formats like iproute2: `1.2.3.4 subnet 1.2.0.0/16 brd 1.2.0.255 peer 5.6.7.8`,
/// omitting absent fields.
impl fmt::Display for InterfaceIpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} subnet {}", self.ip_address, self.subnet_address)?;
        if let Some(brd) = self.broadcast_address {
            write!(f, " brd {brd}")?;
        }
        if let Some(peer) = self.peer_address {
            write!(f, " peer {peer}")?;
        }
        Ok(())
    }
}
