//! CIDR prefixes and the containment test used by neighbor filtering.
//!
//! [`Cidr::contains`] works directly on address bytes and never allocates.
//! It checks that both prefixes share their first `min(a.len, b.len)` bits,
//! so it is symmetric: `a.contains(&b) == b.contains(&a)` for any pair of the
//! same family.
//!
//! # Example
//!
//! ```
//! use nlwatch::util::cidr::Cidr;
//!
//! let net: Cidr = "192.168.0.0/16".parse().unwrap();
//! let host: Cidr = "192.168.5.5/32".parse().unwrap();
//! assert!(net.contains(&host));
//! ```

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use super::addr::{AddrError, AddressFamily, RawAddress, Result};

/// An address plus a prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    address: RawAddress,
    prefix_len: u8,
}

/// Destinations that never identify a usable neighbor: multicast, loopback
/// and the unspecified addresses.
pub const USELESS_DESTINATIONS: [Cidr; 6] = [
    Cidr::raw(RawAddress::V4([224, 0, 0, 0]), 4),
    Cidr::raw(
        RawAddress::V6([0xff, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
        8,
    ),
    Cidr::raw(
        RawAddress::V6([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]),
        128,
    ),
    Cidr::raw(RawAddress::V4([127, 0, 0, 1]), 32),
    Cidr::raw(RawAddress::V4([0, 0, 0, 0]), 32),
    Cidr::raw(RawAddress::V6([0; 16]), 128),
];

impl Cidr {
    const fn raw(address: RawAddress, prefix_len: u8) -> Self {
        Self {
            address,
            prefix_len,
        }
    }

    /// Create a prefix, checking the length against the family width.
    pub fn new(address: RawAddress, prefix_len: u8) -> Result<Self> {
        let max = max_len(address.family());
        if prefix_len > max {
            return Err(AddrError::PrefixOutOfRange {
                len: prefix_len.into(),
                max,
            });
        }
        Ok(Self::raw(address, prefix_len))
    }

    /// Full-length prefix (`/32` or `/128`) for a single address.
    pub fn host(address: RawAddress) -> Self {
        Self::raw(address, max_len(address.family()))
    }

    /// Parse `addr/len`. The text is split on the last `/`.
    pub fn parse(s: &str) -> Result<Self> {
        let (addr_str, len_str) = s
            .rsplit_once('/')
            .ok_or_else(|| AddrError::MissingSlash(s.to_string()))?;

        if len_str.is_empty() || !len_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddrError::InvalidFormat(s.to_string()));
        }
        let len: u32 = len_str
            .parse()
            .map_err(|_| AddrError::InvalidFormat(s.to_string()))?;

        let address = if let Ok(v4) = addr_str.parse::<Ipv4Addr>() {
            RawAddress::from(v4)
        } else if let Ok(v6) = addr_str.parse::<Ipv6Addr>() {
            RawAddress::from(v6)
        } else {
            return Err(AddrError::UnrecognizedAddress(addr_str.to_string()));
        };

        let max = max_len(address.family());
        if len > u32::from(max) {
            return Err(AddrError::PrefixOutOfRange { len, max });
        }
        Ok(Self::raw(address, len as u8))
    }

    /// Address as given; host bits are not cleared.
    pub fn address(&self) -> &RawAddress {
        &self.address
    }

    /// Prefix length in bits.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Family of the network address.
    pub fn family(&self) -> AddressFamily {
        self.address.family()
    }

    /// Whether both prefixes agree on their first `min(self.len, other.len)` bits.
    ///
    /// Prefixes of different families never match.
    pub fn contains(&self, other: &Cidr) -> bool {
        if self.family() != other.family() {
            return false;
        }

        let a = self.address.octets();
        let b = other.address.octets();
        let bits = usize::from(self.prefix_len.min(other.prefix_len));
        let whole = bits / 8;

        if a[..whole] != b[..whole] {
            return false;
        }

        let rest = bits % 8;
        // rest != 0 implies whole < width, so the index is in bounds.
        rest == 0 || (a[whole] >> (8 - rest)) == (b[whole] >> (8 - rest))
    }
}

fn max_len(family: AddressFamily) -> u8 {
    family.max_prefix_len().unwrap_or(0)
}

/// Whether a neighbor destination is multicast, loopback or unspecified.
pub fn is_useless_destination(address: RawAddress) -> bool {
    let host = Cidr::host(address);
    USELESS_DESTINATIONS.iter().any(|net| net.contains(&host))
}

impl FromStr for Cidr {
    type Err = AddrError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}
