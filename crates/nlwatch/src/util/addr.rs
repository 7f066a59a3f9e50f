//! Address families, raw address bytes and link-layer addresses.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use winnow::combinator::separated;
use winnow::prelude::*;
use winnow::stream::AsChar;
use winnow::token::take_while;

/// Error type for address parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddrError {
    #[error("missing '/' in prefix: {0}")]
    MissingSlash(String),

    #[error("invalid prefix format: {0}")]
    InvalidFormat(String),

    #[error("prefix length {len} exceeds maximum {max} for address family")]
    PrefixOutOfRange { len: u32, max: u8 },

    #[error("invalid address: {0}")]
    UnrecognizedAddress(String),

    #[error("invalid MAC address: {0}")]
    InvalidMac(String),

    #[error("invalid address family: {0}")]
    InvalidFamily(String),
}

pub type Result<T> = std::result::Result<T, AddrError>;

/// Address family of a record or request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
    #[default]
    Unspecified,
}

impl AddressFamily {
    /// Kernel `AF_*` value.
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Ipv4 => libc::AF_INET as u8,
            Self::Ipv6 => libc::AF_INET6 as u8,
            Self::Unspecified => libc::AF_UNSPEC as u8,
        }
    }

    /// Map a kernel `AF_*` value. Families other than inet/inet6/unspec
    /// (bridge, packet, ...) yield `None`.
    pub const fn from_wire(family: u8) -> Option<Self> {
        match family as i32 {
            libc::AF_INET => Some(Self::Ipv4),
            libc::AF_INET6 => Some(Self::Ipv6),
            libc::AF_UNSPEC => Some(Self::Unspecified),
            _ => None,
        }
    }

    /// Address width in bytes.
    pub const fn width(self) -> Option<usize> {
        match self {
            Self::Ipv4 => Some(4),
            Self::Ipv6 => Some(16),
            Self::Unspecified => None,
        }
    }

    /// Maximum prefix length in bits.
    pub const fn max_prefix_len(self) -> Option<u8> {
        match self {
            Self::Ipv4 => Some(32),
            Self::Ipv6 => Some(128),
            Self::Unspecified => None,
        }
    }

    /// Parse a user family selector (`4`, `6`, or empty/`any` for all families).
    pub fn from_selector(s: &str) -> Result<Self> {
        match s.trim() {
            "4" | "inet" | "ipv4" => Ok(Self::Ipv4),
            "6" | "inet6" | "ipv6" => Ok(Self::Ipv6),
            "" | "0" | "any" | "unspec" => Ok(Self::Unspecified),
            other => Err(AddrError::InvalidFamily(other.to_string())),
        }
    }

    /// Name used in the `FAMILY` environment value.
    pub const fn env_name(self) -> &'static str {
        match self {
            Self::Ipv4 => "AF_INET",
            Self::Ipv6 => "AF_INET6",
            Self::Unspecified => "UNKNOWN",
        }
    }
}

/// IPv4 or IPv6 address bytes in network order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawAddress {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl RawAddress {
    /// Build from wire bytes. The byte count must match the family width exactly.
    pub fn from_bytes(family: AddressFamily, data: &[u8]) -> Option<Self> {
        match family {
            AddressFamily::Ipv4 => data.try_into().ok().map(Self::V4),
            AddressFamily::Ipv6 => data.try_into().ok().map(Self::V6),
            AddressFamily::Unspecified => None,
        }
    }

    /// Family implied by the address width.
    pub fn family(&self) -> AddressFamily {
        match self {
            Self::V4(_) => AddressFamily::Ipv4,
            Self::V6(_) => AddressFamily::Ipv6,
        }
    }

    /// Address bytes in network order.
    pub fn octets(&self) -> &[u8] {
        match self {
            Self::V4(b) => b,
            Self::V6(b) => b,
        }
    }

    /// Convert to a std [`IpAddr`].
    pub fn to_ip(&self) -> IpAddr {
        match *self {
            Self::V4(b) => IpAddr::V4(Ipv4Addr::from(b)),
            Self::V6(b) => IpAddr::V6(Ipv6Addr::from(b)),
        }
    }
}

impl From<IpAddr> for RawAddress {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(a) => Self::V4(a.octets()),
            IpAddr::V6(a) => Self::V6(a.octets()),
        }
    }
}

impl From<Ipv4Addr> for RawAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self::V4(addr.octets())
    }
}

impl From<Ipv6Addr> for RawAddress {
    fn from(addr: Ipv6Addr) -> Self {
        Self::V6(addr.octets())
    }
}

impl fmt::Display for RawAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_ip().fmt(f)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RawAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LinkLayerAddress(pub [u8; 6]);

impl LinkLayerAddress {
    /// Size of an Ethernet address.
    pub const LEN: usize = 6;

    /// The all-zero address, used as the "not set" value.
    pub const UNSET: Self = Self([0; 6]);

    /// Check if this is the all-zero address.
    pub fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }

    /// Address bytes.
    pub fn octets(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for LinkLayerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for LinkLayerAddress {
    type Err = AddrError;

    fn from_str(s: &str) -> Result<Self> {
        parse_mac(s).map(Self)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for LinkLayerAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn hex_octet(input: &mut &str) -> winnow::Result<u8> {
    take_while(1..=2, AsChar::is_hex_digit)
        .try_map(|digits: &str| u8::from_str_radix(digits, 16))
        .parse_next(input)
}

fn mac_octets(input: &mut &str) -> winnow::Result<Vec<u8>> {
    separated(6, hex_octet, ':').parse_next(input)
}

/// Parse a MAC address (`xx:xx:xx:xx:xx:xx`, exactly six groups).
pub fn parse_mac(s: &str) -> Result<[u8; 6]> {
    let octets = mac_octets
        .parse(s)
        .map_err(|_| AddrError::InvalidMac(s.to_string()))?;
    octets
        .try_into()
        .map_err(|_| AddrError::InvalidMac(s.to_string()))
}
