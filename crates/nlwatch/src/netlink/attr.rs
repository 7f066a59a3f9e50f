//! Netlink attribute (rtattr/nlattr) decoding.
//!
//! [`AttrDecoder`] walks the attribute stream that follows a message's fixed
//! header and yields a closed set of typed values. Which type codes carry an
//! address, a link-layer address or a name depends on the message kind and is
//! described by an [`AttrTable`].

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::error::DecodeError;
use crate::util::addr::{AddressFamily, LinkLayerAddress, RawAddress};

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4;

/// Largest payload whose length still fits the 16-bit `nla_len`.
pub const NLA_MAX_PAYLOAD: usize = u16::MAX as usize - NLA_HDRLEN;

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

/// Netlink attribute header (mirrors struct nlattr / struct rtattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header.
    pub nla_len: u16,
    /// Attribute type.
    pub nla_type: u16,
}

impl NlAttr {
    /// Create a new attribute header.
    ///
    /// # Panics
    ///
    /// Panics if `data_len` exceeds [`NLA_MAX_PAYLOAD`].
    pub fn new(attr_type: u16, data_len: usize) -> Self {
        let Ok(nla_len) = u16::try_from(NLA_HDRLEN + data_len) else {
            panic!("attribute payload of {data_len} bytes exceeds {NLA_MAX_PAYLOAD}");
        };
        Self {
            nla_len,
            nla_type: attr_type,
        }
    }

    /// Get the attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<&Self, DecodeError> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| DecodeError::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Attribute layout of one message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrTable {
    /// Highest type code the kind defines; anything above is skipped.
    pub max: u16,
    /// Type code holding the IP address.
    pub address: Option<u16>,
    /// Type code holding the link-layer address.
    pub lladdr: Option<u16>,
    /// Type code holding a name string.
    pub name: Option<u16>,
}

/// Neighbor attributes (NDA_*).
pub const NEIGH_ATTRS: AttrTable = AttrTable {
    max: 17,          // NDA_NDM_FLAGS_MASK
    address: Some(1), // NDA_DST
    lladdr: Some(2),  // NDA_LLADDR
    name: None,
};

/// Address attributes (IFA_*).
pub const ADDR_ATTRS: AttrTable = AttrTable {
    max: 11,          // IFA_PROTO
    address: Some(1), // IFA_ADDRESS
    lladdr: None,
    name: None,
};

/// Link attributes (IFLA_*).
pub const LINK_ATTRS: AttrTable = AttrTable {
    max: 65,
    address: None,
    lladdr: None,
    name: Some(3), // IFLA_IFNAME
};

/// A decoded attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute<'a> {
    /// IPv4/IPv6 address, width checked against the message family.
    Address(RawAddress),
    /// Ethernet address, exactly six bytes.
    LinkLayer(LinkLayerAddress),
    /// NUL-terminated name with the terminator stripped.
    Name(&'a str),
    /// Any other known type code, undecoded.
    Opaque { kind: u16, data: &'a [u8] },
}

/// Single-pass decoder over an attribute stream.
///
/// Yields `Err` once for a malformed record and then stops.
pub struct AttrDecoder<'a> {
    data: &'a [u8],
    table: &'a AttrTable,
    family: AddressFamily,
}

impl<'a> AttrDecoder<'a> {
    /// Create a decoder. `family` sets the expected address width; with
    /// [`AddressFamily::Unspecified`] the width comes from the payload.
    pub fn new(data: &'a [u8], table: &'a AttrTable, family: AddressFamily) -> Self {
        Self {
            data,
            table,
            family,
        }
    }

    /// Check if there are no more attributes.
    pub fn is_empty(&self) -> bool {
        self.data.len() < NLA_HDRLEN
    }

    fn next_record(&mut self) -> Result<Option<(u16, &'a [u8])>, DecodeError> {
        loop {
            if self.is_empty() {
                return Ok(None);
            }

            let attr = NlAttr::from_bytes(self.data)?;
            let len = attr.nla_len as usize;
            if len < NLA_HDRLEN || len > self.data.len() {
                return Err(DecodeError::AttributeOverrun {
                    kind: attr.kind(),
                    declared: len,
                    remaining: self.data.len(),
                });
            }

            let kind = attr.kind();
            let payload = &self.data[NLA_HDRLEN..len];
            let aligned_len = nla_align(len);
            self.data = self.data.get(aligned_len..).unwrap_or(&[]);

            if kind > self.table.max {
                tracing::trace!(kind, max = self.table.max, "skipping unknown attribute");
                continue;
            }
            return Ok(Some((kind, payload)));
        }
    }

    fn decode(&self, kind: u16, data: &'a [u8]) -> Result<Attribute<'a>, DecodeError> {
        if Some(kind) == self.table.address {
            return decode_address(kind, data, self.family).map(Attribute::Address);
        }
        if Some(kind) == self.table.lladdr {
            let octets: [u8; LinkLayerAddress::LEN] =
                data.try_into().map_err(|_| DecodeError::PayloadSize {
                    kind,
                    expected: LinkLayerAddress::LEN,
                    actual: data.len(),
                })?;
            return Ok(Attribute::LinkLayer(LinkLayerAddress(octets)));
        }
        if Some(kind) == self.table.name {
            return decode_name(kind, data).map(Attribute::Name);
        }
        Ok(Attribute::Opaque { kind, data })
    }
}

impl<'a> Iterator for AttrDecoder<'a> {
    type Item = Result<Attribute<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.next_record() {
            Ok(Some((kind, data))) => self.decode(kind, data),
            Ok(None) => return None,
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.data = &[];
        }
        Some(result)
    }
}

fn decode_address(
    kind: u16,
    data: &[u8],
    family: AddressFamily,
) -> Result<RawAddress, DecodeError> {
    let family = match family {
        AddressFamily::Unspecified if data.len() == 16 => AddressFamily::Ipv6,
        AddressFamily::Unspecified => AddressFamily::Ipv4,
        f => f,
    };
    RawAddress::from_bytes(family, data).ok_or(DecodeError::PayloadSize {
        kind,
        expected: family.width().unwrap_or(0),
        actual: data.len(),
    })
}

fn decode_name(kind: u16, data: &[u8]) -> Result<&str, DecodeError> {
    let Some((&0, text)) = data.split_last() else {
        return Err(DecodeError::InvalidString { kind });
    };
    // An embedded NUL would silently shorten the name.
    if text.contains(&0) {
        return Err(DecodeError::InvalidString { kind });
    }
    std::str::from_utf8(text).map_err(|_| DecodeError::InvalidString { kind })
}
