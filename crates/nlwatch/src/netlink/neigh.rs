//! Neighbor (ARP/NDP) table queries.
//!
//! A [`NeighborQuery`] runs one `RTM_GETNEIGH` dump and narrows the result
//! with the filters it carries. Entries that can never identify a usable
//! peer are always dropped first: those without a link-layer address and
//! those whose destination is multicast, loopback or unspecified.
//!
//! # Example
//!
//! ```ignore
//! use nlwatch::netlink::neigh::NeighborQuery;
//! use nlwatch::util::{AddressFamily, Cidr};
//!
//! let neighbors = NeighborQuery::new()
//!     .family(AddressFamily::Ipv4)
//!     .interface_name("eth0")
//!     .cidr("192.168.0.0/16".parse::<Cidr>()?)
//!     .execute()
//!     .await?;
//!
//! for n in &neighbors {
//!     println!("{}", n);
//! }
//! ```

use std::fmt;

use super::attr::{AttrDecoder, Attribute, NEIGH_ATTRS};
use super::connection::{Connection, dump_request};
use super::error::{DecodeError, Error, Result};
use super::message::{NLMSG_HDRLEN, NlMsgType};
use super::types::neigh::{NdMsg, ntf, nud_state_name};
use crate::util::addr::{AddressFamily, LinkLayerAddress, RawAddress};
use crate::util::cidr::{Cidr, is_useless_destination};

/// One decoded neighbor table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NeighborRecord {
    /// Interface the entry belongs to.
    pub interface_index: u32,
    /// Address family of the destination.
    pub family: AddressFamily,
    /// Neighbor IP address.
    pub destination: RawAddress,
    /// Hardware address; [`LinkLayerAddress::UNSET`] when the kernel sent none.
    pub lladdr: LinkLayerAddress,
    /// NUD state bits.
    pub state: u16,
    /// Proxy entry (`NTF_PROXY`).
    pub is_proxy: bool,
    /// Neighbor is a router (`NTF_ROUTER`).
    pub is_router: bool,
}

impl NeighborRecord {
    /// NUD state name (`REACHABLE`, `STALE`, ...).
    pub fn state_name(&self) -> &'static str {
        nud_state_name(self.state)
    }

    /// Whether this entry is worth reporting at all.
    pub fn is_useful(&self) -> bool {
        !self.lladdr.is_unset() && !is_useless_destination(self.destination)
    }
}

impl fmt::Display for NeighborRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.destination.fmt(f)
    }
}

/// Decode one `RTM_NEWNEIGH` message (header included).
///
/// Returns `Ok(None)` for families other than IPv4 and IPv6, such as bridge
/// FDB entries.
pub fn parse_neighbor(msg: &[u8]) -> std::result::Result<Option<NeighborRecord>, DecodeError> {
    let payload = msg.get(NLMSG_HDRLEN..).ok_or(DecodeError::Truncated {
        expected: NLMSG_HDRLEN,
        actual: msg.len(),
    })?;
    let ndm = NdMsg::from_bytes(payload)?;
    let family = match AddressFamily::from_wire(ndm.ndm_family) {
        Some(f @ (AddressFamily::Ipv4 | AddressFamily::Ipv6)) => f,
        _ => return Ok(None),
    };

    let mut destination = None;
    let mut lladdr = LinkLayerAddress::UNSET;
    let attrs = payload.get(NdMsg::SIZE..).unwrap_or(&[]);
    for attr in AttrDecoder::new(attrs, &NEIGH_ATTRS, family) {
        match attr? {
            Attribute::Address(addr) => destination = Some(addr),
            Attribute::LinkLayer(mac) => lladdr = mac,
            _ => {}
        }
    }

    Ok(Some(NeighborRecord {
        interface_index: ndm.ndm_ifindex as u32,
        family,
        destination: destination.ok_or(DecodeError::MissingAttribute("NDA_DST"))?,
        lladdr,
        state: ndm.ndm_state,
        is_proxy: ndm.ndm_flags & ntf::PROXY != 0,
        is_router: ndm.ndm_flags & ntf::ROUTER != 0,
    }))
}

/// Filters for a neighbor table query.
///
/// Every filter only narrows the result. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborQuery {
    family: AddressFamily,
    interface_index: Option<u32>,
    interface_name: Option<String>,
    lladdr: Option<LinkLayerAddress>,
    cidr: Option<Cidr>,
}

impl NeighborQuery {
    /// Query matching every useful entry of every family.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a query from user text. Empty strings leave a filter unset.
    ///
    /// Fails before touching the network if any value is malformed.
    pub fn from_text(family: &str, interface: &str, lladdr: &str, cidr: &str) -> Result<Self> {
        let mut query = Self::new().family(AddressFamily::from_selector(family)?);
        if !interface.is_empty() {
            query = query.interface_name(interface);
        }
        if !lladdr.is_empty() {
            query = query.lladdr(lladdr.parse()?);
        }
        if !cidr.is_empty() {
            query = query.cidr(cidr.parse()?);
        }
        Ok(query)
    }

    /// Restrict the dump to one address family.
    pub fn family(mut self, family: AddressFamily) -> Self {
        self.family = family;
        self
    }

    /// Only entries on this interface index.
    pub fn interface_index(mut self, index: u32) -> Self {
        self.interface_index = Some(index);
        self.interface_name = None;
        self
    }

    /// Only entries on the interface with this name, resolved at query time.
    pub fn interface_name(mut self, name: impl Into<String>) -> Self {
        self.interface_name = Some(name.into());
        self.interface_index = None;
        self
    }

    /// Only entries with this hardware address. The all-zero address
    /// disables the filter.
    pub fn lladdr(mut self, lladdr: LinkLayerAddress) -> Self {
        self.lladdr = (!lladdr.is_unset()).then_some(lladdr);
        self
    }

    /// Only entries whose destination lies inside this prefix.
    pub fn cidr(mut self, cidr: Cidr) -> Self {
        self.cidr = Some(cidr);
        self
    }

    /// The family the dump is scoped to.
    pub fn address_family(&self) -> AddressFamily {
        self.family
    }

    /// Whether a decoded record passes every filter.
    pub fn matches(&self, record: &NeighborRecord) -> bool {
        if !record.is_useful() {
            return false;
        }
        if self.family != AddressFamily::Unspecified && record.family != self.family {
            return false;
        }
        if let Some(index) = self.interface_index
            && record.interface_index != index
        {
            return false;
        }
        if let Some(lladdr) = self.lladdr
            && record.lladdr != lladdr
        {
            return false;
        }
        if let Some(cidr) = &self.cidr
            && !cidr.contains(&Cidr::host(record.destination))
        {
            return false;
        }
        true
    }

    /// Decode and filter the messages of a neighbor dump, keeping dump order.
    ///
    /// An interface name filter must already be resolved; this stage only
    /// compares indices. Messages that fail to decode are skipped.
    pub fn collect(&self, responses: &[Vec<u8>]) -> Vec<NeighborRecord> {
        let mut records = Vec::new();
        for msg in responses {
            match parse_neighbor(msg) {
                Ok(Some(record)) if self.matches(&record) => records.push(record),
                Ok(Some(record)) => {
                    tracing::trace!(destination = %record.destination, "neighbor filtered out");
                }
                Ok(None) => tracing::trace!("skipping non-IP neighbor entry"),
                Err(e) => tracing::warn!(error = %e, "skipping malformed neighbor message"),
            }
        }
        records
    }

    /// Run the query on a connection owned by this call.
    pub async fn execute(&self) -> Result<Vec<NeighborRecord>> {
        let conn = Connection::new()?;
        conn.query_neighbors(self).await
    }
}

impl Connection {
    /// Dump the neighbor table and apply the query's filters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`] if the query names an interface
    /// that does not exist.
    pub async fn query_neighbors(&self, query: &NeighborQuery) -> Result<Vec<NeighborRecord>> {
        let resolved;
        let query = match &query.interface_name {
            Some(name) => {
                let index = self
                    .resolve_interface(name)
                    .await?
                    .ok_or_else(|| Error::InterfaceNotFound { name: name.clone() })?;
                resolved = query.clone().interface_index(index);
                &resolved
            }
            None => query,
        };

        let mut builder = dump_request(NlMsgType::RTM_GETNEIGH);
        builder.append(&NdMsg::new().with_family(query.family.as_u8()));
        tracing::debug!(family = ?query.family, "dumping neighbor table");

        let responses = self.dump(builder).await?;
        Ok(query.collect(&responses))
    }
}
