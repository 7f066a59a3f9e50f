//! Interface lookup through `RTM_GETLINK` dumps.
//!
//! Nothing here is cached; every lookup runs a fresh dump.

use super::attr::{AttrDecoder, Attribute, LINK_ATTRS};
use super::connection::{Connection, dump_request};
use super::error::{DecodeError, Result};
use super::message::{NLMSG_HDRLEN, NlMsgType};
use super::types::link::IfInfoMsg;
use crate::util::addr::AddressFamily;

/// One network interface as reported by a link dump.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InterfaceEntry {
    /// Interface name.
    pub name: String,
    /// Kernel interface index.
    pub index: u32,
}

/// Decode one `RTM_NEWLINK` message (header included).
pub fn parse_link(msg: &[u8]) -> std::result::Result<InterfaceEntry, DecodeError> {
    let payload = msg.get(NLMSG_HDRLEN..).ok_or(DecodeError::Truncated {
        expected: NLMSG_HDRLEN,
        actual: msg.len(),
    })?;
    let ifinfo = IfInfoMsg::from_bytes(payload)?;
    let attrs = payload.get(IfInfoMsg::SIZE..).unwrap_or(&[]);

    let mut name = None;
    for attr in AttrDecoder::new(attrs, &LINK_ATTRS, AddressFamily::Unspecified) {
        if let Attribute::Name(n) = attr? {
            name = Some(n.to_string());
        }
    }

    Ok(InterfaceEntry {
        name: name.ok_or(DecodeError::MissingAttribute("IFLA_IFNAME"))?,
        index: ifinfo.ifi_index as u32,
    })
}

/// Decode a link dump, dropping messages that fail to decode.
pub fn parse_links(responses: &[Vec<u8>]) -> Vec<InterfaceEntry> {
    responses
        .iter()
        .filter_map(|msg| match parse_link(msg) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed link message");
                None
            }
        })
        .collect()
}

/// Index of the interface called `name`, if present.
pub fn find_index(interfaces: &[InterfaceEntry], name: &str) -> Option<u32> {
    interfaces.iter().find(|i| i.name == name).map(|i| i.index)
}

impl Connection {
    /// Get all network interfaces.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let conn = Connection::new()?;
    /// for iface in conn.get_interfaces().await? {
    ///     println!("{}: {}", iface.index, iface.name);
    /// }
    /// ```
    pub async fn get_interfaces(&self) -> Result<Vec<InterfaceEntry>> {
        let mut builder = dump_request(NlMsgType::RTM_GETLINK);
        builder.append(&IfInfoMsg::new().with_family(libc::AF_PACKET as u8));
        let responses = self.dump(builder).await?;
        Ok(parse_links(&responses))
    }

    /// Resolve an interface name to its index.
    ///
    /// Returns `None` if no interface has that name.
    pub async fn resolve_interface(&self, name: &str) -> Result<Option<u32>> {
        let interfaces = self.get_interfaces().await?;
        let index = find_index(&interfaces, name);
        tracing::trace!(name, ?index, "resolved interface");
        Ok(index)
    }
}
