//! Async rtnetlink transport, message decoding and the query/watch engines.
//!
//! # Layers
//!
//! - [`message`], [`attr`] and [`types`] decode kernel messages without
//!   copying headers; every attribute access is bounds-checked.
//! - [`Connection`] owns one socket and runs dump or notification traffic.
//! - [`neigh`], [`link`] and [`events`] turn messages into records.
//!
//! # Quick Start
//!
//! ```ignore
//! use nlwatch::netlink::Connection;
//!
//! let conn = Connection::new()?;
//! for iface in conn.get_interfaces().await? {
//!     println!("{}: {}", iface.index, iface.name);
//! }
//! ```

pub mod attr;
mod builder;
pub mod connection;
mod error;
pub mod events;
#[cfg(test)]
mod fixtures;
pub mod link;
pub mod message;
pub mod neigh;
mod socket;
pub mod types;

pub use attr::{AttrDecoder, AttrTable, Attribute, NlAttr};
pub use builder::MessageBuilder;
pub use connection::Connection;
pub use error::{DecodeError, Error, ErrorKind, Result};
pub use events::{
    AddressChangeEvent, AddressEventFilter, AddressWatcher, InterfaceResolver, LinkResolver,
    Operation, WatchConfig,
};
pub use link::InterfaceEntry;
pub use message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use neigh::{NeighborQuery, NeighborRecord};
pub use socket::NetlinkSocket;
