//! Netlink neighbor queries and address-change monitoring for Linux.
//!
//! Two engines sit on top of an async rtnetlink transport:
//!
//! - [`netlink::neigh::NeighborQuery`] dumps the neighbor (ARP/NDP) table and
//!   filters it by family, interface, link-layer address and prefix.
//! - [`netlink::events::AddressWatcher`] follows address additions and
//!   removals on one interface.
//!
//! Prefix handling lives in [`util::cidr`]; it works on raw address bytes and
//! is usable without any socket.
//!
//! # Features
//!
//! - `serde` - `Serialize` for records and events
//! - `integration` - integration tests against the running kernel
//!
//! # Example
//!
//! ```ignore
//! use nlwatch::netlink::neigh::NeighborQuery;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> nlwatch::Result<()> {
//!     let query = NeighborQuery::from_text("4", "eth0", "", "192.168.0.0/16")?;
//!     for neighbor in query.execute().await? {
//!         println!("{}", neighbor);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Address Monitoring
//!
//! ```ignore
//! use nlwatch::netlink::events::{AddressWatcher, WatchConfig};
//!
//! let mut watcher = AddressWatcher::new(WatchConfig::new("eth0"))?;
//! loop {
//!     let event = watcher.next_event().await?;
//!     println!("{:?}", event.env());
//! }
//! ```

pub mod netlink;
pub mod util;

// Re-export common types at crate root for convenience
pub use netlink::{Connection, Error, ErrorKind, Result};
