//! Shared address utilities for nlwatch.

pub mod addr;
pub mod cidr;

pub use addr::{AddrError, AddressFamily, LinkLayerAddress, RawAddress, parse_mac};
pub use cidr::{Cidr, USELESS_DESTINATIONS, is_useless_destination};
