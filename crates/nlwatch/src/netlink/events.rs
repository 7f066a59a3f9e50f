//! Address change notifications for a single interface.
//!
//! [`AddressWatcher`] listens on the rtnetlink address multicast groups and
//! yields one [`AddressChangeEvent`] per `RTM_NEWADDR` / `RTM_DELADDR` that
//! belongs to the configured interface. The interface name is resolved again
//! for every event and never cached.
//!
//! # Example
//!
//! ```ignore
//! use nlwatch::netlink::events::{AddressWatcher, WatchConfig};
//!
//! let mut watcher = AddressWatcher::new(WatchConfig::new("eth0"))?;
//! loop {
//!     let event = watcher.next_event().await?;
//!     for (key, value) in event.env() {
//!         println!("{key}={value}");
//!     }
//! }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;

use super::attr::{ADDR_ATTRS, AttrDecoder, Attribute};
use super::connection::Connection;
use super::error::{DecodeError, Error, Result};
use super::message::{MessageIter, NlMsgHdr, NlMsgType};
use super::types::addr::{IfAddrMsg, rtmgrp};
use crate::util::addr::{AddressFamily, RawAddress};

/// What to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    interface: String,
    ipv4: bool,
    ipv6: bool,
}

impl WatchConfig {
    /// Watch IPv4 and IPv6 address changes on `interface`.
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ipv4: true,
            ipv6: true,
        }
    }

    /// Receive IPv4 address events.
    pub fn ipv4(mut self, enabled: bool) -> Self {
        self.ipv4 = enabled;
        self
    }

    /// Receive IPv6 address events.
    pub fn ipv6(mut self, enabled: bool) -> Self {
        self.ipv6 = enabled;
        self
    }

    /// Select families from an [`AddressFamily`]; `Unspecified` means both.
    pub fn family(self, family: AddressFamily) -> Self {
        match family {
            AddressFamily::Ipv4 => self.ipv4(true).ipv6(false),
            AddressFamily::Ipv6 => self.ipv4(false).ipv6(true),
            AddressFamily::Unspecified => self.ipv4(true).ipv6(true),
        }
    }

    /// Interface name being watched.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Multicast group mask to bind. Selecting neither family selects both.
    pub fn groups(&self) -> u32 {
        match (self.ipv4, self.ipv6) {
            (true, false) => rtmgrp::IPV4_IFADDR,
            (false, true) => rtmgrp::IPV6_IFADDR,
            _ => rtmgrp::IPV4_IFADDR | rtmgrp::IPV6_IFADDR,
        }
    }
}

/// Address added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Operation {
    New,
    Del,
}

impl Operation {
    fn from_msg_type(msg_type: u16) -> Option<Self> {
        match msg_type {
            NlMsgType::RTM_NEWADDR => Some(Self::New),
            NlMsgType::RTM_DELADDR => Some(Self::Del),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Del => "DEL",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One address change on the watched interface.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AddressChangeEvent {
    pub operation: Operation,
    /// Family from the message header.
    pub family: AddressFamily,
    /// `IFA_ADDRESS`, if the kernel sent one.
    pub address: Option<RawAddress>,
}

impl AddressChangeEvent {
    /// Presentation form of the address.
    ///
    /// Without an address this is `AF_INET6` for IPv6 messages and empty
    /// otherwise.
    pub fn value(&self) -> String {
        match (&self.address, self.family) {
            (Some(addr), _) => addr.to_string(),
            (None, AddressFamily::Ipv6) => AddressFamily::Ipv6.env_name().to_string(),
            (None, _) => String::new(),
        }
    }

    /// The `OPTYPE`, `FAMILY` and `VALUE` variables handed to a consumer.
    pub fn env(&self) -> [(&'static str, String); 3] {
        [
            ("OPTYPE", self.operation.as_str().to_string()),
            ("FAMILY", self.family.env_name().to_string()),
            ("VALUE", self.value()),
        ]
    }
}

/// Decode an address notification.
///
/// Returns the interface index with the event, or `Ok(None)` for message
/// types other than `RTM_NEWADDR` / `RTM_DELADDR`.
pub fn parse_address(
    header: &NlMsgHdr,
    payload: &[u8],
) -> std::result::Result<Option<(u32, AddressChangeEvent)>, DecodeError> {
    let Some(operation) = Operation::from_msg_type(header.nlmsg_type) else {
        return Ok(None);
    };
    let ifa = IfAddrMsg::from_bytes(payload)?;
    let family = AddressFamily::from_wire(ifa.ifa_family).unwrap_or_default();

    let mut address = None;
    let attrs = payload.get(IfAddrMsg::SIZE..).unwrap_or(&[]);
    for attr in AttrDecoder::new(attrs, &ADDR_ATTRS, family) {
        if let Attribute::Address(addr) = attr? {
            address = Some(addr);
        }
    }

    Ok(Some((
        ifa.ifa_index,
        AddressChangeEvent {
            operation,
            family,
            address,
        },
    )))
}

/// Maps an interface name to its current index.
pub trait InterfaceResolver {
    /// `Ok(None)` when no interface has that name.
    fn resolve(&self, name: &str) -> impl Future<Output = Result<Option<u32>>>;
}

/// Resolves names with a fresh link dump on a short-lived socket per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkResolver;

impl InterfaceResolver for LinkResolver {
    async fn resolve(&self, name: &str) -> Result<Option<u32>> {
        let conn = Connection::new()?;
        conn.resolve_interface(name).await
    }
}

/// Turns notification datagrams into events for one interface.
#[derive(Debug)]
pub struct AddressEventFilter<R> {
    interface: String,
    resolver: R,
}

impl<R: InterfaceResolver> AddressEventFilter<R> {
    pub fn new(interface: impl Into<String>, resolver: R) -> Self {
        Self {
            interface: interface.into(),
            resolver,
        }
    }

    /// Append the events in `data` that belong to the watched interface to
    /// `out`, in order.
    ///
    /// Undecodable messages and messages for other interfaces are dropped.
    /// If the interface name does not resolve, the event is dropped as well.
    /// Only resolver failures are returned as errors; events accepted before
    /// the failure stay in `out`.
    pub async fn events_into(
        &self,
        data: &[u8],
        out: &mut VecDeque<AddressChangeEvent>,
    ) -> Result<()> {
        for result in MessageIter::new(data) {
            let (header, payload) = match result {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping rest of malformed datagram");
                    break;
                }
            };

            let (index, event) = match parse_address(header, payload) {
                Ok(Some(parsed)) => parsed,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed address message");
                    continue;
                }
            };

            let Some(wanted) = self.resolver.resolve(&self.interface).await? else {
                tracing::trace!(interface = %self.interface, "interface not present, event dropped");
                continue;
            };
            if index != wanted {
                tracing::trace!(index, wanted, "event for another interface");
                continue;
            }

            out.push_back(event);
        }
        Ok(())
    }
}

/// Accepted events waiting to be handed out, and a failure to report once
/// they are gone.
#[derive(Debug, Default)]
struct PendingEvents {
    events: VecDeque<AddressChangeEvent>,
    error: Option<Error>,
}

impl PendingEvents {
    async fn fill<R: InterfaceResolver>(&mut self, filter: &AddressEventFilter<R>, data: &[u8]) {
        if let Err(e) = filter.events_into(data, &mut self.events).await {
            self.error = Some(e);
        }
    }

    fn pop(&mut self) -> Option<Result<AddressChangeEvent>> {
        if let Some(event) = self.events.pop_front() {
            return Some(Ok(event));
        }
        self.error.take().map(Err)
    }
}

/// Stream of address changes on one interface.
///
/// [`next_event`](Self::next_event) never reports end-of-stream; stop
/// watching by dropping the future or the watcher.
pub struct AddressWatcher<R = LinkResolver> {
    conn: Connection,
    filter: AddressEventFilter<R>,
    pending: PendingEvents,
}

impl AddressWatcher<LinkResolver> {
    /// Subscribe to the configured address groups.
    pub fn new(config: WatchConfig) -> Result<Self> {
        Self::with_resolver(config, LinkResolver)
    }
}

impl<R: InterfaceResolver> AddressWatcher<R> {
    /// Subscribe using a custom interface resolver.
    pub fn with_resolver(config: WatchConfig, resolver: R) -> Result<Self> {
        let conn = Connection::subscribe(config.groups())?;
        tracing::debug!(
            interface = %config.interface,
            groups = conn.socket().groups(),
            "watching address changes"
        );
        Ok(Self {
            conn,
            filter: AddressEventFilter::new(config.interface, resolver),
            pending: PendingEvents::default(),
        })
    }

    /// Wait for the next event on the watched interface.
    ///
    /// When a resolver failure interrupts a datagram, the events accepted
    /// from it are returned first and the error after them. The watcher
    /// stays usable afterwards.
    pub async fn next_event(&mut self) -> Result<AddressChangeEvent> {
        loop {
            if let Some(next) = self.pending.pop() {
                return next;
            }
            let data = self.conn.recv_event().await?;
            self.pending.fill(&self.filter, &data).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::netlink::ErrorKind;
    use crate::netlink::fixtures::{address, link};

    const AF_INET: u8 = libc::AF_INET as u8;
    const AF_INET6: u8 = libc::AF_INET6 as u8;

    /// Resolver returning a fixed answer and counting calls.
    struct Fixed {
        index: Option<u32>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(index: Option<u32>) -> Self {
            Self {
                index,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl InterfaceResolver for Fixed {
        async fn resolve(&self, _name: &str) -> Result<Option<u32>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(self.index)
        }
    }

    impl InterfaceResolver for &Fixed {
        async fn resolve(&self, name: &str) -> Result<Option<u32>> {
            (**self).resolve(name).await
        }
    }

    struct Broken;

    impl InterfaceResolver for Broken {
        async fn resolve(&self, _name: &str) -> Result<Option<u32>> {
            Err(Error::Io(io::Error::from(io::ErrorKind::ConnectionReset)))
        }
    }

    /// Resolves once, then fails like a dropped link dump.
    struct FailsAfterFirst {
        calls: AtomicUsize,
    }

    impl InterfaceResolver for FailsAfterFirst {
        async fn resolve(&self, _name: &str) -> Result<Option<u32>> {
            match self.calls.fetch_add(1, Ordering::Relaxed) {
                0 => Ok(Some(2)),
                _ => Err(Error::Io(io::Error::from(io::ErrorKind::ConnectionReset))),
            }
        }
    }

    async fn accepted<R: InterfaceResolver>(
        filter: &AddressEventFilter<R>,
        data: &[u8],
    ) -> Result<Vec<AddressChangeEvent>> {
        let mut out = VecDeque::new();
        filter.events_into(data, &mut out).await?;
        Ok(out.into())
    }

    fn v6(s: &str) -> [u8; 16] {
        s.parse::<std::net::Ipv6Addr>().unwrap().octets()
    }

    #[tokio::test]
    async fn test_new_ipv4_event() {
        let filter = AddressEventFilter::new("eth0", Fixed::new(Some(2)));
        let data = address(NlMsgType::RTM_NEWADDR, AF_INET, 2, Some(&[192, 168, 1, 5]));
        let events = accepted(&filter, &data).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].env(),
            [
                ("OPTYPE", "NEW".to_string()),
                ("FAMILY", "AF_INET".to_string()),
                ("VALUE", "192.168.1.5".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_del_ipv6_event() {
        let filter = AddressEventFilter::new("eth0", Fixed::new(Some(3)));
        let data = address(NlMsgType::RTM_DELADDR, AF_INET6, 3, Some(&v6("2001:db8::7")));
        let events = accepted(&filter, &data).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].operation, Operation::Del);
        assert_eq!(events[0].family, AddressFamily::Ipv6);
        assert_eq!(events[0].value(), "2001:db8::7");
    }

    #[tokio::test]
    async fn test_unresolvable_interface_drops_events() {
        let resolver = Fixed::new(None);
        let filter = AddressEventFilter::new("missing0", &resolver);
        let data = address(NlMsgType::RTM_NEWADDR, AF_INET, 2, Some(&[10, 0, 0, 1]));

        for _ in 0..3 {
            let events = accepted(&filter, &data).await.unwrap();
            assert!(events.is_empty());
        }
        assert_eq!(resolver.calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_other_interface_dropped() {
        let filter = AddressEventFilter::new("eth0", Fixed::new(Some(2)));
        let mut data = address(NlMsgType::RTM_NEWADDR, AF_INET, 5, Some(&[10, 0, 0, 1]));
        data.extend(address(NlMsgType::RTM_NEWADDR, AF_INET, 2, Some(&[10, 0, 0, 2])));
        let events = accepted(&filter, &data).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value(), "10.0.0.2");
    }

    #[tokio::test]
    async fn test_resolves_for_every_event() {
        let resolver = Fixed::new(Some(2));
        let filter = AddressEventFilter::new("eth0", &resolver);
        let mut data = address(NlMsgType::RTM_NEWADDR, AF_INET, 2, Some(&[10, 0, 0, 1]));
        data.extend(address(NlMsgType::RTM_DELADDR, AF_INET, 2, Some(&[10, 0, 0, 1])));
        let events = accepted(&filter, &data).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(resolver.calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_ipv6_without_address() {
        let filter = AddressEventFilter::new("eth0", Fixed::new(Some(2)));
        let data = address(NlMsgType::RTM_DELADDR, AF_INET6, 2, None);
        let events = accepted(&filter, &data).await.unwrap();
        assert_eq!(events[0].address, None);
        assert_eq!(events[0].value(), "AF_INET6");
        assert_eq!(events[0].env()[1].1, "AF_INET6");
    }

    #[tokio::test]
    async fn test_ipv4_without_address() {
        let filter = AddressEventFilter::new("eth0", Fixed::new(Some(2)));
        let data = address(NlMsgType::RTM_NEWADDR, AF_INET, 2, None);
        let events = accepted(&filter, &data).await.unwrap();
        assert_eq!(events[0].value(), "");
    }

    #[tokio::test]
    async fn test_header_family_decides_width() {
        let filter = AddressEventFilter::new("eth0", Fixed::new(Some(2)));

        // A 16-byte address under an IPv4 header does not decode.
        let mut data = address(NlMsgType::RTM_NEWADDR, AF_INET, 2, Some(&v6("::ffff:a00:1")));
        // An IPv6 header renders IPv6 text even for a v4-mapped address.
        data.extend(address(NlMsgType::RTM_NEWADDR, AF_INET6, 2, Some(&v6("::ffff:a00:1"))));

        let events = accepted(&filter, &data).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].family, AddressFamily::Ipv6);
        assert_eq!(events[0].value(), "::ffff:10.0.0.1");
    }

    #[tokio::test]
    async fn test_unknown_family() {
        let filter = AddressEventFilter::new("eth0", Fixed::new(Some(2)));
        let data = address(NlMsgType::RTM_NEWADDR, libc::AF_PACKET as u8, 2, None);
        let events = accepted(&filter, &data).await.unwrap();
        assert_eq!(
            events[0].env(),
            [
                ("OPTYPE", "NEW".to_string()),
                ("FAMILY", "UNKNOWN".to_string()),
                ("VALUE", String::new()),
            ]
        );
    }

    #[tokio::test]
    async fn test_non_address_messages_ignored() {
        let resolver = Fixed::new(Some(2));
        let filter = AddressEventFilter::new("eth0", &resolver);
        let data = link(0, 0, 2, "eth0");
        assert!(accepted(&filter, &data).await.unwrap().is_empty());
        assert_eq!(resolver.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_resolver_failure_is_returned() {
        let filter = AddressEventFilter::new("eth0", Broken);
        let data = address(NlMsgType::RTM_NEWADDR, AF_INET, 2, Some(&[10, 0, 0, 1]));
        let err = accepted(&filter, &data).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_resolver_failure_keeps_accepted_events() {
        let filter = AddressEventFilter::new(
            "eth0",
            FailsAfterFirst {
                calls: AtomicUsize::new(0),
            },
        );
        let mut data = address(NlMsgType::RTM_NEWADDR, AF_INET, 2, Some(&[10, 0, 0, 1]));
        data.extend(address(NlMsgType::RTM_NEWADDR, AF_INET, 2, Some(&[10, 0, 0, 2])));

        let mut out = VecDeque::new();
        let err = filter.events_into(&data, &mut out).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value(), "10.0.0.1");
    }

    #[tokio::test]
    async fn test_pending_delivers_events_before_error() {
        let filter = AddressEventFilter::new(
            "eth0",
            FailsAfterFirst {
                calls: AtomicUsize::new(0),
            },
        );
        let mut data = address(NlMsgType::RTM_NEWADDR, AF_INET, 2, Some(&[10, 0, 0, 1]));
        data.extend(address(NlMsgType::RTM_DELADDR, AF_INET, 2, Some(&[10, 0, 0, 1])));

        let mut pending = PendingEvents::default();
        pending.fill(&filter, &data).await;

        let first = pending.pop().unwrap().unwrap();
        assert_eq!(first.operation, Operation::New);
        assert_eq!(first.value(), "10.0.0.1");
        let err = pending.pop().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(pending.pop().is_none());
    }

    #[tokio::test]
    async fn test_truncated_datagram_keeps_earlier_events() {
        let filter = AddressEventFilter::new("eth0", Fixed::new(Some(2)));
        let mut data = address(NlMsgType::RTM_NEWADDR, AF_INET, 2, Some(&[10, 0, 0, 1]));
        let second = address(NlMsgType::RTM_NEWADDR, AF_INET, 2, Some(&[10, 0, 0, 2]));
        data.extend_from_slice(&second[..second.len() - 4]);
        let events = accepted(&filter, &data).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_watch_config_groups() {
        let both = rtmgrp::IPV4_IFADDR | rtmgrp::IPV6_IFADDR;
        assert_eq!(WatchConfig::new("eth0").groups(), both);
        assert_eq!(WatchConfig::new("eth0").ipv6(false).groups(), rtmgrp::IPV4_IFADDR);
        assert_eq!(
            WatchConfig::new("eth0").family(AddressFamily::Ipv6).groups(),
            rtmgrp::IPV6_IFADDR
        );
        assert_eq!(WatchConfig::new("eth0").ipv4(false).ipv6(false).groups(), both);
        assert_eq!(WatchConfig::new("eth0").interface(), "eth0");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize_event() {
        let event = AddressChangeEvent {
            operation: Operation::New,
            family: AddressFamily::Ipv4,
            address: Some(RawAddress::V4([10, 0, 0, 1])),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"operation":"New","family":"Ipv4","address":"10.0.0.1"}"#
        );
    }
}
