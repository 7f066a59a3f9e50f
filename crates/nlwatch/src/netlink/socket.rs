//! Low-level async rtnetlink socket.

use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::error::Result;

/// Receive buffer size; large enough for one kernel dump batch.
const RECV_BUF_SIZE: usize = 32768;

/// Async `NETLINK_ROUTE` socket.
pub struct NetlinkSocket {
    fd: AsyncFd<Socket>,
    seq: AtomicU32,
    pid: u32,
    groups: u32,
}

impl NetlinkSocket {
    /// Open a socket for request/dump traffic (no multicast groups).
    pub fn new() -> Result<Self> {
        Self::create_socket(0)
    }

    /// Open a socket bound to the given legacy multicast group mask
    /// (`RTMGRP_*`), for receiving kernel notifications.
    pub fn with_groups(groups: u32) -> Result<Self> {
        Self::create_socket(groups)
    }

    fn create_socket(groups: u32) -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_ROUTE)?;
        socket.set_non_blocking(true)?;

        // Port id 0 lets the kernel assign one; read it back for correlation.
        let mut addr = SocketAddr::new(0, groups);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let pid = addr.port_number();

        let fd = AsyncFd::new(socket)?;

        tracing::debug!(pid, groups, "opened netlink socket");

        Ok(Self {
            fd,
            seq: AtomicU32::new(initial_seq()),
            pid,
            groups,
        })
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Multicast group mask this socket is bound to.
    pub fn groups(&self) -> u32 {
        self.groups
    }

    /// Send a message.
    pub async fn send(&self, msg: &[u8]) -> Result<()> {
        loop {
            let mut guard = self.fd.ready(Interest::WRITABLE).await?;

            match guard.try_io(|inner| inner.get_ref().send(msg, 0)) {
                Ok(result) => {
                    result?;
                    return Ok(());
                }
                Err(_would_block) => continue,
            }
        }
    }

    /// Receive one datagram, allocating a buffer.
    pub async fn recv_msg(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(RECV_BUF_SIZE);

        loop {
            let mut guard = self.fd.ready(Interest::READABLE).await?;

            match guard.try_io(|inner| inner.get_ref().recv(&mut buf, 0)) {
                Ok(result) => {
                    let _n = result?;
                    // recv advanced buf, so buf[..] holds the datagram
                    return Ok(buf.to_vec());
                }
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}

/// First sequence number: the current wall-clock second.
fn initial_seq() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(1)
}
