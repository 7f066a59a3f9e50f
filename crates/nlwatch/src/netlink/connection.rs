//! High-level netlink connection with dump and event handling.

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{
    MessageIter, NLM_F_DUMP, NLM_F_REQUEST, NlMsgError, NlMsgType, nlmsg_align,
};
use super::socket::NetlinkSocket;

/// High-level rtnetlink connection.
///
/// A connection opened with [`Connection::new`] runs request/dump exchanges;
/// one opened with [`Connection::subscribe`] receives kernel notifications.
/// Dropping the connection closes the socket.
pub struct Connection {
    socket: NetlinkSocket,
}

impl Connection {
    /// Open a connection for dump requests.
    pub fn new() -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new()?,
        })
    }

    /// Open a connection bound to a multicast group mask (`RTMGRP_*`).
    pub fn subscribe(groups: u32) -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::with_groups(groups)?,
        })
    }

    /// Get the underlying socket.
    pub fn socket(&self) -> &NetlinkSocket {
        &self.socket
    }

    /// Send a dump request and collect all responses.
    ///
    /// Each returned buffer is one complete message (header and payload) in
    /// the order the kernel sent them.
    pub async fn dump(&self, mut builder: MessageBuilder) -> Result<Vec<Vec<u8>>> {
        let seq = self.socket.next_seq();
        let pid = self.socket.pid();
        builder.set_seq(seq);
        builder.set_pid(pid);

        let msg = builder.finish();
        tracing::debug!(seq, pid, len = msg.len(), "sending dump request");
        self.socket.send(&msg).await?;

        let mut responses = Vec::new();
        loop {
            let data = self.socket.recv_msg().await?;
            if collect_dump_batch(&data, seq, pid, &mut responses)? {
                break;
            }
        }

        tracing::debug!(seq, count = responses.len(), "dump complete");
        Ok(responses)
    }

    /// Receive the next notification datagram.
    ///
    /// Never signals end-of-stream; it returns only on data or socket error.
    pub async fn recv_event(&self) -> Result<Vec<u8>> {
        self.socket.recv_msg().await
    }
}

/// Process one received datagram of a dump.
///
/// Appends matching data messages to `responses` and returns `true` once
/// `NLMSG_DONE` for this request is seen. A malformed message header ends
/// the whole dump with [`Error::Decode`], since the rest of the datagram
/// cannot be framed.
pub(crate) fn collect_dump_batch(
    data: &[u8],
    seq: u32,
    pid: u32,
    responses: &mut Vec<Vec<u8>>,
) -> Result<bool> {
    let mut offset = 0;
    for result in MessageIter::new(data) {
        let (header, payload) = result?;
        let start = offset;
        let msg_len = header.nlmsg_len as usize;
        offset += nlmsg_align(msg_len);

        if header.nlmsg_seq != seq || header.nlmsg_pid != pid {
            tracing::trace!(
                seq = header.nlmsg_seq,
                pid = header.nlmsg_pid,
                "skipping message for another request"
            );
            continue;
        }

        if header.is_dump_interrupted() {
            tracing::warn!(seq, "dump interrupted, results may be inconsistent");
        }

        match header.nlmsg_type {
            NlMsgType::NOOP => continue,
            NlMsgType::DONE => return Ok(true),
            NlMsgType::ERROR => {
                let err = NlMsgError::from_bytes(payload)?;
                if !err.is_ack() {
                    return Err(Error::from_errno(err.error));
                }
            }
            _ => responses.push(data[start..start + msg_len].to_vec()),
        }
    }
    Ok(false)
}

/// Helper to build a dump request.
pub fn dump_request(msg_type: u16) -> MessageBuilder {
    MessageBuilder::new(msg_type, NLM_F_REQUEST | NLM_F_DUMP)
}
