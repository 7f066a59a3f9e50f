//! Hand-assembled kernel messages for unit tests.

use super::builder::MessageBuilder;
use super::message::{NLM_F_MULTI, NlMsgHdr, NlMsgType};
use super::types::addr::IfAddrMsg;
use super::types::link::IfInfoMsg;
use super::types::neigh::{NdMsg, nud};

const NDA_DST: u16 = 1;
const NDA_LLADDR: u16 = 2;
const IFA_ADDRESS: u16 = 1;
const IFA_LABEL: u16 = 3;
const IFLA_IFNAME: u16 = 3;
const IFLA_MTU: u16 = 4;

fn finish(mut builder: MessageBuilder, seq: u32, pid: u32) -> Vec<u8> {
    builder.set_seq(seq);
    builder.set_pid(pid);
    builder.finish()
}

/// Any message with a raw payload.
pub fn with_header(msg_type: u16, flags: u16, seq: u32, pid: u32, payload: &[u8]) -> Vec<u8> {
    let mut builder = MessageBuilder::new(msg_type, flags);
    builder.append_bytes(payload);
    finish(builder, seq, pid)
}

/// `NLMSG_DONE` terminating a dump.
pub fn done(seq: u32, pid: u32) -> Vec<u8> {
    with_header(NlMsgType::DONE, NLM_F_MULTI, seq, pid, &0i32.to_ne_bytes())
}

/// `NLMSG_ERROR` carrying `errno` (negative) or 0 for an ACK.
pub fn error(seq: u32, pid: u32, errno: i32) -> Vec<u8> {
    let mut payload = errno.to_ne_bytes().to_vec();
    payload.extend_from_slice(NlMsgHdr::new(NlMsgType::RTM_GETNEIGH, 0).as_bytes());
    with_header(NlMsgType::ERROR, 0, seq, pid, &payload)
}

/// Reachable IPv4 neighbor entry.
pub fn neighbor(seq: u32, pid: u32, ifindex: i32, dst: [u8; 4], lladdr: [u8; 6]) -> Vec<u8> {
    neighbor_raw(
        seq,
        pid,
        NdMsg::new()
            .with_family(libc::AF_INET as u8)
            .with_ifindex(ifindex)
            .with_state(nud::REACHABLE),
        Some(&dst),
        Some(&lladdr),
    )
}

/// Reachable IPv6 neighbor entry.
pub fn neighbor_v6(seq: u32, pid: u32, ifindex: i32, dst: [u8; 16], lladdr: [u8; 6]) -> Vec<u8> {
    neighbor_raw(
        seq,
        pid,
        NdMsg::new()
            .with_family(libc::AF_INET6 as u8)
            .with_ifindex(ifindex)
            .with_state(nud::REACHABLE),
        Some(&dst),
        Some(&lladdr),
    )
}

/// Neighbor entry with an arbitrary header and optional attributes.
pub fn neighbor_raw(
    seq: u32,
    pid: u32,
    ndm: NdMsg,
    dst: Option<&[u8]>,
    lladdr: Option<&[u8]>,
) -> Vec<u8> {
    let mut builder = MessageBuilder::new(NlMsgType::RTM_NEWNEIGH, NLM_F_MULTI);
    builder.append(&ndm);
    if let Some(dst) = dst {
        builder.append_attr(NDA_DST, dst);
    }
    if let Some(lladdr) = lladdr {
        builder.append_attr(NDA_LLADDR, lladdr);
    }
    finish(builder, seq, pid)
}

/// Three IPv4 entries on interface 2; the middle one has no link-layer address.
pub fn neighbor_batch(seq: u32, pid: u32) -> Vec<u8> {
    let mut data = neighbor(seq, pid, 2, [192, 168, 1, 10], [0x52, 0x54, 0, 0x12, 0x34, 0x01]);
    data.extend(neighbor(seq, pid, 2, [192, 168, 1, 20], [0; 6]));
    data.extend(neighbor(seq, pid, 2, [192, 168, 1, 30], [0x52, 0x54, 0, 0x12, 0x34, 0x03]));
    data
}

/// Address notification (`RTM_NEWADDR` / `RTM_DELADDR`) as sent to multicast
/// listeners: sequence and port id are zero.
pub fn address(msg_type: u16, family: u8, index: u32, addr: Option<&[u8]>) -> Vec<u8> {
    let mut builder = MessageBuilder::new(msg_type, 0);
    builder.append(
        &IfAddrMsg::new()
            .with_family(family)
            .with_prefixlen(24)
            .with_index(index),
    );
    if let Some(addr) = addr {
        builder.append_attr(IFA_ADDRESS, addr);
    }
    builder.append_attr_str(IFA_LABEL, "eth0");
    finish(builder, 0, 0)
}

/// Link dump entry.
pub fn link(seq: u32, pid: u32, index: i32, name: &str) -> Vec<u8> {
    let mut builder = MessageBuilder::new(NlMsgType::RTM_NEWLINK, NLM_F_MULTI);
    builder.append(
        &IfInfoMsg::new()
            .with_family(libc::AF_UNSPEC as u8)
            .with_index(index),
    );
    builder.append_attr_str(IFLA_IFNAME, name);
    builder.append_attr_u32(IFLA_MTU, 1500);
    finish(builder, seq, pid)
}
