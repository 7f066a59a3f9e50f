//! Fixed kernel headers that follow `nlmsghdr` in rtnetlink messages.

pub mod addr;
pub mod link;
pub mod neigh;
