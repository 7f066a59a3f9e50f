//! Common test utilities for integration tests.
//!
//! Interfaces are set up with the `ip` command; the code under test only
//! reads kernel state.

use std::io;
use std::process::Command;

/// Run `ip` with the given arguments, failing on a non-zero exit.
pub fn ip(args: &[&str]) -> io::Result<()> {
    let output = Command::new("ip").args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(io::Error::other(format!("ip {:?}: {}", args, stderr.trim())));
    }
    Ok(())
}

/// Run `ip`, ignoring errors (cleanup paths).
pub fn ip_ignore(args: &[&str]) {
    let _ = Command::new("ip").args(args).output();
}

/// A dummy interface removed on drop.
pub struct DummyLink {
    name: String,
}

impl DummyLink {
    /// Create and bring up a dummy interface.
    pub fn new(name: &str) -> io::Result<Self> {
        ip_ignore(&["link", "del", name]);
        ip(&["link", "add", name, "type", "dummy"])?;
        ip(&["link", "set", name, "up"])?;
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a permanent neighbor entry on this interface.
    pub fn add_neighbor(&self, addr: &str, lladdr: &str) -> io::Result<()> {
        ip(&[
            "neigh", "replace", addr, "lladdr", lladdr, "dev", &self.name, "nud", "permanent",
        ])
    }
}

impl Drop for DummyLink {
    fn drop(&mut self) {
        ip_ignore(&["link", "del", &self.name]);
    }
}

/// Check if running as root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Skip the test if not running as root.
///
/// Use this at the beginning of integration tests that require root privileges.
#[macro_export]
macro_rules! require_root {
    () => {
        if !crate::common::is_root() {
            eprintln!("Skipping test: requires root");
            return Ok(());
        }
    };
}
