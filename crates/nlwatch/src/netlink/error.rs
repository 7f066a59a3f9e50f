//! Error types for netlink operations.

use std::io;

use crate::util::addr::AddrError;

/// Result type for netlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during netlink operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed user input (prefix, MAC, family selector).
    #[error("invalid input: {0}")]
    Input(#[from] AddrError),

    /// A kernel message could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Kernel returned an error code.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Interface not found.
    #[error("interface not found: {name}")]
    InterfaceNotFound {
        /// The interface name that was not found.
        name: String,
    },
}

/// Failure category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any syscall was made.
    Input,
    /// A message from the kernel was malformed.
    Decode,
    /// Socket or kernel failure; earlier results may already have been delivered.
    Transport,
    /// A named object does not exist.
    NotFound,
}

/// Errors raised while decoding a single netlink message.
///
/// A decode error aborts the current message only; the surrounding dump or
/// event loop carries on with the next one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Buffer shorter than a fixed header.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected length.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// An attribute declares a length that does not fit the buffer.
    #[error("attribute {kind} declares {declared} bytes, {remaining} remaining")]
    AttributeOverrun {
        /// Attribute type code.
        kind: u16,
        /// Declared length including the header.
        declared: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A binary attribute has the wrong payload size.
    #[error("attribute {kind} has {actual} bytes, expected {expected}")]
    PayloadSize {
        /// Attribute type code.
        kind: u16,
        /// Required payload size.
        expected: usize,
        /// Actual payload size.
        actual: usize,
    },

    /// A string attribute is not NUL-terminated UTF-8.
    #[error("attribute {kind} is not a NUL-terminated string")]
    InvalidString {
        /// Attribute type code.
        kind: u16,
    },

    /// A required attribute is absent.
    #[error("missing attribute {0}")]
    MissingAttribute(&'static str),
}

impl Error {
    /// Create a kernel error from an errno value.
    pub fn from_errno(errno: i32) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::Kernel {
            errno: -errno,
            message,
        }
    }

    /// Failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Io(_) | Self::Kernel { .. } => ErrorKind::Transport,
            Self::InterfaceNotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, unknown interface).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => matches!(*errno, 2 | 19), // ENOENT=2, ENODEV=19
            Self::InterfaceNotFound { .. } => true,
            _ => false,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => matches!(*errno, 1 | 13), // EPERM=1, EACCES=13
            Self::Io(e) => e.kind() == io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } => Some(*errno),
            Self::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }
}
