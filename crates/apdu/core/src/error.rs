//! Core error type for all traced card operations
//!
//! Transports report their failures through this type and every decorating
//! layer hands the same value back to its caller untouched.

use std::io;

/// Result alias used across the apdu-trace crates
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Core error type that encompasses all possible errors in the crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    //
    // Transport related errors
    //
    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// The session has already been disconnected
    #[error("Not connected to a card")]
    NotConnected,

    /// Raw status code reported by the reader driver
    #[error("Driver error code: {0:#010X}")]
    Driver(u32),

    /// Operation not supported by this layer or transport
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    //
    // Command and response related errors
    //
    /// Invalid command length
    #[error("Invalid command length: {0}")]
    InvalidCommandLength(usize),

    /// Response shorter than a status word
    #[error("Invalid response length: {0}")]
    InvalidResponseLength(usize),

    //
    // Tracing related errors
    //
    /// Trace output could not be set up
    #[error("Trace output error: {0}")]
    Trace(#[from] io::Error),

    //
    // General errors
    //
    /// Generic dynamic error with string message
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Create a new error with a dynamic message
    pub fn message<S: Into<String>>(message: S) -> Self {
        Self::Message(message.into())
    }

    /// Create a new driver error
    pub const fn driver(code: u32) -> Self {
        Self::Driver(code)
    }

    /// Human readable reason for this error, if one is known
    ///
    /// Driver codes are translated to their PC/SC `SCARD_*` names; codes that
    /// are not recognised yield `None`. Every other variant yields its display
    /// text.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Driver(code) => scard_name(*code).map(str::to_string),
            other => Some(other.to_string()),
        }
    }
}

/// Name of a PC/SC status code
pub const fn scard_name(code: u32) -> Option<&'static str> {
    let name = match code {
        0x8010_0001 => "SCARD_F_INTERNAL_ERROR",
        0x8010_0002 => "SCARD_E_CANCELLED",
        0x8010_0003 => "SCARD_E_INVALID_HANDLE",
        0x8010_0004 => "SCARD_E_INVALID_PARAMETER",
        0x8010_0005 => "SCARD_E_INVALID_TARGET",
        0x8010_0006 => "SCARD_E_NO_MEMORY",
        0x8010_0008 => "SCARD_E_INSUFFICIENT_BUFFER",
        0x8010_0009 => "SCARD_E_UNKNOWN_READER",
        0x8010_000A => "SCARD_E_TIMEOUT",
        0x8010_000B => "SCARD_E_SHARING_VIOLATION",
        0x8010_000C => "SCARD_E_NO_SMARTCARD",
        0x8010_000D => "SCARD_E_UNKNOWN_CARD",
        0x8010_000E => "SCARD_E_CANT_DISPOSE",
        0x8010_000F => "SCARD_E_PROTO_MISMATCH",
        0x8010_0010 => "SCARD_E_NOT_READY",
        0x8010_0011 => "SCARD_E_INVALID_VALUE",
        0x8010_0012 => "SCARD_E_SYSTEM_CANCELLED",
        0x8010_0013 => "SCARD_F_COMM_ERROR",
        0x8010_0014 => "SCARD_F_UNKNOWN_ERROR",
        0x8010_0016 => "SCARD_E_NOT_TRANSACTED",
        0x8010_0017 => "SCARD_E_READER_UNAVAILABLE",
        0x8010_001D => "SCARD_E_NO_SERVICE",
        0x8010_001E => "SCARD_E_SERVICE_STOPPED",
        0x8010_002E => "SCARD_E_NO_READERS_AVAILABLE",
        0x8010_0065 => "SCARD_W_UNSUPPORTED_CARD",
        0x8010_0066 => "SCARD_W_UNRESPONSIVE_CARD",
        0x8010_0067 => "SCARD_W_UNPOWERED_CARD",
        0x8010_0068 => "SCARD_W_RESET_CARD",
        0x8010_0069 => "SCARD_W_REMOVED_CARD",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_reason() {
        assert_eq!(
            Error::driver(0x8010_0069).reason().as_deref(),
            Some("SCARD_W_REMOVED_CARD")
        );
        assert_eq!(
            Error::driver(0x8010_000C).reason().as_deref(),
            Some("SCARD_E_NO_SMARTCARD")
        );
        assert_eq!(Error::driver(0x1234_5678).reason(), None);
    }

    #[test]
    fn test_other_reason_uses_display() {
        assert_eq!(
            Error::NotConnected.reason().as_deref(),
            Some("Not connected to a card")
        );
        assert_eq!(
            Error::message("reader jammed").reason().as_deref(),
            Some("reader jammed")
        );
    }

    #[test]
    fn test_driver_display() {
        assert_eq!(
            Error::driver(0x8010_0069).to_string(),
            "Driver error code: 0x80100069"
        );
    }
}
