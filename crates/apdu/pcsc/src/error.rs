//! PC/SC specific errors

use apdu_trace_core::Error;

/// Errors raised by the PC/SC terminal
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// Status code returned by the PC/SC service
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No reader with the given name
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// Reader name with an interior NUL byte
    #[error("Invalid reader name: {0:?}")]
    InvalidReaderName(String),

    /// Protocol string not understood by this transport
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// The card has already been disconnected
    #[error("Card is not connected")]
    NotConnected,
}

/// PC/SC status codes are kept as driver codes, so they translate to their
/// `SCARD_*` names in traces
impl From<PcscError> for Error {
    fn from(err: PcscError) -> Self {
        match err {
            PcscError::Pcsc(e) => Self::driver(e as u32),
            PcscError::ReaderNotFound(name) => Self::ReaderNotFound(name),
            PcscError::NotConnected => Self::NotConnected,
            other => Self::message(other.to_string()),
        }
    }
}
