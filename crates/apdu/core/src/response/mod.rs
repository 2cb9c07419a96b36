//! APDU response definitions
//!
//! A [`Response`] keeps the exact bytes returned by the card so that tracing
//! layers can log and dump them without re-encoding.

pub mod status;

use bytes::Bytes;
use tracing::trace;

use crate::Error;
use status::StatusWord;

/// Raw APDU response: data field followed by a two byte status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    bytes: Bytes,
}

impl Response {
    /// Create a response from a data field and a status word
    pub fn new(data: &[u8], status: impl Into<StatusWord>) -> Self {
        let mut bytes = Vec::with_capacity(data.len() + 2);
        bytes.extend_from_slice(data);
        bytes.extend_from_slice(&status.into().to_bytes());
        Self {
            bytes: bytes.into(),
        }
    }

    /// Create a success (90 00) response carrying `data`
    pub fn success(data: &[u8]) -> Self {
        Self::new(data, StatusWord::new(0x90, 0x00))
    }

    /// Parse response from raw bytes (including status word)
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, Error> {
        let bytes = bytes.into();
        if bytes.len() < 2 {
            return Err(Error::InvalidResponseLength(bytes.len()));
        }

        let response = Self { bytes };
        trace!(
            sw = %response.status(),
            payload_len = response.data().len(),
            "Parsed APDU response"
        );

        Ok(response)
    }

    /// Response data field, without the status word
    pub fn data(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - 2]
    }

    /// Status word
    pub fn status(&self) -> StatusWord {
        let len = self.bytes.len();
        StatusWord::new(self.bytes[len - 2], self.bytes[len - 1])
    }

    /// Check if the response indicates success
    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// Complete response bytes, status word included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total length in bytes, status word included
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false, a response holds at least its status word
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Response> for Bytes {
    fn from(response: Response) -> Self {
        response.bytes
    }
}
