//! APDU command definitions
//!
//! This module provides the structured command type handed to
//! [`CardChannel::transmit`](crate::CardChannel::transmit), with short and
//! extended length encoding according to ISO/IEC 7816-4.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::Error;

/// Expected response length (Le), in bytes
///
/// Short encoding covers 1..=256 (256 is sent as `00`), extended encoding
/// covers 1..=65536 (65536 is sent as `00 00`).
pub type ExpectedLength = u32;

/// Largest data field that fits the short length encoding
const SHORT_DATA_MAX: usize = 255;
/// Largest expected length that fits the short length encoding
const SHORT_LE_MAX: ExpectedLength = 256;
/// Largest data field that fits the extended length encoding
const EXTENDED_DATA_MAX: usize = 65535;
/// Largest expected length that fits the extended length encoding
const EXTENDED_LE_MAX: ExpectedLength = 65536;

/// Generic APDU command structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional)
    pub le: Option<ExpectedLength>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: None,
        }
    }

    /// Create a new command with both data and expected length
    pub fn new_with_data_and_le<T: Into<Bytes>>(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: T,
        le: ExpectedLength,
    ) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: Some(le),
        }
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: ExpectedLength) -> Self {
        self.le = Some(le);
        self
    }

    /// Command class (CLA)
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction code (INS)
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// First parameter (P1)
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Second parameter (P2)
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Command payload data, empty when absent
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Expected response length (optional)
    pub const fn expected_length(&self) -> Option<ExpectedLength> {
        self.le
    }

    /// Whether this command needs the extended length encoding
    pub fn is_extended(&self) -> bool {
        self.data().len() > SHORT_DATA_MAX || self.le.is_some_and(|le| le > SHORT_LE_MAX)
    }

    /// Calculate length of serialized command
    pub fn command_length(&self) -> usize {
        let data_len = self.data().len();
        let extended = self.is_extended();

        // Header (CLA, INS, P1, P2) is always 4 bytes
        let mut length = 4;

        if data_len > 0 {
            length += if extended { 3 } else { 1 } + data_len;
        }

        if self.le.is_some() {
            length += match (extended, data_len > 0) {
                (false, _) => 1,
                (true, true) => 2,
                (true, false) => 3,
            };
        }

        length
    }

    /// Convert to raw APDU bytes
    ///
    /// Fails with [`Error::InvalidCommandLength`] when the data field is
    /// longer than 65535 bytes or Le is above 65536, which no encoding can
    /// carry.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        let data = self.data();
        if data.len() > EXTENDED_DATA_MAX || self.le.is_some_and(|le| le > EXTENDED_LE_MAX) {
            return Err(Error::InvalidCommandLength(self.command_length()));
        }
        let extended = self.is_extended();
        let mut buffer = BytesMut::with_capacity(self.command_length());

        // Header: CLA, INS, P1, P2
        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        // Lc and data
        if !data.is_empty() {
            if extended {
                buffer.put_u8(0x00);
                buffer.put_u16(data.len() as u16);
            } else {
                buffer.put_u8(data.len() as u8);
            }
            buffer.put_slice(data);
        }

        // Le, the maximum value wraps to zero in both encodings
        if let Some(le) = self.le {
            if extended {
                if data.is_empty() {
                    buffer.put_u8(0x00);
                }
                buffer.put_u16(le as u16);
            } else {
                buffer.put_u8(le as u8);
            }
        }

        trace!(command = %hex::encode_upper(&buffer), "Serialized command");
        Ok(buffer.freeze())
    }

    /// Parse a command from raw bytes
    ///
    /// Accepts the four ISO 7816-4 cases in both short and extended form.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 4 {
            return Err(Error::InvalidCommandLength(data.len()));
        }

        let mut command = Self::new(data[0], data[1], data[2], data[3]);
        let body = &data[4..];

        match body.len() {
            // Case 1
            0 => {}
            // Case 2 short
            1 => command.le = Some(short_le(body[0])),
            // Case 2 extended
            3 if body[0] == 0x00 => command.le = Some(extended_le(body[1], body[2])),
            _ if body[0] != 0x00 => {
                let lc = body[0] as usize;
                let rest = &body[1..];
                match rest.len().checked_sub(lc) {
                    // Case 3 short
                    Some(0) => command.data = Some(Bytes::copy_from_slice(rest)),
                    // Case 4 short
                    Some(1) => {
                        command.data = Some(Bytes::copy_from_slice(&rest[..lc]));
                        command.le = Some(short_le(rest[lc]));
                    }
                    _ => return Err(Error::InvalidCommandLength(data.len())),
                }
            }
            _ if body.len() >= 3 => {
                let lc = u16::from_be_bytes([body[1], body[2]]) as usize;
                let rest = &body[3..];
                match rest.len().checked_sub(lc) {
                    // Case 3 extended
                    Some(0) if lc > 0 => command.data = Some(Bytes::copy_from_slice(rest)),
                    // Case 4 extended
                    Some(2) if lc > 0 => {
                        command.data = Some(Bytes::copy_from_slice(&rest[..lc]));
                        command.le = Some(extended_le(rest[lc], rest[lc + 1]));
                    }
                    _ => return Err(Error::InvalidCommandLength(data.len())),
                }
            }
            _ => return Err(Error::InvalidCommandLength(data.len())),
        }

        Ok(command)
    }
}

const fn short_le(byte: u8) -> ExpectedLength {
    if byte == 0 { 256 } else { byte as ExpectedLength }
}

const fn extended_le(hi: u8, lo: u8) -> ExpectedLength {
    match u16::from_be_bytes([hi, lo]) {
        0 => 65536,
        le => le as ExpectedLength,
    }
}
