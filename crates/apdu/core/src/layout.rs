//! Display segmentation of raw command buffers
//!
//! [`CommandLayout`] splits an outgoing command buffer into header, length
//! field, payload and trailer without building a [`Command`](crate::Command).
//! It never rejects a buffer: malformed input is segmented on a best-effort
//! basis and every range is clipped to the buffer.

use std::fmt;
use std::ops::Range;

/// Offset of the first length byte (Lc, or Le for case 2 commands)
const OFFSET_LC: usize = 4;
/// Data lengths above this use the extended length encoding
const SHORT_DATA_MAX: usize = 255;

/// Header, length field, payload and trailer boundaries of a command buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLayout<'a> {
    buffer: &'a [u8],
    length_field: Range<usize>,
    payload: Range<usize>,
    trailer: Range<usize>,
}

impl<'a> CommandLayout<'a> {
    /// Segment `buffer`, given the length of the data carried by the command
    ///
    /// `data_len` decides between the short and the extended length encoding
    /// and bounds the payload: a length byte that announces more data than
    /// `data_len` is taken to be an Le, leaving the payload empty.
    pub fn parse(buffer: &'a [u8], data_len: usize) -> Self {
        let len = buffer.len();

        if len <= OFFSET_LC {
            let end = len;
            return Self {
                buffer,
                length_field: end..end,
                payload: end..end,
                trailer: end..end,
            };
        }

        let extended = buffer[OFFSET_LC] == 0 && data_len > SHORT_DATA_MAX;
        let (length_end, declared) = if extended {
            let declared = match buffer.get(OFFSET_LC + 1..OFFSET_LC + 3) {
                Some(&[hi, lo]) => u16::from_be_bytes([hi, lo]) as usize,
                _ => 0,
            };
            ((OFFSET_LC + 3).min(len), declared)
        } else {
            (OFFSET_LC + 1, buffer[OFFSET_LC] as usize)
        };

        let payload_len = if declared > data_len { 0 } else { declared };
        let payload_end = (length_end + payload_len).min(len);

        Self {
            buffer,
            length_field: OFFSET_LC..length_end,
            payload: length_end..payload_end,
            trailer: payload_end..len,
        }
    }

    /// The first four bytes: CLA, INS, P1, P2
    pub fn header(&self) -> &'a [u8] {
        &self.buffer[..self.buffer.len().min(OFFSET_LC)]
    }

    /// Length field bytes, one in short form or three in extended form
    pub fn length_field(&self) -> &'a [u8] {
        &self.buffer[self.length_field.clone()]
    }

    /// Payload bytes following the length field
    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[self.payload.clone()]
    }

    /// Bytes left after the payload, typically Le
    pub fn trailer(&self) -> &'a [u8] {
        &self.buffer[self.trailer.clone()]
    }

    /// Whether anything follows the header
    pub fn has_body(&self) -> bool {
        self.buffer.len() > OFFSET_LC
    }
}

/// Space separated uppercase hex groups
///
/// The payload group is written whenever a trailer follows it, so an empty
/// payload in front of a trailer shows up as two consecutive spaces.
impl fmt::Display for CommandLayout<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.header()))?;
        if !self.has_body() {
            return Ok(());
        }

        write!(f, " {}", hex::encode_upper(self.length_field()))?;
        let (payload, trailer) = (self.payload(), self.trailer());
        if !payload.is_empty() || !trailer.is_empty() {
            write!(f, " {}", hex::encode_upper(payload))?;
        }
        if !trailer.is_empty() {
            write!(f, " {}", hex::encode_upper(trailer))?;
        }
        Ok(())
    }
}
