//! Transport traits for card readers, card sessions and channels
//!
//! A transport is responsible for reaching a physical card. It has no
//! knowledge of tracing: the logging decorator implements the very same
//! traits on top of any transport, so applications can swap one for the
//! other without code changes.

use std::fmt;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::{Command, Response, Result};

/// A card reader
pub trait CardTerminal: fmt::Debug {
    /// Session type produced by [`connect`](Self::connect)
    type Card: Card;

    /// Reader name
    fn name(&self) -> &str;

    /// Connect to the card in this reader
    ///
    /// `protocol` is `"*"` for any protocol, `"T=0"`, `"T=1"`, or `"DIRECT"`
    /// for a connection to the reader itself.
    fn connect(&self, protocol: &str) -> Result<Self::Card>;

    /// Check whether a card is present in the reader
    fn is_card_present(&self) -> Result<bool>;

    /// Wait until a card is present or `timeout` elapses
    ///
    /// Returns `false` on timeout. A zero timeout waits indefinitely.
    fn wait_for_card_present(&self, timeout: Duration) -> Result<bool>;

    /// Wait until the reader is empty or `timeout` elapses
    ///
    /// Returns `false` on timeout. A zero timeout waits indefinitely.
    fn wait_for_card_absent(&self, timeout: Duration) -> Result<bool>;
}

/// An established session with a card
pub trait Card: fmt::Debug {
    /// Channel type handed out by this session
    type Channel: CardChannel;

    /// Answer To Reset of the card
    fn atr(&self) -> &[u8];

    /// Negotiated protocol, e.g. `"T=1"`
    fn protocol(&self) -> &str;

    /// The basic channel (channel 0)
    fn basic_channel(&self) -> Self::Channel;

    /// Open a new logical channel
    fn open_logical_channel(&mut self) -> Result<Self::Channel>;

    /// Acquire exclusive access to the card
    fn begin_exclusive(&mut self) -> Result<()>;

    /// Release exclusive access to the card
    fn end_exclusive(&mut self) -> Result<()>;

    /// Send a control command to the reader
    fn transmit_control_command(&mut self, code: u32, data: &[u8]) -> Result<Bytes>;

    /// Disconnect from the card, resetting it if `reset` is set
    ///
    /// The session is consumed and cannot be used afterwards.
    fn disconnect(self, reset: bool) -> Result<()>
    where
        Self: Sized;
}

/// A command/response endpoint within a card session
pub trait CardChannel: fmt::Debug {
    /// Channel number, 0 for the basic channel
    fn channel_number(&self) -> u8;

    /// Send a structured command and return the card's response
    fn transmit(&mut self, command: &Command) -> Result<Response>;

    /// Send a raw command buffer
    ///
    /// The response, status word included, is appended to `response`. Returns
    /// the number of bytes appended.
    fn transmit_buffer(&mut self, command: &[u8], response: &mut BytesMut) -> Result<usize>;

    /// Close the channel
    fn close(&mut self) -> Result<()>;
}
