//! Traced command channel
//!
//! Structured transmits are logged as `A>>`/`A<<` lines with the command
//! split into header, length, payload and trailer. Buffer transmits are
//! logged as `B>>`/`B<<` lines carrying the raw bytes.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use apdu_trace_core::prelude::*;
use tracing::{event, trace, warn, Level};

use crate::card::Session;
use crate::util::format_elapsed;

/// A channel whose exchanges are traced and counted against its session
pub struct LoggingChannel<H> {
    /// The wrapped channel
    channel: H,
    /// Owning session
    session: Arc<Session>,
}

impl<H: fmt::Debug> fmt::Debug for LoggingChannel<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingChannel")
            .field("channel", &self.channel)
            .field("terminal", &self.session.terminal())
            .finish()
    }
}

impl<H: CardChannel> LoggingChannel<H> {
    pub(crate) const fn new(channel: H, session: Arc<Session>) -> Self {
        Self { channel, session }
    }

    /// Session this channel belongs to
    pub const fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The wrapped channel
    pub const fn inner(&self) -> &H {
        &self.channel
    }
}

impl<H: CardChannel> CardChannel for LoggingChannel<H> {
    fn channel_number(&self) -> u8 {
        self.channel.channel_number()
    }

    fn transmit(&mut self, command: &Command) -> Result<Response> {
        let session = &self.session;
        // Unencodable commands never reach the trace or the card
        let sent = command.to_bytes().inspect_err(|e| {
            warn!(error = %e, "Command cannot be encoded");
        })?;
        let data_len = command.data().len();
        let layout = CommandLayout::parse(&sent, data_len);

        session.log().line(&format!(
            "A>> {} (4+{data_len:04}) {layout}",
            session.protocol()
        ));
        trace!(command = %hex::encode_upper(&sent), "Transmitting command");

        let started = Instant::now();
        let response = match self.channel.transmit(command) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Transmit failed");
                session.log().line(&format!("A<< {}", session.describe(&e)));
                return Err(e);
            }
        };
        let elapsed = format_elapsed(started.elapsed());

        session.add_sent(sent.len());
        session.add_received(response.len());

        let status = response.status();
        let data = response.data();
        let payload = if data.is_empty() {
            String::new()
        } else {
            format!(" {}", hex::encode_upper(data))
        };
        session.log().line(&format!(
            "A<< ({:04}+2) ({elapsed}){payload} {status}",
            data.len()
        ));

        let level = status.tracing_level();
        if level == Level::WARN {
            event!(Level::WARN, sw = %status, %elapsed, "Received response");
        } else if level == Level::INFO {
            event!(Level::INFO, sw = %status, %elapsed, "Received response");
        } else {
            event!(Level::DEBUG, sw = %status, %elapsed, "Received response");
        }

        session.dump_exchange(&sent, response.as_bytes(), &elapsed);
        Ok(response)
    }

    fn transmit_buffer(&mut self, command: &[u8], response: &mut BytesMut) -> Result<usize> {
        let session = &self.session;
        session.log().line(&format!(
            "B>> {} ({}) {}",
            session.protocol(),
            command.len(),
            hex::encode_upper(command)
        ));

        // The response is appended by the wrapped channel; read it in place
        let start = response.len();
        let started = Instant::now();
        let received = match self.channel.transmit_buffer(command, response) {
            Ok(received) => received,
            Err(e) => {
                warn!(error = %e, "Buffer transmit failed");
                session.log().line(&format!("B<< {}", session.describe(&e)));
                return Err(e);
            }
        };
        let elapsed = format_elapsed(started.elapsed());

        session.add_sent(command.len());
        session.add_received(received);

        let bytes = response.get(start..start + received).unwrap_or_default();
        session.log().line(&format!(
            "B<< ({received}) ({elapsed}) {}",
            hex::encode_upper(bytes)
        ));
        trace!(response = %hex::encode_upper(bytes), %elapsed, "Received buffer response");

        session.dump_exchange(command, bytes, &elapsed);
        Ok(received)
    }

    fn close(&mut self) -> Result<()> {
        self.channel.close()
    }
}
