//! Traced card session

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use apdu_trace_core::prelude::*;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::channel::LoggingChannel;
use crate::config::{DumpFactory, ErrorTranslator};
use crate::sink::{LogStream, ReplayDump};
use crate::util::{describe_error, display_protocol};

/// State shared by a traced session and every channel it hands out
pub struct Session {
    /// Reader name used in trace lines
    terminal: String,
    /// Negotiated protocol
    protocol: String,
    /// Answer To Reset
    atr: Bytes,
    /// Bytes sent since connect
    bytes_sent: AtomicU64,
    /// Bytes received since connect
    bytes_received: AtomicU64,
    /// Live trace
    log: LogStream,
    /// Replay dump, taken at disconnect
    dump: Mutex<Option<ReplayDump>>,
    /// Error translation for failure lines
    translator: ErrorTranslator,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("terminal", &self.terminal)
            .field("protocol", &self.protocol)
            .field("atr", &hex::encode_upper(&self.atr))
            .field("bytes_sent", &self.bytes_sent())
            .field("bytes_received", &self.bytes_received())
            .field("has_dump", &self.dump.lock().is_some())
            .finish()
    }
}

impl Session {
    /// Reader name
    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    /// Negotiated protocol
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Answer To Reset
    pub fn atr(&self) -> &[u8] {
        &self.atr
    }

    /// Bytes sent to the card since connect
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Bytes received from the card since connect
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub(crate) fn add_sent(&self, count: usize) {
        self.bytes_sent.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_received(&self, count: usize) {
        self.bytes_received.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) const fn log(&self) -> &LogStream {
        &self.log
    }

    pub(crate) fn describe(&self, error: &Error) -> String {
        describe_error(self.translator, error)
    }

    /// Append an exchange to the replay dump, if one is open
    pub(crate) fn dump_exchange(&self, sent: &[u8], received: &[u8], elapsed: &str) {
        if let Some(dump) = self.dump.lock().as_mut() {
            dump.write_exchange(sent, received, elapsed);
        }
    }

    /// Log the disconnect, then reset counters and close the dump
    fn finish(&self, reset: bool) {
        let sent = self.bytes_sent.swap(0, Ordering::Relaxed);
        let received = self.bytes_received.swap(0, Ordering::Relaxed);
        self.log.line(&format!(
            "SCardDisconnect(\"{}\", {reset}) tx:{sent}/rx:{received}",
            self.terminal
        ));

        if let Some(dump) = self.dump.lock().take() {
            dump.close();
        }
    }
}

/// A card session whose every operation is traced
pub struct LoggingCard<C> {
    /// The wrapped session
    card: C,
    /// Counters and trace destinations
    session: Arc<Session>,
}

impl<C: fmt::Debug> fmt::Debug for LoggingCard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingCard")
            .field("card", &self.card)
            .field("session", &self.session)
            .finish()
    }
}

impl<C: Card> LoggingCard<C> {
    /// Connect through `terminal`, tracing the attempt and its outcome
    #[instrument(level = "debug", skip_all, fields(terminal = terminal.name(), protocol = protocol))]
    pub(crate) fn connect<T>(
        terminal: &T,
        protocol: &str,
        log: &LogStream,
        dump: Option<&DumpFactory>,
        translator: ErrorTranslator,
    ) -> Result<Self>
    where
        T: CardTerminal<Card = C>,
    {
        let name = terminal.name();
        log.begin(&format!(
            "SCardConnect(\"{name}\", {})",
            display_protocol(protocol)
        ));

        let dump = match dump.map(ReplayDump::open).transpose() {
            Ok(dump) => dump,
            Err(e) => {
                let error = Error::Trace(e);
                log.line(&format!(" -> {}", describe_error(translator, &error)));
                return Err(error);
            }
        };

        let card = match terminal.connect(protocol) {
            Ok(card) => card,
            Err(e) => {
                log.line(&format!(" -> {}", describe_error(translator, &e)));
                return Err(e);
            }
        };

        let atr = Bytes::copy_from_slice(card.atr());
        let negotiated = card.protocol().to_string();
        log.line(&format!(" -> {negotiated}, {}", hex::encode_upper(&atr)));

        let dump = dump.map(|mut dump| {
            dump.write_header(name, &atr, &negotiated);
            dump
        });

        debug!(atr = %hex::encode_upper(&atr), protocol = %negotiated, "Card connected");

        Ok(Self {
            card,
            session: Arc::new(Session {
                terminal: name.to_string(),
                protocol: negotiated,
                atr,
                bytes_sent: AtomicU64::new(0),
                bytes_received: AtomicU64::new(0),
                log: log.clone(),
                dump: Mutex::new(dump),
                translator,
            }),
        })
    }

    /// Shared session state: counters, reader name and protocol
    pub const fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The wrapped card
    pub const fn inner(&self) -> &C {
        &self.card
    }
}

impl<C: Card> Card for LoggingCard<C> {
    type Channel = LoggingChannel<C::Channel>;

    fn atr(&self) -> &[u8] {
        self.card.atr()
    }

    fn protocol(&self) -> &str {
        self.card.protocol()
    }

    fn basic_channel(&self) -> Self::Channel {
        LoggingChannel::new(self.card.basic_channel(), Arc::clone(&self.session))
    }

    fn open_logical_channel(&mut self) -> Result<Self::Channel> {
        Err(Error::Unsupported("Logical channels are not supported"))
    }

    fn begin_exclusive(&mut self) -> Result<()> {
        self.session.log.line(&format!(
            "SCardBeginTransaction(\"{}\")",
            self.session.terminal
        ));
        self.card.begin_exclusive()
    }

    fn end_exclusive(&mut self) -> Result<()> {
        self.session.log.line(&format!(
            "SCardEndTransaction(\"{}\")",
            self.session.terminal
        ));
        self.card.end_exclusive()
    }

    fn transmit_control_command(&mut self, code: u32, data: &[u8]) -> Result<Bytes> {
        let log = &self.session.log;
        log.begin(&format!(
            "SCardControl(\"{}\", {code:x}, {})",
            self.session.terminal,
            hex::encode_upper(data)
        ));

        match self.card.transmit_control_command(code, data) {
            Ok(result) => {
                log.line(&format!(" -> {}", hex::encode_upper(&result)));
                Ok(result)
            }
            Err(e) => {
                log.line(&format!(" -> {}", self.session.describe(&e)));
                Err(e)
            }
        }
    }

    fn disconnect(self, reset: bool) -> Result<()> {
        self.session.finish(reset);
        debug!(terminal = %self.session.terminal, reset, "Card disconnected");
        self.card.disconnect(reset)
    }
}
