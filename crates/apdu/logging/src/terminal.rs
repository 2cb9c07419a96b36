//! Traced card terminal

use std::fmt;
use std::time::Duration;

use apdu_trace_core::{CardTerminal, Result};

use crate::card::LoggingCard;
use crate::config::{DumpFactory, ErrorTranslator, TraceConfig};
use crate::sink::LogStream;

/// A card terminal whose sessions are traced
///
/// Identity and presence queries are forwarded untouched and never traced;
/// only [`connect`](CardTerminal::connect) creates traced state.
pub struct LoggingTerminal<T> {
    /// The wrapped terminal
    terminal: T,
    /// Live trace, shared with every session
    log: LogStream,
    /// Replay dump destination, opened at each connect
    dump: Option<DumpFactory>,
    /// Error translation for failure lines
    translator: ErrorTranslator,
}

impl<T: fmt::Debug> fmt::Debug for LoggingTerminal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingTerminal")
            .field("terminal", &self.terminal)
            .field("log", &self.log)
            .field("has_dump", &self.dump.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: CardTerminal> LoggingTerminal<T> {
    /// Trace `terminal` to stdout, without a replay dump
    pub fn new(terminal: T) -> Self {
        Self::with_config(terminal, TraceConfig::default())
    }

    /// Trace `terminal` as described by `config`
    pub fn with_config(terminal: T, config: TraceConfig) -> Self {
        let (log, dump, translator) = config.into_parts();
        Self {
            terminal,
            log,
            dump,
            translator,
        }
    }

    /// The wrapped terminal
    pub const fn inner(&self) -> &T {
        &self.terminal
    }

    /// Unwrap the terminal, dropping the trace configuration
    pub fn into_inner(self) -> T {
        self.terminal
    }
}

impl<T: CardTerminal> CardTerminal for LoggingTerminal<T> {
    type Card = LoggingCard<T::Card>;

    fn name(&self) -> &str {
        self.terminal.name()
    }

    fn connect(&self, protocol: &str) -> Result<Self::Card> {
        LoggingCard::connect(
            &self.terminal,
            protocol,
            &self.log,
            self.dump.as_ref(),
            self.translator,
        )
    }

    fn is_card_present(&self) -> Result<bool> {
        self.terminal.is_card_present()
    }

    fn wait_for_card_present(&self, timeout: Duration) -> Result<bool> {
        self.terminal.wait_for_card_present(timeout)
    }

    fn wait_for_card_absent(&self, timeout: Duration) -> Result<bool> {
        self.terminal.wait_for_card_absent(timeout)
    }
}
