//! Logging decorator for smart card terminals
//!
//! This crate wraps any [`CardTerminal`] so that every connect, transaction,
//! control and transmit call is written to a human readable trace, while the
//! wrapped transport sees exactly the same calls and the application sees
//! exactly the same results.
//!
//! Optionally every exchange is also appended to a replay dump: a plain text
//! file of `#` comment lines and bare hex lines that tools can feed back to a
//! simulated card.
//!
//! # Examples
//!
//! ```no_run
//! # fn run<T: apdu_trace_core::CardTerminal>(reader: T) -> apdu_trace_core::Result<()> {
//! use apdu_trace::{LoggingTerminal, TraceConfig};
//! use apdu_trace_core::prelude::*;
//!
//! let config = TraceConfig::new().with_dump_file("session.apdu");
//! let terminal = LoggingTerminal::with_config(reader, config);
//!
//! // SCardConnect("<reader>", T=*) -> T=1, 3B65...
//! let card = terminal.connect("*")?;
//! let mut channel = card.basic_channel();
//!
//! // A>> T=1 (4+0000) 00A40400 00
//! // A<< (0000+2) (12ms) 9000
//! channel.transmit(&Command::new_with_le(0x00, 0xA4, 0x04, 0x00, 256))?;
//!
//! // SCardDisconnect("<reader>", false) tx:5/rx:2
//! card.disconnect(false)?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod card;
mod channel;
mod config;
mod sink;
mod terminal;
mod util;

pub use apdu_trace_core::{Card, CardChannel, CardTerminal};
pub use card::{LoggingCard, Session};
pub use channel::LoggingChannel;
pub use config::{DumpFactory, ErrorTranslator, TraceConfig};
pub use sink::LogStream;
pub use terminal::LoggingTerminal;
pub use util::format_elapsed;
