//! PC/SC transport for smart card terminals
//!
//! Implements the [`CardTerminal`](apdu_trace_core::CardTerminal) family of
//! traits over the system PC/SC service, so real readers can be wrapped by
//! the logging decorator.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod manager;
mod reader;
mod terminal;

pub use config::{PcscConfig, ResetMode, ShareMode};
pub use error::PcscError;
pub use manager::PcscDeviceManager;
pub use reader::PcscReader;
pub use terminal::{PcscCard, PcscChannel, PcscTerminal};
