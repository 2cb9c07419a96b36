//! Core traits and types for traced APDU (Application Protocol Data Unit) exchanges
//!
//! This crate provides the vocabulary shared by every `apdu-trace` crate:
//!
//! - The transport capability traits ([`CardTerminal`], [`Card`], [`CardChannel`])
//!   that real readers implement and that the logging decorator wraps
//! - Structured [`Command`] and [`Response`] types following ISO/IEC 7816-4
//! - [`CommandLayout`], a best-effort segmentation of raw command buffers used
//!   for display
//! - A single [`Error`] type carried unchanged through every layer
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod error;
pub mod layout;
pub mod response;
pub mod terminal;

pub use command::{Command, ExpectedLength};
pub use error::{Error, Result};
pub use layout::CommandLayout;
pub use response::Response;
pub use response::status::StatusWord;
pub use terminal::{Card, CardChannel, CardTerminal};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, Card, CardChannel, CardTerminal, Command, CommandLayout, Error,
        ExpectedLength, Response, Result, StatusWord,
    };
}
