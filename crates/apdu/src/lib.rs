//! ISO 7816-4 APDU codec and card transport abstractions
//!
//! This crate provides the building blocks for talking to a smart card:
//!
//! - [`Command`] and [`Response`] for encoding and decoding short-form APDUs
//! - [`StatusWord`] for status word (SW1-SW2) interpretation
//! - [`CardTransport`], the contract a physical transport (PC/SC, NFC, ...)
//!   has to fulfil: given raw APDU bytes, return raw response bytes
//! - [`exchange::transmit`], which drives one command to completion,
//!   reassembling chained `61 XX` responses via GET RESPONSE
//!
//! The crate knows nothing about any particular applet; protocol layers are
//! built on top of it.

#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod command;
pub mod exchange;
pub mod response;
pub mod status;
pub mod transport;

mod error;

pub use command::Command;
pub use error::{Error, Result};
pub use response::Response;
pub use status::StatusWord;
pub use transport::{CardTransport, MockTransport, TransportError};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};
