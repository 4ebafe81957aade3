//! Client library for the Keycard secure element
//!
//! Speaks the Keycard ISO 7816-4 applet protocol over any
//! [`CardTransport`](tessera_apdu::CardTransport): PIN-protected BIP32 key
//! management, ECDSA signing, and small data storage behind a mutually
//! authenticated encrypted channel.
//!
//! The typical flow:
//!
//! 1. [`Keycard::select`]: find the applet, learn the card state, seed the
//!    ECDH handshake
//! 2. [`Keycard::init`] with fresh [`Secrets`] when the card is
//!    pre-initialized
//! 3. [`Keycard::pair`] once per client, storing the returned
//!    [`PairingInfo`]
//! 4. [`Keycard::open_secure_channel`] and [`Keycard::verify_pin`]
//! 5. Key and signing operations
//!
//! Transports (PC/SC, NFC) live outside this crate; anything that can move
//! an APDU to a card and a response back will do.

#![forbid(unsafe_code)]

mod application;
mod constants;
mod crypto;
mod error;
mod path;
mod secrets;
mod secure_channel;
mod session;

pub mod commands;
pub mod types;

pub use application::Keycard;
pub use constants::KEYCARD_AID;
pub use crypto::{Challenge, Cryptogram, PairingToken};
pub use error::{Error, Result};
pub use path::{DeriveMode, KeyPath};
pub use secrets::{Secrets, validate_pairing_password, validate_pin, validate_puk};
pub use secure_channel::SecureChannel;

pub use commands::{CredentialType, ExportOption, PersistentRecord};
pub use types::{
    ApplicationInfo, ApplicationStatus, Capabilities, Capability, ExportedKey, PairingInfo,
    SelectedApplication, Signature, Version,
};

// Re-export the APDU layer types that appear in this crate's API.
pub use tessera_apdu::{CardTransport, Command, MockTransport, Response, StatusWord};
