//! Command builders and response parsing, one module per instruction
//!
//! Each `XxxCommand` type carries builders that produce a ready-to-send
//! [`Command`](tessera_apdu::Command) and a `parse_response` that turns the
//! (already decrypted) logical response into a typed result, mapping status
//! words onto the crate error taxonomy.

use tessera_apdu::Response;

use crate::error::{Error, Result};

pub mod derive_key;
pub use derive_key::*;
pub mod export_key;
pub use export_key::*;
pub mod factory_reset;
pub use factory_reset::*;
pub mod generate_key;
pub use generate_key::*;
pub mod generate_mnemonic;
pub use generate_mnemonic::*;
pub mod get_data;
pub use get_data::*;
pub mod get_status;
pub use get_status::*;
pub mod ident;
pub use ident::*;
pub mod init;
pub use init::*;
pub mod load_key;
pub use load_key::*;
pub mod mutually_authenticate;
pub use mutually_authenticate::*;
pub mod open_secure_channel;
pub use open_secure_channel::*;
pub mod pair;
pub use pair::*;
pub mod pin;
pub use pin::*;
pub mod remove_key;
pub use remove_key::*;
pub mod select;
pub use select::*;
pub mod set_pinless_path;
pub use set_pinless_path::*;
pub mod sign;
pub use sign::*;
pub mod store_data;
pub use store_data::*;
pub mod unpair;
pub use unpair::*;

/// Storage slot addressed by STORE DATA / GET DATA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistentRecord {
    /// General-purpose public data
    Public = 0x00,
    /// NDEF record
    Ndef = 0x01,
    /// Cash card record
    Cashcard = 0x02,
}

/// Which credential CHANGE PIN operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialType {
    /// 6-digit user PIN
    Pin,
    /// 12-digit unblock PUK
    Puk,
    /// Pairing secret (sent as its derived 32-byte token)
    PairingSecret,
}

/// Return the payload of a successful response, or the mapped status error
pub(crate) fn expect_success(response: &Response) -> Result<&[u8]> {
    if response.is_success() {
        Ok(response.payload())
    } else {
        Err(Error::from_status(response.status()))
    }
}

/// Require a success response with no interest in the payload
pub(crate) fn expect_ok(response: &Response) -> Result<()> {
    expect_success(response).map(|_| ())
}
