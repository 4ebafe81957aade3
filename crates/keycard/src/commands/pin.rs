//! VERIFY PIN, CHANGE PIN/PUK/pairing secret, UNBLOCK PIN

use bytes::{BufMut, Bytes, BytesMut};
use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins, params};
use crate::crypto::generate_pairing_token;
use crate::error::{Error, Result};

use super::expect_ok;

/// VERIFY PIN
pub struct VerifyPinCommand;

impl VerifyPinCommand {
    /// Build VERIFY PIN carrying the PIN digits
    pub fn with_pin(pin: &str) -> Command {
        Command::new_with_data(
            CLA_PROPRIETARY,
            ins::VERIFY_PIN,
            0x00,
            0x00,
            Bytes::copy_from_slice(pin.as_bytes()),
        )
    }

    /// Interpret the response; `63 CX` carries the remaining attempts
    pub fn parse_response(response: &Response) -> Result<()> {
        expect_ok(response)
    }
}

/// CHANGE PIN; P1 selects which credential changes
pub struct ChangePinCommand;

impl ChangePinCommand {
    /// Change the user PIN
    pub fn with_pin(new_pin: &str) -> Command {
        Self::build(params::P1_CHANGE_PIN, Bytes::copy_from_slice(new_pin.as_bytes()))
    }

    /// Change the PUK
    pub fn with_puk(new_puk: &str) -> Command {
        Self::build(params::P1_CHANGE_PUK, Bytes::copy_from_slice(new_puk.as_bytes()))
    }

    /// Change the pairing secret; the password is sent as its derived token
    pub fn with_pairing_secret(new_password: &str) -> Command {
        Self::build(
            params::P1_CHANGE_PAIRING_SECRET,
            Bytes::copy_from_slice(&generate_pairing_token(new_password)),
        )
    }

    fn build(p1: u8, data: Bytes) -> Command {
        Command::new_with_data(CLA_PROPRIETARY, ins::CHANGE_PIN, p1, 0x00, data)
    }

    /// Interpret the response
    pub fn parse_response(response: &Response) -> Result<()> {
        expect_ok(response)
    }
}

/// UNBLOCK PIN: the PUK followed by the new PIN
pub struct UnblockPinCommand;

impl UnblockPinCommand {
    /// Build UNBLOCK PIN: `PUK(12) || new PIN(6)`
    pub fn with_puk_and_new_pin(puk: &str, new_pin: &str) -> Command {
        let mut buf = BytesMut::with_capacity(puk.len() + new_pin.len());
        buf.put_slice(puk.as_bytes());
        buf.put_slice(new_pin.as_bytes());
        Command::new_with_data(CLA_PROPRIETARY, ins::UNBLOCK_PIN, 0x00, 0x00, buf.freeze())
    }

    /// Interpret the response; `63 CX` here means a wrong PUK, and an
    /// exhausted counter means the card is unrecoverable
    pub fn parse_response(response: &Response) -> Result<()> {
        if let Some(remaining) = response.status().counter() {
            return Err(if remaining == 0 {
                Error::CardBlocked
            } else {
                Error::WrongPuk { remaining }
            });
        }
        expect_ok(response)
    }
}
