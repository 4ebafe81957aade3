//! INIT: provision PIN, PUK, and pairing token on a pre-initialized card

use bytes::Bytes;
use tessera_apdu::{Command, Response};

use crate::constants::{CLA_ISO7816, ins};
use crate::error::{Error, Result};

/// INIT with a one-shot encrypted secrets payload
///
/// The payload is produced by the secure channel's one-shot encryption:
/// `[len(host_pub)] [host_pub] [iv] [ciphertext]`. INIT is one of the
/// unauthenticated CLA 0x00 commands.
pub struct InitCommand;

impl InitCommand {
    /// Build INIT carrying the encrypted secrets
    pub fn with_encrypted_payload(payload: Bytes) -> Command {
        Command::new_with_data(CLA_ISO7816, ins::INIT, 0x00, 0x00, payload)
    }

    /// Interpret the INIT response
    pub fn parse_response(response: &Response) -> Result<()> {
        match response.status().to_u16() {
            0x9000 => Ok(()),
            0x6985 => Err(Error::AlreadyInitialized),
            _ => Err(Error::from_status(response.status())),
        }
    }
}
