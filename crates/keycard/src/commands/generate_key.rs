//! GENERATE KEY: create a fresh master key on the card

use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins};
use crate::error::{Error, Result};

use super::expect_success;

/// GENERATE KEY; replaces any existing master key
pub struct GenerateKeyCommand;

impl GenerateKeyCommand {
    /// Build the command
    pub fn create() -> Command {
        Command::new(CLA_PROPRIETARY, ins::GENERATE_KEY, 0x00, 0x00).with_le(0)
    }

    /// Parse the 32-byte key UID
    pub fn parse_response(response: &Response) -> Result<[u8; 32]> {
        let payload = expect_success(response)?;
        payload.try_into().map_err(|_| Error::InvalidResponseLength {
            expected: 32,
            actual: payload.len(),
        })
    }
}
