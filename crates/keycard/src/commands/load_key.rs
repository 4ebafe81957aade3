//! LOAD KEY: install a BIP39 seed as the master key

use bytes::Bytes;
use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins, params};
use crate::error::{Error, Result};

use super::expect_success;

/// LOAD KEY, seed variant
pub struct LoadKeyCommand;

impl LoadKeyCommand {
    /// Build LOAD KEY carrying a 64-byte BIP39 seed
    pub fn with_seed(seed: &[u8; 64]) -> Command {
        Command::new_with_data(
            CLA_PROPRIETARY,
            ins::LOAD_KEY,
            params::P1_LOAD_KEY_SEED,
            0x00,
            Bytes::copy_from_slice(seed),
        )
        .with_le(0)
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
