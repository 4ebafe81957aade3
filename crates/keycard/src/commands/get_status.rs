//! GET STATUS: application status or the current key path

use coins_bip32::path::DerivationPath;
use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins, params};
use crate::error::{Error, Result};
use crate::types::ApplicationStatus;

use super::expect_success;

/// GET STATUS, P1 selecting the template
pub struct GetStatusCommand;

impl GetStatusCommand {
    /// Request the application status template
    pub fn application() -> Command {
        Command::new(
            CLA_PROPRIETARY,
            ins::GET_STATUS,
            params::P1_GET_STATUS_APPLICATION,
            0x00,
        )
        .with_le(0)
    }

    /// Request the current BIP32 key path
    pub fn key_path() -> Command {
        Command::new(
            CLA_PROPRIETARY,
            ins::GET_STATUS,
            params::P1_GET_STATUS_KEY_PATH,
            0x00,
        )
        .with_le(0)
    }

    /// Parse the application status template
    pub fn parse_application_status(response: &Response) -> Result<ApplicationStatus> {
        let payload = expect_success(response)?;
        ApplicationStatus::parse(payload)
    }

    /// Parse the key path: big-endian `u32` per component
    pub fn parse_key_path(response: &Response) -> Result<DerivationPath> {
        let payload = expect_success(response)?;
        if payload.len() % 4 != 0 {
            return Err(Error::InvalidResponseLength {
                expected: payload.len() + 4 - payload.len() % 4,
                actual: payload.len(),
            });
        }

        let components = payload
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes(chunk.try_into().expect("chunked by 4")));
        Ok(DerivationPath::from_iter(components))
    }
}
