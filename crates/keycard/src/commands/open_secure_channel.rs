//! OPEN SECURE CHANNEL: exchange ephemeral keys for a fresh session

use cipher::Iv;
use k256::{PublicKey, elliptic_curve::sec1::ToEncodedPoint};
use tessera_apdu::{Command, Response};

use crate::constants::{CLA_ISO7816, ins};
use crate::crypto::{Challenge, KeycardScp};
use crate::error::{Error, Result};

use super::expect_success;

/// OPEN SECURE CHANNEL with the client's ephemeral public key
pub struct OpenSecureChannelCommand;

/// Card's salt and initial IV for session key derivation
pub struct OpenSecureChannelResponse {
    /// 32-byte salt mixed into the session key derivation
    pub salt: Challenge,
    /// Initial IV seeding the running MAC/IV chain
    pub iv: Iv<KeycardScp>,
}

impl OpenSecureChannelCommand {
    /// Build the command: P1 is the pairing slot, data the uncompressed
    /// ephemeral public key
    pub fn with_pairing_index_and_pubkey(index: u8, public_key: &PublicKey) -> Command {
        Command::new_with_data(
            CLA_ISO7816,
            ins::OPEN_SECURE_CHANNEL,
            index,
            0x00,
            public_key.to_encoded_point(false).as_bytes().to_vec(),
        )
        .with_le(0)
    }

    /// Parse the response: `salt(32) || iv(16)`
    pub fn parse_response(response: &Response) -> Result<OpenSecureChannelResponse> {
        let payload = expect_success(response)?;
        if payload.len() != 48 {
            return Err(Error::InvalidResponseLength {
                expected: 48,
                actual: payload.len(),
            });
        }

        Ok(OpenSecureChannelResponse {
            salt: Challenge::clone_from_slice(&payload[..32]),
            iv: Iv::<KeycardScp>::clone_from_slice(&payload[32..]),
        })
    }
}
