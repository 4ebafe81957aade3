//! IDENTIFY: have the card sign a challenge with its identity key
//!
//! Works without a secure channel; the response is the standard signature
//! template.

use rand::RngCore;
use tessera_apdu::{Command, Response};

use crate::constants::{CLA_ISO7816, ins};
use crate::error::Result;
use crate::types::Signature;

use super::expect_success;

/// IDENTIFY with a 32-byte challenge
pub struct IdentCommand;

impl IdentCommand {
    /// Build the command with the caller's challenge
    pub fn with_challenge(challenge: &[u8; 32]) -> Command {
        Command::new_with_data(CLA_ISO7816, ins::IDENT, 0x00, 0x00, challenge.to_vec()).with_le(0)
    }

    /// Build the command with a random challenge
    pub fn with_random_challenge() -> Command {
        let mut challenge = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut challenge);
        Self::with_challenge(&challenge)
    }

    /// Parse the signature over the challenge
    pub fn parse_response(response: &Response) -> Result<Signature> {
        let payload = expect_success(response)?;
        Signature::parse(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_uses_iso_class() {
        let raw = IdentCommand::with_challenge(&[0x77; 32]).to_bytes();
        assert_eq!(&raw[..4], &[0x00, 0x14, 0x00, 0x00]);
        assert_eq!(raw[4], 32);
    }
}
