//! MUTUALLY AUTHENTICATE: prove both sides derived the same session keys

use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins};
use crate::crypto::{Challenge, Cryptogram};
use crate::error::{Error, Result};

/// MUTUALLY AUTHENTICATE with a random client challenge
///
/// The exchange flows through the normal encrypt/MAC pipeline; a readable
/// response proves the card holds the same MAC key.
pub struct MutuallyAuthenticateCommand;

impl MutuallyAuthenticateCommand {
    /// Build the command carrying the client challenge
    pub fn with_challenge(challenge: &Challenge) -> Command {
        Command::new_with_data(
            CLA_PROPRIETARY,
            ins::MUTUALLY_AUTHENTICATE,
            0x00,
            0x00,
            challenge.to_vec(),
        )
        .with_le(0)
    }

    /// Parse the card's 32-byte response challenge
    pub fn parse_response(response: &Response) -> Result<Cryptogram> {
        if !response.is_success() {
            return Err(Error::MutualAuthenticationFailed);
        }
        let payload = response.payload();
        if payload.len() != 32 {
            return Err(Error::MutualAuthenticationFailed);
        }
        Ok(Cryptogram::clone_from_slice(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_failure_is_authentication_failure() {
        for raw in [&[0x69u8, 0x82][..], &[0x69, 0x85], &[0x6F, 0x05]] {
            let response = Response::from_bytes(raw).unwrap();
            assert!(matches!(
                MutuallyAuthenticateCommand::parse_response(&response),
                Err(Error::MutualAuthenticationFailed)
            ));
        }

        // Success with a short payload is also a failure.
        let short = Response::from_bytes(&[0x01, 0x02, 0x90, 0x00]).unwrap();
        assert!(MutuallyAuthenticateCommand::parse_response(&short).is_err());
    }

    #[test]
    fn accepts_valid_response() {
        let mut raw = vec![0x42; 32];
        raw.extend_from_slice(&[0x90, 0x00]);
        let response = Response::from_bytes(&raw).unwrap();
        assert!(MutuallyAuthenticateCommand::parse_response(&response).is_ok());
    }
}
