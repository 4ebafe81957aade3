//! PAIR: two-step mutual proof of the pairing password
//!
//! Step one sends a client challenge; the card answers with its cryptogram
//! and its own challenge. The client verifies the card cryptogram locally
//! (wrong passwords die here, before any second APDU), then answers the
//! card's challenge. The final response carries the assigned slot index and
//! the salt from which the pairing key is derived.

use bytes::Bytes;
use tessera_apdu::{Command, Response};

use crate::constants::{CLA_ISO7816, ins, params};
use crate::crypto::{Challenge, Cryptogram};
use crate::error::{Error, Result};

/// PAIR command, both stages
pub struct PairCommand;

/// Card's answer to the first PAIR stage
pub struct PairFirstStage {
    /// Card cryptogram over the client challenge
    pub cryptogram: Cryptogram,
    /// Card challenge for the client to answer
    pub challenge: Challenge,
}

/// Card's answer to the final PAIR stage
pub struct PairFinalStage {
    /// Assigned pairing slot
    pub index: u8,
    /// Salt mixed into the pairing key
    pub salt: Challenge,
}

impl PairCommand {
    /// First stage: send the client challenge
    pub fn with_challenge(challenge: &Challenge) -> Command {
        Command::new_with_data(
            CLA_ISO7816,
            ins::PAIR,
            params::P1_PAIR_FIRST_STEP,
            0x00,
            challenge.to_vec(),
        )
        .with_le(0)
    }

    /// Final stage: answer the card's challenge
    pub fn with_cryptogram(cryptogram: &Cryptogram) -> Command {
        Command::new_with_data(
            CLA_ISO7816,
            ins::PAIR,
            params::P1_PAIR_FINAL_STEP,
            0x00,
            cryptogram.to_vec(),
        )
        .with_le(0)
    }

    /// Parse the first-stage response: `cryptogram(32) || challenge(32)`
    pub fn parse_first_stage(response: &Response) -> Result<PairFirstStage> {
        let payload = map_pair_status(response)?;
        if payload.len() != 64 {
            return Err(Error::InvalidResponseLength {
                expected: 64,
                actual: payload.len(),
            });
        }
        Ok(PairFirstStage {
            cryptogram: Cryptogram::clone_from_slice(&payload[..32]),
            challenge: Challenge::clone_from_slice(&payload[32..]),
        })
    }

    /// Parse the final-stage response: `index(1) || salt(32)`
    pub fn parse_final_stage(response: &Response) -> Result<PairFinalStage> {
        let payload = map_pair_status(response)?;
        if payload.len() != 33 {
            return Err(Error::InvalidResponseLength {
                expected: 33,
                actual: payload.len(),
            });
        }
        Ok(PairFinalStage {
            index: payload[0],
            salt: Challenge::clone_from_slice(&payload[1..]),
        })
    }
}

fn map_pair_status(response: &Response) -> Result<Bytes> {
    match response.status().to_u16() {
        0x9000 => Ok(Bytes::copy_from_slice(response.payload())),
        // The card rejected the client cryptogram: wrong pairing password.
        0x6982 => Err(Error::CryptogramMismatch),
        0x6A84 => Err(Error::PairingSlotsFull),
        _ => Err(Error::from_status(response.status())),
    }
}
