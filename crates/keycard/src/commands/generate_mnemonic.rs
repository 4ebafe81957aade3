//! GENERATE MNEMONIC: have the card draw BIP39 word indices
//!
//! The card returns raw word indices (big-endian u16 pairs); mapping them to
//! wordlist entries is the caller's business.

use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins};
use crate::error::{Error, Result};

use super::expect_success;

/// GENERATE MNEMONIC, parameterized by checksum size
pub struct GenerateMnemonicCommand;

impl GenerateMnemonicCommand {
    /// Build the command; `checksum_bits` of 4..=8 yields 12..=24 words
    pub fn with_checksum_bits(checksum_bits: u8) -> Result<Command> {
        if !(4..=8).contains(&checksum_bits) {
            return Err(Error::InvalidChecksumSize);
        }
        Ok(
            Command::new(CLA_PROPRIETARY, ins::GENERATE_MNEMONIC, checksum_bits, 0x00)
                .with_le(0),
        )
    }

    /// Parse the word indices (two big-endian bytes each)
    pub fn parse_response(response: &Response) -> Result<Vec<u16>> {
        let payload = expect_success(response)?;
        if payload.len() % 2 != 0 {
            return Err(Error::InvalidResponseLength {
                expected: payload.len() + 1,
                actual: payload.len(),
            });
        }

        Ok(payload
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_bits_are_bounded() {
        assert!(GenerateMnemonicCommand::with_checksum_bits(3).is_err());
        assert!(GenerateMnemonicCommand::with_checksum_bits(9).is_err());
        let cmd = GenerateMnemonicCommand::with_checksum_bits(4).unwrap();
        assert_eq!(cmd.to_bytes().as_ref(), &[0x80, 0xD6, 0x04, 0x00, 0x00]);
    }

    #[test]
    fn parses_word_indices() {
        let raw = [0x00, 0x01, 0x07, 0xFF, 0x00, 0x00, 0x90, 0x00];
        let indices =
            GenerateMnemonicCommand::parse_response(&Response::from_bytes(&raw).unwrap()).unwrap();
        assert_eq!(indices, vec![1, 0x07FF, 0]);
    }

    #[test]
    fn rejects_odd_payload() {
        let raw = [0x00, 0x01, 0x07, 0x90, 0x00];
        assert!(
            GenerateMnemonicCommand::parse_response(&Response::from_bytes(&raw).unwrap()).is_err()
        );
    }
}
