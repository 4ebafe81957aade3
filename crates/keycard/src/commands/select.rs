//! SELECT: pick the applet instance and learn the card's state

use bytes::Bytes;
use tessera_apdu::{Command, Response};

use crate::constants::{CLA_ISO7816, ins};
use crate::error::Result;
use crate::types::SelectedApplication;

use super::expect_success;

/// ISO SELECT by AID
pub struct SelectCommand;

impl SelectCommand {
    /// SELECT the applet with the given AID
    pub fn with_aid(aid: &[u8]) -> Command {
        Command::new_with_data(
            CLA_ISO7816,
            ins::SELECT,
            0x04,
            0x00,
            Bytes::copy_from_slice(aid),
        )
        .with_le(0)
    }

    /// Parse the FCI into the card's selected-application state
    pub fn parse_response(response: &Response) -> Result<SelectedApplication> {
        let payload = expect_success(response)?;
        SelectedApplication::parse(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::KEYCARD_AID;
    use hex_literal::hex;

    #[test]
    fn select_wire_format() {
        let cmd = SelectCommand::with_aid(KEYCARD_AID);
        assert_eq!(
            cmd.to_bytes().as_ref(),
            hex!("00A4040009A0000008040001010100")
        );
    }

    #[test]
    fn parses_pre_initialized_response() {
        // 0x80 || len || uncompressed public key, as sent before INIT.
        let mut raw = vec![0x80, 0x41];
        raw.extend_from_slice(&hex!(
            "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
        ));
        raw.extend_from_slice(&[0x90, 0x00]);

        let response = Response::from_bytes(&raw).unwrap();
        let parsed = SelectCommand::parse_response(&response).unwrap();
        assert!(!parsed.is_initialized());
        assert!(parsed.public_key().is_some());
    }

    #[test]
    fn error_status_is_mapped() {
        let response = Response::from_bytes(&[0x6A, 0x82]).unwrap();
        assert!(SelectCommand::parse_response(&response).is_err());
    }
}
