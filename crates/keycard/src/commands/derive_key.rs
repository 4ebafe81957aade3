//! DERIVE KEY: set the current key by walking a BIP32 path

use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins};
use crate::error::Result;
use crate::path::KeyPath;

use super::expect_ok;

/// DERIVE KEY from one of the three starting points
pub struct DeriveKeyCommand;

impl DeriveKeyCommand {
    /// Build the command; P1 is the starting point, the data the serialized
    /// path components
    pub fn with_path(path: &KeyPath) -> Command {
        let cmd = Command::new(
            CLA_PROPRIETARY,
            ins::DERIVE_KEY,
            path.starting_point(),
            0x00,
        );
        let components = path.to_bytes();
        if components.is_empty() {
            // Deriving an empty master path resets the current key to master.
            cmd
        } else {
            cmd.with_data(components)
        }
    }

    /// Interpret the response
    pub fn parse_response(response: &Response) -> Result<()> {
        expect_ok(response)
    }
}
