//! REMOVE KEY: delete the master key

use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins};
use crate::error::Result;

use super::expect_ok;

/// REMOVE KEY
pub struct RemoveKeyCommand;

impl RemoveKeyCommand {
    /// Build the command
    pub fn remove() -> Command {
        Command::new(CLA_PROPRIETARY, ins::REMOVE_KEY, 0x00, 0x00)
    }

    /// Interpret the response
    pub fn parse_response(response: &Response) -> Result<()> {
        expect_ok(response)
    }
}
