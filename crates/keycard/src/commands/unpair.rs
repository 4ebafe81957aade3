//! UNPAIR: free a pairing slot

use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins};
use crate::error::Result;

use super::expect_ok;

/// UNPAIR the given slot
pub struct UnpairCommand;

impl UnpairCommand {
    /// Build the command; P1 is the slot index
    pub fn with_index(index: u8) -> Command {
        Command::new(CLA_PROPRIETARY, ins::UNPAIR, index, 0x00)
    }

    /// Interpret the response
    pub fn parse_response(response: &Response) -> Result<()> {
        expect_ok(response)
    }
}
