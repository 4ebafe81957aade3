//! FACTORY RESET: wipe the card back to the pre-initialized state

use tessera_apdu::{Command, Response};

use crate::constants::{CLA_ISO7816, ins, params};
use crate::error::Result;

use super::expect_ok;

/// FACTORY RESET, guarded by magic P1/P2 values
pub struct FactoryResetCommand;

impl FactoryResetCommand {
    /// Build the command
    pub fn reset() -> Command {
        Command::new(
            CLA_ISO7816,
            ins::FACTORY_RESET,
            params::P1_FACTORY_RESET_MAGIC,
            params::P2_FACTORY_RESET_MAGIC,
        )
    }

    /// Interpret the response
    pub fn parse_response(response: &Response) -> Result<()> {
        expect_ok(response)
    }
}
