//! SET PINLESS PATH: authorize a path for PIN-less signing

use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins};
use crate::error::{Error, Result};
use crate::path::KeyPath;

use super::expect_ok;

/// SET PINLESS PATH; the path must be absolute
pub struct SetPinlessPathCommand;

impl SetPinlessPathCommand {
    /// Build the command; rejects non-absolute paths locally
    pub fn with_path(path: &KeyPath) -> Result<Command> {
        if !path.is_absolute() {
            return Err(Error::PathNotAbsolute);
        }
        let components = path.to_bytes();
        let cmd = Command::new(CLA_PROPRIETARY, ins::SET_PINLESS_PATH, 0x00, 0x00);
        Ok(if components.is_empty() {
            cmd
        } else {
            cmd.with_data(components)
        })
    }

    /// Build the command that clears the pinless path
    pub fn clear() -> Command {
        Command::new(CLA_PROPRIETARY, ins::SET_PINLESS_PATH, 0x00, 0x00)
    }

    /// Interpret the response
    pub fn parse_response(response: &Response) -> Result<()> {
        expect_ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_absolute_path() {
        let relative: KeyPath = "../0".parse().unwrap();
        assert!(matches!(
            SetPinlessPathCommand::with_path(&relative),
            Err(Error::PathNotAbsolute)
        ));

        let absolute: KeyPath = "m/44'/60'/0'/0/0".parse().unwrap();
        let raw = SetPinlessPathCommand::with_path(&absolute).unwrap().to_bytes();
        assert_eq!(&raw[..4], &[0x80, 0xC9, 0x00, 0x00]);
        assert_eq!(raw[4], 20);
    }
}
