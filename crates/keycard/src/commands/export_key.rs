//! EXPORT KEY: read key material off the card
//!
//! P1 combines the derive option with the path starting point; P2 selects
//! what is exported. Private export is only permitted for paths the applet
//! whitelists (EIP-1581 subtrees).

use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins, params};
use crate::error::Result;
use crate::path::{DeriveMode, KeyPath, derivation_parameters};
use crate::types::Keypair;

use super::expect_success;

/// What EXPORT KEY should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOption {
    /// Private and public key
    PrivateAndPublic = 0x00,
    /// Public key only
    PublicKeyOnly = 0x01,
    /// Public key plus chain code
    ExtendedPublicKey = 0x02,
}

/// EXPORT KEY command
pub struct ExportKeyCommand;

impl ExportKeyCommand {
    /// Export the current key
    pub fn current(what: ExportOption) -> Command {
        Command::new(
            CLA_PROPRIETARY,
            ins::EXPORT_KEY,
            params::P1_EXPORT_KEY_CURRENT,
            what as u8,
        )
        .with_le(0)
    }

    /// Derive a key and export it, optionally making it current
    pub fn derived(path: &KeyPath, mode: DeriveMode, what: ExportOption) -> Command {
        let (p1, path_data) = derivation_parameters(
            path,
            Some(mode),
            params::P1_EXPORT_KEY_CURRENT,
            params::P1_EXPORT_KEY_DERIVE,
            params::P1_EXPORT_KEY_DERIVE_AND_MAKE_CURRENT,
        );

        let cmd = Command::new(CLA_PROPRIETARY, ins::EXPORT_KEY, p1, what as u8);
        let cmd = if path_data.is_empty() {
            cmd
        } else {
            cmd.with_data(path_data)
        };
        cmd.with_le(0)
    }

    /// Parse the keypair template
    pub fn parse_response(response: &Response) -> Result<Keypair> {
        let payload = expect_success(response)?;
        Keypair::parse(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_key_wire_format() {
        let raw = ExportKeyCommand::current(ExportOption::PublicKeyOnly).to_bytes();
        assert_eq!(raw.as_ref(), &[0x80, 0xC2, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn derived_key_combines_p1_bits() {
        let path: KeyPath = "m/44'/60'/0'/0".parse().unwrap();
        let raw = ExportKeyCommand::derived(
            &path,
            DeriveMode::Persistent,
            ExportOption::ExtendedPublicKey,
        )
        .to_bytes();

        assert_eq!(raw[2], params::P1_EXPORT_KEY_DERIVE_AND_MAKE_CURRENT);
        assert_eq!(raw[3], 0x02);
        assert_eq!(raw[4], 16);
    }
}
