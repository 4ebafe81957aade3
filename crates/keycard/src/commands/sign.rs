//! SIGN: ECDSA over a 32-byte hash, in three variants
//!
//! P1 selects the key: the current key, a derived path (optionally made
//! current), or the pre-authorized pinless path. P2 is always 1 (ECDSA over
//! a precomputed hash).

use bytes::{BufMut, Bytes, BytesMut};
use tessera_apdu::{Command, Response};

use crate::constants::{CLA_PROPRIETARY, ins, params};
use crate::error::Result;
use crate::path::{DeriveMode, KeyPath, derivation_parameters};
use crate::types::Signature;

use super::expect_success;

/// SIGN command, all P1 variants
pub struct SignCommand;

impl SignCommand {
    /// Sign with the current key
    pub fn with_current_key(hash: &[u8; 32]) -> Command {
        Self::build(params::P1_SIGN_CURRENT, Bytes::copy_from_slice(hash))
    }

    /// Sign with a derived key, optionally making it current
    pub fn with_path(hash: &[u8; 32], path: &KeyPath, mode: DeriveMode) -> Command {
        let (p1, path_data) = derivation_parameters(
            path,
            Some(mode),
            params::P1_SIGN_CURRENT,
            params::P1_SIGN_DERIVE,
            params::P1_SIGN_DERIVE_AND_MAKE_CURRENT,
        );

        let mut data = BytesMut::with_capacity(hash.len() + path_data.len());
        data.put_slice(hash);
        data.put_slice(&path_data);
        Self::build(p1, data.freeze())
    }

    /// Sign with the pinless path; works without PIN authentication
    pub fn pinless(hash: &[u8; 32]) -> Command {
        Self::build(params::P1_SIGN_PINLESS, Bytes::copy_from_slice(hash))
    }

    fn build(p1: u8, data: Bytes) -> Command {
        Command::new_with_data(CLA_PROPRIETARY, ins::SIGN, p1, params::P2_SIGN_ECDSA, data)
            .with_le(0)
    }

    /// Parse the signature template
    pub fn parse_response(response: &Response) -> Result<Signature> {
        let payload = expect_success(response)?;
        Signature::parse(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_key_wire_format() {
        let raw = SignCommand::with_current_key(&[0xCD; 32]).to_bytes();
        assert_eq!(&raw[..4], &[0x80, 0xC8, 0x00, 0x01]);
        assert_eq!(raw[4], 32);
        // Le trails the data
        assert_eq!(raw[raw.len() - 1], 0x00);
    }

    #[test]
    fn path_variant_appends_components() {
        let path: KeyPath = "m/44'/60'/0'/0/0".parse().unwrap();
        let raw = SignCommand::with_path(&[0xCD; 32], &path, DeriveMode::Temporary).to_bytes();
        assert_eq!(raw[2], params::P1_SIGN_DERIVE);
        assert_eq!(raw[4], 32 + 20);

        let raw = SignCommand::with_path(&[0xCD; 32], &path, DeriveMode::Persistent).to_bytes();
        assert_eq!(raw[2], params::P1_SIGN_DERIVE_AND_MAKE_CURRENT);
    }

    #[test]
    fn relative_path_sets_start_point_bits() {
        let path: KeyPath = "../0".parse().unwrap();
        let raw = SignCommand::with_path(&[0xCD; 32], &path, DeriveMode::Temporary).to_bytes();
        assert_eq!(raw[2], params::P1_SIGN_DERIVE | params::P1_DERIVE_FROM_PARENT);
    }

    #[test]
    fn pinless_wire_format() {
        let raw = SignCommand::pinless(&[0xCD; 32]).to_bytes();
        assert_eq!(raw[2], params::P1_SIGN_PINLESS);
    }
}
