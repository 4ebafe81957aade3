//! BIP32 derivation path handling
//!
//! The applet derives keys relative to one of three starting points: the
//! master key (`m/...`), the parent of the current key (`../...`), or the
//! current key itself (`./...`). Hardened components are written `n'` or
//! `nh` and encoded by setting the high bit. On the wire a path is the
//! concatenation of its components as big-endian `u32`s.

use std::str::FromStr;

use coins_bip32::path::DerivationPath;

use crate::constants::params;
use crate::error::{Error, Result};

const HARDENED: u32 = 0x8000_0000;

/// A derivation path together with its starting point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPath {
    /// Use the current key without deriving
    Current,
    /// Derive from the master key
    FromMaster(DerivationPath),
    /// Derive from the parent of the current key
    FromParent(DerivationPath),
    /// Derive from the current key
    FromCurrent(DerivationPath),
}

impl KeyPath {
    /// The P1 starting-point bits for this path
    pub(crate) fn starting_point(&self) -> u8 {
        match self {
            KeyPath::Current | KeyPath::FromMaster(_) => params::P1_DERIVE_FROM_MASTER,
            KeyPath::FromParent(_) => params::P1_DERIVE_FROM_PARENT,
            KeyPath::FromCurrent(_) => params::P1_DERIVE_FROM_CURRENT,
        }
    }

    /// Whether this path is absolute (starts at the master key)
    pub fn is_absolute(&self) -> bool {
        matches!(self, KeyPath::FromMaster(_))
    }

    /// Serialize the path components as big-endian `u32`s
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let components = match self {
            KeyPath::Current => return Vec::new(),
            KeyPath::FromMaster(path)
            | KeyPath::FromParent(path)
            | KeyPath::FromCurrent(path) => path,
        };
        components
            .iter()
            .flat_map(|component| component.to_be_bytes())
            .collect()
    }
}

impl FromStr for KeyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        let (rest, make) = if let Some(rest) = s.strip_prefix("m/") {
            (rest, KeyPath::FromMaster as fn(DerivationPath) -> KeyPath)
        } else if s == "m" {
            ("", KeyPath::FromMaster as fn(DerivationPath) -> KeyPath)
        } else if let Some(rest) = s.strip_prefix("../") {
            (rest, KeyPath::FromParent as fn(DerivationPath) -> KeyPath)
        } else if let Some(rest) = s.strip_prefix("./") {
            (rest, KeyPath::FromCurrent as fn(DerivationPath) -> KeyPath)
        } else {
            (s, KeyPath::FromCurrent as fn(DerivationPath) -> KeyPath)
        };

        if rest.is_empty() {
            return Ok(make(DerivationPath::default()));
        }

        let components = rest
            .split('/')
            .map(parse_component)
            .collect::<Result<Vec<u32>>>()?;

        Ok(make(DerivationPath::from_iter(components)))
    }
}

fn parse_component(segment: &str) -> Result<u32> {
    let (digits, hardened) = match segment.strip_suffix('\'').or_else(|| segment.strip_suffix('h'))
    {
        Some(digits) => (digits, true),
        None => (segment, false),
    };

    let index: u32 = digits
        .parse()
        .map_err(|_| Error::InvalidPath(segment.to_string()))?;

    if index >= HARDENED {
        return Err(Error::InvalidPath(segment.to_string()));
    }

    Ok(if hardened { index | HARDENED } else { index })
}

/// Derivation behavior for SIGN and EXPORT KEY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeriveMode {
    /// Derive for this command only; the current path is unchanged
    Temporary,
    /// Derive and make the result the new current path
    Persistent,
}

/// Assemble the P1 derivation bits and path data for SIGN/EXPORT KEY
///
/// Returns `(derive_option | starting_point, path_bytes)`.
pub(crate) fn derivation_parameters(
    path: &KeyPath,
    mode: Option<DeriveMode>,
    current: u8,
    temporary: u8,
    persistent: u8,
) -> (u8, Vec<u8>) {
    match path {
        KeyPath::Current => (current, Vec::new()),
        _ => {
            let derive_option = match mode {
                Some(DeriveMode::Persistent) => persistent,
                _ => temporary,
            };
            (derive_option | path.starting_point(), path.to_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components(path: &KeyPath) -> Vec<u32> {
        match path {
            KeyPath::Current => Vec::new(),
            KeyPath::FromMaster(p) | KeyPath::FromParent(p) | KeyPath::FromCurrent(p) => {
                p.iter().copied().collect()
            }
        }
    }

    #[test]
    fn parses_absolute_path() {
        let path: KeyPath = "m/44'/60'/0'/0/0".parse().unwrap();
        assert!(path.is_absolute());
        assert_eq!(
            components(&path),
            vec![
                44 | HARDENED,
                60 | HARDENED,
                HARDENED,
                0,
                0
            ]
        );
    }

    #[test]
    fn parses_h_suffix_like_apostrophe() {
        let a: KeyPath = "m/44h/60h/0h".parse().unwrap();
        let b: KeyPath = "m/44'/60'/0'".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parses_relative_paths() {
        let parent: KeyPath = "../0/1".parse().unwrap();
        assert_eq!(parent.starting_point(), params::P1_DERIVE_FROM_PARENT);
        assert_eq!(components(&parent), vec![0, 1]);

        let current: KeyPath = "./2".parse().unwrap();
        assert_eq!(current.starting_point(), params::P1_DERIVE_FROM_CURRENT);
        assert_eq!(components(&current), vec![2]);

        // A bare path is relative to the current key.
        let bare: KeyPath = "3/4".parse().unwrap();
        assert_eq!(bare.starting_point(), params::P1_DERIVE_FROM_CURRENT);
        assert_eq!(components(&bare), vec![3, 4]);
    }

    #[test]
    fn serializes_big_endian() {
        let path: KeyPath = "m/44'/60'/0'/0/0".parse().unwrap();
        let bytes = path.to_bytes();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[..4], &[0x80, 0x00, 0x00, 0x2C]);
        assert_eq!(&bytes[4..8], &[0x80, 0x00, 0x00, 0x3C]);
        assert_eq!(&bytes[8..12], &[0x80, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[12..16], &[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[16..20], &[0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn rejects_invalid_components() {
        assert!("m/44'/x".parse::<KeyPath>().is_err());
        assert!("m/1//2".parse::<KeyPath>().is_err());
        // Hardened bit already set in the literal
        assert!("m/2147483648".parse::<KeyPath>().is_err());
    }

    #[test]
    fn empty_master_path_is_valid() {
        let path: KeyPath = "m".parse().unwrap();
        assert!(path.is_absolute());
        assert!(path.to_bytes().is_empty());
    }

    #[test]
    fn derivation_parameter_assembly() {
        let path: KeyPath = "m/1/2".parse().unwrap();
        let (p1, data) = derivation_parameters(
            &path,
            Some(DeriveMode::Persistent),
            params::P1_SIGN_CURRENT,
            params::P1_SIGN_DERIVE,
            params::P1_SIGN_DERIVE_AND_MAKE_CURRENT,
        );
        assert_eq!(p1, params::P1_SIGN_DERIVE_AND_MAKE_CURRENT);
        assert_eq!(data.len(), 8);

        let (p1, data) = derivation_parameters(
            &KeyPath::Current,
            None,
            params::P1_SIGN_CURRENT,
            params::P1_SIGN_DERIVE,
            params::P1_SIGN_DERIVE_AND_MAKE_CURRENT,
        );
        assert_eq!(p1, params::P1_SIGN_CURRENT);
        assert!(data.is_empty());
    }
}
