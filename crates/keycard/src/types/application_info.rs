use std::fmt;

use iso7816_tlv::ber::Tlv;

use crate::constants::tags;
use crate::error::{Error, Result};

use super::{
    Capabilities, Version, constructed_children, find_child, find_primitive, has_tag,
    parse_public_key, primitive_value,
};

/// Application info returned by SELECT on an initialized card
#[derive(Debug, Clone)]
pub struct ApplicationInfo {
    /// Instance UID (16 bytes)
    pub instance_uid: [u8; 16],
    /// Secure channel public key (absent when the card lacks the capability)
    pub public_key: Option<k256::PublicKey>,
    /// Applet version
    pub version: Version,
    /// Free pairing slots remaining
    pub remaining_slots: u8,
    /// SHA-256 of the master public key; `None` when no key is loaded
    pub key_uid: Option<[u8; 32]>,
    /// Advertised capability flags
    pub capabilities: Capabilities,
}

impl ApplicationInfo {
    /// Whether a master key is loaded on the card
    pub fn has_key(&self) -> bool {
        self.key_uid.is_some()
    }
}

/// Outcome of selecting the applet
///
/// A pre-initialized card answers with a bare public key TLV and expects
/// INIT next; an initialized card answers with the application info
/// template.
#[derive(Debug, Clone)]
pub enum SelectedApplication {
    /// Card is initialized; full application info available
    Initialized(ApplicationInfo),
    /// Card awaits INIT; only the secure channel key may be present
    PreInitialized(Option<k256::PublicKey>),
}

impl SelectedApplication {
    /// Whether the card is initialized
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized(_))
    }

    /// The card's secure channel public key, in either state
    pub fn public_key(&self) -> Option<&k256::PublicKey> {
        match self {
            Self::Initialized(info) => info.public_key.as_ref(),
            Self::PreInitialized(key) => key.as_ref(),
        }
    }

    /// Application info, when the card is initialized
    pub fn application_info(&self) -> Option<&ApplicationInfo> {
        match self {
            Self::Initialized(info) => Some(info),
            Self::PreInitialized(_) => None,
        }
    }

    /// Parse a SELECT response payload
    pub(crate) fn parse(payload: &[u8]) -> Result<Self> {
        let tlv = Tlv::from_bytes(payload)?;

        if has_tag(&tlv, tags::TEMPLATE_APPLICATION_INFO) {
            Ok(Self::Initialized(parse_application_info(&tlv)?))
        } else if has_tag(&tlv, tags::ECC_PUBLIC_KEY) {
            let value = primitive_value(&tlv, tags::ECC_PUBLIC_KEY)?;
            Ok(Self::PreInitialized(parse_public_key(
                &value,
                tags::ECC_PUBLIC_KEY,
            )?))
        } else {
            Err(Error::MalformedPayload {
                tag: tags::TEMPLATE_APPLICATION_INFO,
                reason: "unexpected top-level tag in SELECT response",
            })
        }
    }
}

fn parse_application_info(tlv: &Tlv) -> Result<ApplicationInfo> {
    let children = constructed_children(tlv, tags::TEMPLATE_APPLICATION_INFO)?;

    let instance_uid: [u8; 16] = find_primitive(children, tags::INSTANCE_UID)?
        .try_into()
        .map_err(|_| Error::MalformedPayload {
            tag: tags::INSTANCE_UID,
            reason: "instance UID must be 16 bytes",
        })?;

    let public_key = parse_public_key(
        &find_primitive(children, tags::ECC_PUBLIC_KEY)?,
        tags::ECC_PUBLIC_KEY,
    )?;

    // Two INT siblings share the same tag: version first, then the number of
    // remaining pairing slots. Unknown tags in between are skipped.
    let mut ints = children
        .iter()
        .filter(|child| has_tag(child, tags::INT))
        .map(|child| primitive_value(child, tags::INT));

    let version = Version::from_bytes(
        &ints.next().ok_or(Error::MalformedPayload {
            tag: tags::INT,
            reason: "missing version",
        })??,
        tags::INT,
    )?;

    let slots = ints.next().ok_or(Error::MalformedPayload {
        tag: tags::INT,
        reason: "missing pairing slot count",
    })??;
    let remaining_slots = *slots.first().ok_or(Error::MalformedPayload {
        tag: tags::INT,
        reason: "empty pairing slot count",
    })?;

    let key_uid = {
        let raw = find_primitive(children, tags::KEY_UID)?;
        match raw.len() {
            0 => None,
            32 => Some(raw.try_into().expect("length checked")),
            _ => {
                return Err(Error::MalformedPayload {
                    tag: tags::KEY_UID,
                    reason: "key UID must be empty or 32 bytes",
                });
            }
        }
    };

    // Capabilities are optional; cards that predate the flag support
    // everything.
    let capabilities = match find_child(children, tags::CAPABILITIES) {
        Some(child) => Capabilities::from(
            *primitive_value(child, tags::CAPABILITIES)?
                .first()
                .ok_or(Error::MalformedPayload {
                    tag: tags::CAPABILITIES,
                    reason: "empty capabilities",
                })?,
        ),
        None => Capabilities::ALL,
    };

    Ok(ApplicationInfo {
        instance_uid,
        public_key,
        version,
        remaining_slots,
        key_uid,
        capabilities,
    })
}

impl fmt::Display for ApplicationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Application info:")?;
        writeln!(f, "  instance UID: {}", hex::encode(self.instance_uid))?;
        writeln!(f, "  version: {}", self.version)?;
        writeln!(f, "  remaining pairing slots: {}", self.remaining_slots)?;
        match &self.key_uid {
            Some(uid) => writeln!(f, "  key UID: {}", hex::encode(uid))?,
            None => writeln!(f, "  key UID: none (no key loaded)")?,
        }
        write!(f, "  capabilities: {}", self.capabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // 65-byte uncompressed secp256k1 generator point, a valid public key.
    const PUBKEY: [u8; 65] = hex!(
        "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
    );

    fn sample_info_tlv(extra_sibling: bool) -> Vec<u8> {
        let mut inner = Vec::new();
        // Instance UID
        inner.extend_from_slice(&[0x8F, 0x10]);
        inner.extend_from_slice(&[0x11; 16]);
        // Public key
        inner.extend_from_slice(&[0x80, 0x41]);
        inner.extend_from_slice(&PUBKEY);
        if extra_sibling {
            // Unknown tag the parser must skip
            inner.extend_from_slice(&[0x5A, 0x02, 0xDE, 0xAD]);
        }
        // Version 3.1
        inner.extend_from_slice(&[0x02, 0x02, 0x03, 0x01]);
        // Remaining slots
        inner.extend_from_slice(&[0x02, 0x01, 0x04]);
        // Key UID (empty: no key loaded)
        inner.extend_from_slice(&[0x8E, 0x00]);
        // Capabilities
        inner.extend_from_slice(&[0x8D, 0x01, 0x0F]);

        let mut out = vec![0xA4, inner.len() as u8];
        out.extend_from_slice(&inner);
        out
    }

    #[test]
    fn parses_initialized_card() {
        let parsed = SelectedApplication::parse(&sample_info_tlv(false)).unwrap();
        assert!(parsed.is_initialized());

        let info = parsed.application_info().unwrap();
        assert_eq!(info.instance_uid, [0x11; 16]);
        assert!(info.public_key.is_some());
        assert_eq!(info.version.major, 3);
        assert_eq!(info.version.minor, 1);
        assert_eq!(info.remaining_slots, 4);
        assert!(info.key_uid.is_none());
        assert!(!info.has_key());
    }

    #[test]
    fn unknown_siblings_are_skipped() {
        // Identical result with or without an unknown sibling in the middle.
        let plain = SelectedApplication::parse(&sample_info_tlv(false)).unwrap();
        let noisy = SelectedApplication::parse(&sample_info_tlv(true)).unwrap();

        let a = plain.application_info().unwrap();
        let b = noisy.application_info().unwrap();
        assert_eq!(a.instance_uid, b.instance_uid);
        assert_eq!(a.version, b.version);
        assert_eq!(a.remaining_slots, b.remaining_slots);
        assert_eq!(a.key_uid, b.key_uid);
    }

    #[test]
    fn parses_pre_initialized_card() {
        let mut payload = vec![0x80, 0x41];
        payload.extend_from_slice(&PUBKEY);

        let parsed = SelectedApplication::parse(&payload).unwrap();
        assert!(!parsed.is_initialized());
        assert!(parsed.public_key().is_some());
        assert!(parsed.application_info().is_none());
    }

    #[test]
    fn rejects_unexpected_top_level_tag() {
        assert!(SelectedApplication::parse(&[0xA3, 0x02, 0x02, 0x00]).is_err());
    }

    #[test]
    fn rejects_bad_key_uid_length() {
        let mut inner = Vec::new();
        inner.extend_from_slice(&[0x8F, 0x10]);
        inner.extend_from_slice(&[0x11; 16]);
        inner.extend_from_slice(&[0x80, 0x41]);
        inner.extend_from_slice(&PUBKEY);
        inner.extend_from_slice(&[0x02, 0x02, 0x03, 0x01]);
        inner.extend_from_slice(&[0x02, 0x01, 0x04]);
        // 3-byte key UID is invalid
        inner.extend_from_slice(&[0x8E, 0x03, 0x01, 0x02, 0x03]);

        let mut payload = vec![0xA4, inner.len() as u8];
        payload.extend_from_slice(&inner);

        match SelectedApplication::parse(&payload) {
            Err(Error::MalformedPayload { tag, .. }) => assert_eq!(tag, tags::KEY_UID),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
