use iso7816_tlv::ber::Tlv;
use k256::{PublicKey, SecretKey};
use zeroize::Zeroizing;

use crate::constants::tags;
use crate::error::{Error, Result};

use super::{constructed_children, find_child, has_tag, parse_public_key, primitive_value};

/// Key material decoded from the EXPORT KEY keypair template
///
/// Which fields are present depends on the export option; the card may also
/// omit the public key for private exports, leaving it derivable.
#[derive(Clone)]
pub struct Keypair {
    /// Private key, present only for private exports
    pub private_key: Option<SecretKey>,
    /// Public key
    pub public_key: Option<PublicKey>,
    /// BIP32 chain code, present only for extended exports
    pub chain_code: Option<[u8; 32]>,
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("private_key", &self.private_key.as_ref().map(|_| ".."))
            .field("public_key", &self.public_key)
            .field("chain_code", &self.chain_code.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Keypair {
    /// Parse the keypair template from a response payload
    pub(crate) fn parse(payload: &[u8]) -> Result<Self> {
        let (tlv, _) = Tlv::parse(payload);
        let tlv = tlv?;

        if !has_tag(&tlv, tags::TEMPLATE_KEYPAIR) {
            return Err(Error::MalformedPayload {
                tag: tags::TEMPLATE_KEYPAIR,
                reason: "not a keypair template",
            });
        }

        let children = constructed_children(&tlv, tags::TEMPLATE_KEYPAIR)?;

        let public_key = match find_child(children, tags::ECC_PUBLIC_KEY) {
            Some(child) => {
                parse_public_key(&primitive_value(child, tags::ECC_PUBLIC_KEY)?, tags::ECC_PUBLIC_KEY)?
            }
            None => None,
        };

        let private_key = match find_child(children, tags::ECC_PRIVATE_KEY) {
            Some(child) => {
                let raw = Zeroizing::new(primitive_value(child, tags::ECC_PRIVATE_KEY)?);
                Some(SecretKey::from_slice(&raw).map_err(|_| Error::MalformedPayload {
                    tag: tags::ECC_PRIVATE_KEY,
                    reason: "invalid private key scalar",
                })?)
            }
            None => None,
        };

        let chain_code = match find_child(children, tags::CHAIN_CODE) {
            Some(child) => Some(
                primitive_value(child, tags::CHAIN_CODE)?
                    .try_into()
                    .map_err(|_| Error::MalformedPayload {
                        tag: tags::CHAIN_CODE,
                        reason: "chain code must be 32 bytes",
                    })?,
            ),
            None => None,
        };

        Ok(Self {
            private_key,
            public_key,
            chain_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::elliptic_curve::sec1::ToEncodedPoint;

    #[test]
    fn parses_public_only_template() {
        let secret = SecretKey::random(&mut rand::thread_rng());
        let pubkey = secret.public_key().to_encoded_point(false);

        let mut inner = vec![0x80, 0x41];
        inner.extend_from_slice(pubkey.as_bytes());
        let mut payload = vec![0xA1, inner.len() as u8];
        payload.extend_from_slice(&inner);

        let keypair = Keypair::parse(&payload).unwrap();
        assert!(keypair.private_key.is_none());
        assert_eq!(keypair.public_key, Some(secret.public_key()));
        assert!(keypair.chain_code.is_none());
    }

    #[test]
    fn parses_extended_template() {
        let secret = SecretKey::random(&mut rand::thread_rng());
        let pubkey = secret.public_key().to_encoded_point(false);

        let mut inner = vec![0x80, 0x41];
        inner.extend_from_slice(pubkey.as_bytes());
        inner.extend_from_slice(&[0x82, 0x20]);
        inner.extend_from_slice(&[0x55; 32]);

        let mut payload = vec![0xA1, inner.len() as u8];
        payload.extend_from_slice(&inner);

        let keypair = Keypair::parse(&payload).unwrap();
        assert_eq!(keypair.chain_code, Some([0x55; 32]));
    }

    #[test]
    fn parses_private_template() {
        let secret = SecretKey::random(&mut rand::thread_rng());

        let mut inner = vec![0x81, 0x20];
        inner.extend_from_slice(&secret.to_bytes());
        let mut payload = vec![0xA1, inner.len() as u8];
        payload.extend_from_slice(&inner);

        let keypair = Keypair::parse(&payload).unwrap();
        let private = keypair.private_key.unwrap();
        assert_eq!(private.to_bytes(), secret.to_bytes());
        assert!(keypair.public_key.is_none());
    }
}
