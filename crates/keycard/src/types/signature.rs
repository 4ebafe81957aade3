use iso7816_tlv::ber::Tlv;
use k256::ecdsa::{self, RecoveryId, VerifyingKey};

use crate::constants::tags;
use crate::error::{Error, Result};

use super::{constructed_children, find_child, find_primitive, parse_public_key};

/// Parsed SIGN/IDENT response: the signing public key and the ECDSA
/// signature over the 32-byte input hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Public key the card signed with
    pub public_key: k256::PublicKey,
    /// The (r, s) signature, normalized as parsed
    pub signature: ecdsa::Signature,
}

impl Signature {
    /// Recover the recovery id by trial recovery against the known key
    pub fn recovery_id(&self, message_hash: &[u8; 32]) -> Result<RecoveryId> {
        let verifying_key = VerifyingKey::from(&self.public_key);
        RecoveryId::trial_recovery_from_prehash(&verifying_key, message_hash, &self.signature)
            .map_err(Error::from)
    }

    /// Parse the signature template from a response payload
    pub(crate) fn parse(payload: &[u8]) -> Result<Self> {
        let (tlv, _) = Tlv::parse(payload);
        let tlv = tlv?;

        if !super::has_tag(&tlv, tags::TEMPLATE_SIGNATURE) {
            return Err(Error::MalformedPayload {
                tag: tags::TEMPLATE_SIGNATURE,
                reason: "not a signature template",
            });
        }

        let children = constructed_children(&tlv, tags::TEMPLATE_SIGNATURE)?;

        let public_key = parse_public_key(
            &find_primitive(children, tags::ECC_PUBLIC_KEY)?,
            tags::ECC_PUBLIC_KEY,
        )?
        .ok_or(Error::MalformedPayload {
            tag: tags::ECC_PUBLIC_KEY,
            reason: "signature template carries no public key",
        })?;

        let der = find_child(children, tags::ECDSA_SIGNATURE).ok_or(Error::MalformedPayload {
            tag: tags::ECDSA_SIGNATURE,
            reason: "missing ECDSA signature",
        })?;

        let signature = EcdsaSignature::parse(der)?;

        Ok(Self {
            public_key,
            signature: signature.0,
        })
    }
}

/// Inner DER-ish signature node: a SEQUENCE of two INTEGERs (r, s)
#[derive(Debug, Clone, PartialEq, Eq)]
struct EcdsaSignature(ecdsa::Signature);

impl EcdsaSignature {
    fn parse(tlv: &Tlv) -> Result<Self> {
        let children = constructed_children(tlv, tags::ECDSA_SIGNATURE)?;

        let ints: Vec<Vec<u8>> = children
            .iter()
            .filter(|child| super::has_tag(child, tags::INT))
            .map(|child| super::primitive_value(child, tags::INT))
            .collect::<Result<_>>()?;

        let [r_raw, s_raw] = ints.as_slice() else {
            return Err(Error::MalformedPayload {
                tag: tags::ECDSA_SIGNATURE,
                reason: "expected r and s integers",
            });
        };

        Ok(Self(ecdsa::Signature::from_scalars(
            scalar_bytes(r_raw)?,
            scalar_bytes(s_raw)?,
        )?))
    }
}

/// Normalize a DER INTEGER to 32 bytes: strip a leading zero sign byte,
/// left-pad short values
fn scalar_bytes(raw: &[u8]) -> Result<[u8; 32]> {
    let raw = match raw {
        [0x00, rest @ ..] if rest.len() == 32 => rest,
        _ => raw,
    };
    if raw.len() > 32 {
        return Err(Error::MalformedPayload {
            tag: tags::INT,
            reason: "signature scalar too long",
        });
    }

    let mut out = [0u8; 32];
    out[32 - raw.len()..].copy_from_slice(raw);
    Ok(out)
}
