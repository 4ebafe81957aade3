//! Typed views over the applet's TLV response payloads
//!
//! Parsers are tolerant: inside a known composite tag, unknown sibling tags
//! are skipped rather than rejected, so newer applets can add fields without
//! breaking older clients. Parse failures carry the offending tag.

mod application_info;
mod application_status;
mod capabilities;
mod exported_key;
mod keypair;
mod pairing_info;
mod signature;
mod version;

pub use application_info::{ApplicationInfo, SelectedApplication};
pub use application_status::ApplicationStatus;
pub use capabilities::{Capabilities, Capability};
pub use exported_key::ExportedKey;
pub use keypair::Keypair;
pub use pairing_info::PairingInfo;
pub use signature::Signature;
pub use version::Version;

use iso7816_tlv::ber::{Tag, Tlv, Value};

use crate::error::{Error, Result};

/// Whether a TLV node carries the given one-byte tag
pub(crate) fn has_tag(tlv: &Tlv, tag: u8) -> bool {
    Tag::try_from(tag).map(|t| tlv.tag() == &t).unwrap_or(false)
}

/// Extract the primitive value of a node, failing with the offending tag
pub(crate) fn primitive_value(tlv: &Tlv, tag: u8) -> Result<Vec<u8>> {
    match tlv.value() {
        Value::Primitive(bytes) => Ok(bytes.to_vec()),
        Value::Constructed(_) => Err(Error::MalformedPayload {
            tag,
            reason: "expected primitive value",
        }),
    }
}

/// Children of a constructed node, failing with the offending tag
pub(crate) fn constructed_children(tlv: &Tlv, tag: u8) -> Result<&[Tlv]> {
    match tlv.value() {
        Value::Constructed(children) => Ok(children),
        Value::Primitive(_) => Err(Error::MalformedPayload {
            tag,
            reason: "expected constructed value",
        }),
    }
}

/// Find the first child with the given tag, skipping unknown siblings
pub(crate) fn find_child<'a>(children: &'a [Tlv], tag: u8) -> Option<&'a Tlv> {
    children.iter().find(|child| has_tag(child, tag))
}

/// Find the first child with the given tag and return its primitive value
pub(crate) fn find_primitive(children: &[Tlv], tag: u8) -> Result<Vec<u8>> {
    let child = find_child(children, tag).ok_or(Error::MalformedPayload {
        tag,
        reason: "missing child tag",
    })?;
    primitive_value(child, tag)
}

/// Parse an optional 65-byte uncompressed public key from a child node
///
/// An empty value means "no key"; anything other than empty or 65 bytes is
/// rejected.
pub(crate) fn parse_public_key(value: &[u8], tag: u8) -> Result<Option<k256::PublicKey>> {
    match value.len() {
        0 => Ok(None),
        65 => k256::PublicKey::from_sec1_bytes(value)
            .map(Some)
            .map_err(|_| Error::MalformedPayload {
                tag,
                reason: "invalid SEC1 public key",
            }),
        _ => Err(Error::MalformedPayload {
            tag,
            reason: "invalid public key length",
        }),
    }
}
