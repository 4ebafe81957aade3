use std::fmt;

use iso7816_tlv::ber::Tlv;

use crate::constants::tags;
use crate::error::{Error, Result};

use super::{constructed_children, find_primitive, has_tag, primitive_value};

/// Application status returned by GET STATUS (P1 = 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationStatus {
    /// PIN attempts remaining (0 means blocked)
    pub pin_retry_count: u8,
    /// PUK attempts remaining (0 means the card is blocked)
    pub puk_retry_count: u8,
    /// Whether a master key is loaded
    pub key_initialized: bool,
}

impl ApplicationStatus {
    /// Parse the application status template from a response payload
    pub(crate) fn parse(payload: &[u8]) -> Result<Self> {
        let (tlv, _) = Tlv::parse(payload);
        let tlv = tlv?;

        if !has_tag(&tlv, tags::TEMPLATE_APPLICATION_STATUS) {
            return Err(Error::MalformedPayload {
                tag: tags::TEMPLATE_APPLICATION_STATUS,
                reason: "not an application status template",
            });
        }

        let children = constructed_children(&tlv, tags::TEMPLATE_APPLICATION_STATUS)?;

        // PIN and PUK retry counters are INT siblings in order; unknown tags
        // in between are skipped.
        let mut counters = children
            .iter()
            .filter(|child| has_tag(child, tags::INT))
            .map(|child| primitive_value(child, tags::INT));

        let mut next_counter = |reason| -> Result<u8> {
            let raw = counters.next().ok_or(Error::MalformedPayload {
                tag: tags::INT,
                reason,
            })??;
            raw.first().copied().ok_or(Error::MalformedPayload {
                tag: tags::INT,
                reason,
            })
        };

        let pin_retry_count = next_counter("missing PIN retry counter")?;
        let puk_retry_count = next_counter("missing PUK retry counter")?;

        let key_initialized =
            find_primitive(children, tags::KEY_INITIALIZED)?.first().copied() == Some(0xFF);

        Ok(Self {
            pin_retry_count,
            puk_retry_count,
            key_initialized,
        })
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PIN retries: {}, PUK retries: {}, key initialized: {}",
            self.pin_retry_count, self.puk_retry_count, self.key_initialized
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_tlv(pin: u8, puk: u8, key: u8) -> Vec<u8> {
        vec![
            0xA3, 0x09, // template
            0x02, 0x01, pin, // PIN retry counter
            0x02, 0x01, puk, // PUK retry counter
            0x01, 0x01, key, // key initialized flag
        ]
    }

    #[test]
    fn parses_status() {
        let status = ApplicationStatus::parse(&status_tlv(3, 5, 0xFF)).unwrap();
        assert_eq!(status.pin_retry_count, 3);
        assert_eq!(status.puk_retry_count, 5);
        assert!(status.key_initialized);

        let status = ApplicationStatus::parse(&status_tlv(0, 5, 0x00)).unwrap();
        assert_eq!(status.pin_retry_count, 0);
        assert!(!status.key_initialized);
    }

    #[test]
    fn tolerates_unknown_siblings() {
        let mut inner = vec![
            0x02, 0x01, 0x03, //
            0x5B, 0x01, 0x77, // unknown sibling
            0x02, 0x01, 0x05, //
            0x01, 0x01, 0xFF,
        ];
        let mut payload = vec![0xA3, inner.len() as u8];
        payload.append(&mut inner);

        let status = ApplicationStatus::parse(&payload).unwrap();
        assert_eq!(status.pin_retry_count, 3);
        assert_eq!(status.puk_retry_count, 5);
        assert!(status.key_initialized);
    }

    #[test]
    fn rejects_wrong_template() {
        assert!(ApplicationStatus::parse(&[0xA4, 0x00]).is_err());
    }
}
