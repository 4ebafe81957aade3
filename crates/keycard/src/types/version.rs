use derive_more::Display;

use crate::error::{Error, Result};

/// Applet version (major.minor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{}.{}", major, minor)]
pub struct Version {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

impl Version {
    pub(crate) fn from_bytes(bytes: &[u8], tag: u8) -> Result<Self> {
        if bytes.len() < 2 {
            return Err(Error::MalformedPayload {
                tag,
                reason: "version needs two bytes",
            });
        }
        Ok(Self {
            major: bytes[0],
            minor: bytes[1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays() {
        let version = Version::from_bytes(&[3, 1], 0x02).unwrap();
        assert_eq!(version, Version { major: 3, minor: 1 });
        assert_eq!(version.to_string(), "3.1");
    }

    #[test]
    fn rejects_short_value() {
        assert!(Version::from_bytes(&[3], 0x02).is_err());
    }
}
