//! APDU command encoding
//!
//! Short-form ISO/IEC 7816-4 command APDUs only: one-byte Lc and Le.
//! Extended-length encoding is not used by the protocols built on this crate.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// An ISO 7816-4 command APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Class byte (CLA)
    pub cla: u8,
    /// Instruction byte (INS)
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data field (optional)
    pub data: Option<Bytes>,
    /// Expected response length; 0 means "up to 256 bytes"
    pub le: Option<u8>,
}

impl Command {
    /// Create a command with only the four header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a command with a data field
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: None,
        }
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected response length
    pub const fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Length of the serialized command in bytes
    pub fn encoded_len(&self) -> usize {
        4 + self.data.as_ref().map_or(0, |d| 1 + d.len()) + usize::from(self.le.is_some())
    }

    /// Serialize to raw APDU bytes: `CLA INS P1 P2 [Lc data] [Le]`
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);

        if let Some(data) = &self.data {
            debug_assert!(data.len() <= 255, "short-form Lc overflow");
            buf.put_u8(data.len() as u8);
            buf.put_slice(data);
        }

        if let Some(le) = self.le {
            buf.put_u8(le);
        }

        buf.freeze()
    }

    /// Parse a command from raw APDU bytes
    ///
    /// A single trailing byte after the header is interpreted as Le; a
    /// trailing byte after `Lc` bytes of data likewise.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() < 4 {
            return Err(Error::InvalidCommandLength(raw.len()));
        }

        let mut command = Self::new(raw[0], raw[1], raw[2], raw[3]);
        let body = &raw[4..];

        match body.len() {
            0 => {}
            1 => command.le = Some(body[0]),
            n => {
                let lc = body[0] as usize;
                if n < 1 + lc {
                    return Err(Error::InvalidCommandLength(raw.len()));
                }
                if lc > 0 {
                    command.data = Some(Bytes::copy_from_slice(&body[1..1 + lc]));
                }
                match n - (1 + lc) {
                    0 => {}
                    1 => command.le = Some(body[1 + lc]),
                    _ => return Err(Error::InvalidCommandLength(raw.len())),
                }
            }
        }

        Ok(command)
    }

    /// Command data field, if any
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn serialize_select() {
        let cmd = Command::new_with_data(
            0x00,
            0xA4,
            0x04,
            0x00,
            hex!("A00000080400010101").to_vec(),
        )
        .with_le(0);

        assert_eq!(
            cmd.to_bytes().as_ref(),
            hex!("00A4040009A0000008040001010100")
        );
    }

    #[test]
    fn serialize_header_only() {
        let cmd = Command::new(0x80, 0xF2, 0x00, 0x00);
        assert_eq!(cmd.to_bytes().as_ref(), &[0x80, 0xF2, 0x00, 0x00]);
        assert_eq!(cmd.encoded_len(), 4);
    }

    #[test]
    fn parse_round_trip() {
        // Every shape a short-form APDU can take.
        let cases = vec![
            Command::new(0x00, 0xA4, 0x04, 0x00),
            Command::new(0x00, 0xB0, 0x00, 0x00).with_le(0xFF),
            Command::new(0x00, 0xB0, 0x00, 0x00).with_le(0x00),
            Command::new_with_data(0x80, 0x20, 0x00, 0x00, vec![0x31; 6]),
            Command::new_with_data(0x80, 0xC8, 0x00, 0x01, vec![0xAB; 32]).with_le(0),
        ];

        for cmd in cases {
            let parsed = Command::from_bytes(&cmd.to_bytes()).unwrap();
            assert_eq!(parsed, cmd);
        }
    }

    #[test]
    fn parse_rejects_truncated() {
        assert!(Command::from_bytes(&[0x00, 0xA4, 0x04]).is_err());
        // Lc says 5 bytes but only 2 follow
        assert!(Command::from_bytes(&hex!("00A4040005AABB")).is_err());
        // Two bytes after data: neither Le-less nor single Le
        assert!(Command::from_bytes(&hex!("00A4040001AA0102")).is_err());
    }
}
