//! APDU response decoding

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{Error, Result};
use crate::status::StatusWord;

/// An ISO 7816-4 response APDU: payload followed by SW1-SW2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Bytes,
    status: StatusWord,
}

impl Response {
    /// Create a response from payload and status
    pub fn new(payload: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            payload: payload.into(),
            status: status.into(),
        }
    }

    /// Create a success response (SW = 90 00)
    pub fn success(payload: impl Into<Bytes>) -> Self {
        Self::new(payload, StatusWord::new(0x90, 0x00))
    }

    /// Parse a response from raw bytes; the last two bytes are the status word
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() < 2 {
            return Err(Error::TruncatedResponse(raw.len()));
        }

        let (payload, sw) = raw.split_at(raw.len() - 2);
        let status = StatusWord::new(sw[0], sw[1]);

        trace!(sw = %status, payload_len = payload.len(), "parsed APDU response");

        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status,
        })
    }

    /// Response payload, without the status word
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Whether the status word indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Consume the response, yielding the payload on success and the status
    /// word otherwise
    pub fn into_payload(self) -> std::result::Result<Bytes, StatusWord> {
        if self.is_success() {
            Ok(self.payload)
        } else {
            Err(self.status)
        }
    }

    /// Serialize back to raw bytes (payload followed by SW1-SW2)
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.payload.len() + 2);
        buf.put_slice(&self.payload);
        buf.put_u8(self.status.sw1);
        buf.put_u8(self.status.sw2);
        buf.freeze()
    }
}

impl TryFrom<&[u8]> for Response {
    type Error = Error;

    fn try_from(raw: &[u8]) -> Result<Self> {
        Self::from_bytes(raw)
    }
}
