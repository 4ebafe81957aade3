//! Single-command exchange with GET RESPONSE reassembly
//!
//! Drives one command APDU to completion against a transport. When the card
//! answers `61 XX` ("more data available"), a `GET RESPONSE` command
//! (`00 C0 00 00 XX`) is issued repeatedly and the payloads are
//! concatenated, so callers always see one contiguous response.

use bytes::BytesMut;
use tracing::trace;

use crate::command::Command;
use crate::error::Result;
use crate::response::Response;
use crate::transport::CardTransport;

const CLA_ISO7816: u8 = 0x00;
const INS_GET_RESPONSE: u8 = 0xC0;

/// Transmit a command, reassembling chained `61 XX` responses
pub fn transmit<T: CardTransport + ?Sized>(transport: &mut T, command: &Command) -> Result<Response> {
    let raw = transport.transmit_raw(&command.to_bytes())?;
    let mut response = Response::from_bytes(&raw)?;

    if !response.status().is_more_data_available() {
        return Ok(response);
    }

    let mut payload = BytesMut::from(response.payload());
    while let Some(remaining) = response.status().remaining_bytes() {
        trace!(remaining, "issuing GET RESPONSE for chained data");
        let get_response =
            Command::new(CLA_ISO7816, INS_GET_RESPONSE, 0x00, 0x00).with_le(remaining);
        let raw = transport.transmit_raw(&get_response.to_bytes())?;
        response = Response::from_bytes(&raw)?;
        payload.extend_from_slice(response.payload());
    }

    Ok(Response::new(payload.freeze(), response.status()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use bytes::Bytes;

    #[test]
    fn plain_response_passes_through() {
        let mut mock = MockTransport::with_response(Bytes::from_static(&[0xAA, 0x90, 0x00]));
        let resp = transmit(&mut mock, &Command::new(0x00, 0xA4, 0x04, 0x00)).unwrap();
        assert_eq!(resp.payload(), &[0xAA]);
        assert!(resp.is_success());
    }

    #[test]
    fn chained_response_is_reassembled() {
        // First frame carries 4 bytes then announces 0x20 more; the chain
        // continues once and terminates with 90 00.
        let mut first = vec![0x01, 0x02, 0x03, 0x04];
        first.extend_from_slice(&[0x61, 0x20]);

        let mut second = vec![0xEE; 0x20];
        second.extend_from_slice(&[0x90, 0x00]);

        let mut mock = MockTransport::new(vec![Bytes::from(first), Bytes::from(second)]);
        let resp = transmit(&mut mock, &Command::new(0x80, 0xCA, 0x00, 0x00).with_le(0)).unwrap();

        assert!(resp.is_success());
        assert_eq!(resp.payload().len(), 4 + 0x20);
        assert_eq!(&resp.payload()[..4], &[0x01, 0x02, 0x03, 0x04]);

        // The follow-up command must be GET RESPONSE with Le = announced length.
        assert_eq!(mock.commands[1].as_ref(), &[0x00, 0xC0, 0x00, 0x00, 0x20]);
    }

    #[test]
    fn multi_link_chain() {
        let frames = vec![
            Bytes::from(vec![0x11, 0x61, 0x02]),
            Bytes::from(vec![0x22, 0x22, 0x61, 0x01]),
            Bytes::from(vec![0x33, 0x90, 0x00]),
        ];
        let mut mock = MockTransport::new(frames);
        let resp = transmit(&mut mock, &Command::new(0x80, 0xCA, 0x00, 0x00)).unwrap();
        assert_eq!(resp.payload(), &[0x11, 0x22, 0x22, 0x33]);
    }

    #[test]
    fn error_status_is_not_chained() {
        let mut mock = MockTransport::with_response(Bytes::from_static(&[0x69, 0x85]));
        let resp = transmit(&mut mock, &Command::new(0x80, 0xF2, 0x00, 0x00)).unwrap();
        assert_eq!(resp.status().to_u16(), 0x6985);
        assert_eq!(mock.commands.len(), 1);
    }
}
