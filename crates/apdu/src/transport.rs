//! Transport contract for APDU communication
//!
//! A transport is responsible for shipping raw APDU bytes to a card and
//! returning the raw response. It has no knowledge of command structure,
//! secure channels, or protocol details; reassembly of chained responses
//! happens above it (see [`crate::exchange`]).

use std::fmt;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors a transport can report
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The card or reader is gone
    #[error("transport disconnected")]
    Disconnected,

    /// The exchange did not complete within the transport's deadline
    #[error("transport timeout")]
    Timeout,

    /// Any other device-level failure
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Contract for card transports (PC/SC, NFC/IsoDep, in-memory mocks, ...)
pub trait CardTransport: Send + fmt::Debug {
    /// Send raw APDU bytes and return the raw response bytes
    ///
    /// One call corresponds to one physical exchange; `61 XX` chaining is the
    /// caller's job. The default implementation adds trace logging around
    /// [`Self::do_transmit_raw`].
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        trace!(command = %hex::encode(command), "transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => trace!(response = %hex::encode(response), "received raw response"),
            Err(e) => debug!(error = %e, "transport error during transmission"),
        }
        result
    }

    /// Transport-specific implementation of [`Self::transmit_raw`]
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Whether a card is currently reachable
    fn is_connected(&self) -> bool;

    /// Reset the transport connection
    fn reset(&mut self) -> Result<(), TransportError>;
}

impl CardTransport for Box<dyn CardTransport> {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        (**self).do_transmit_raw(command)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        (**self).reset()
    }
}

/// In-memory transport that plays back scripted responses
///
/// Used by this workspace's tests and available to downstream crates so a
/// protocol layer can be exercised without hardware.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    /// Responses to return, consumed front to back; the last one repeats
    pub responses: Vec<Bytes>,
    /// Commands that were sent, in order
    pub commands: Vec<Bytes>,
    /// Whether the transport reports as connected
    pub connected: bool,
}

impl MockTransport {
    /// Create a mock that plays the given responses in order
    pub fn new(responses: Vec<Bytes>) -> Self {
        Self {
            responses,
            commands: Vec::new(),
            connected: true,
        }
    }

    /// Create a mock that always returns the given response
    pub fn with_response(response: impl Into<Bytes>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Create a mock that always returns `90 00`
    pub fn with_success() -> Self {
        Self::with_response(Bytes::from_static(&[0x90, 0x00]))
    }
}

impl CardTransport for MockTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }

        self.commands.push(Bytes::copy_from_slice(command));

        match self.responses.len() {
            0 => Err(TransportError::Io("mock script exhausted".into())),
            1 => Ok(self.responses[0].clone()),
            _ => Ok(self.responses.remove(0)),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        self.commands.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_plays_script_in_order() {
        let mut mock = MockTransport::new(vec![
            Bytes::from_static(&[0x01, 0x90, 0x00]),
            Bytes::from_static(&[0x6A, 0x82]),
        ]);

        assert_eq!(mock.transmit_raw(&[0x00]).unwrap().as_ref(), &[0x01, 0x90, 0x00]);
        assert_eq!(mock.transmit_raw(&[0x01]).unwrap().as_ref(), &[0x6A, 0x82]);
        // Last response repeats
        assert_eq!(mock.transmit_raw(&[0x02]).unwrap().as_ref(), &[0x6A, 0x82]);
        assert_eq!(mock.commands.len(), 3);
    }

    #[test]
    fn mock_reports_disconnect() {
        let mut mock = MockTransport::with_success();
        mock.connected = false;
        assert!(matches!(
            mock.transmit_raw(&[0x00]),
            Err(TransportError::Disconnected)
        ));
    }
}
