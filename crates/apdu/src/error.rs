//! Codec-level error types

use thiserror::Error;

use crate::transport::TransportError;

/// Result alias for APDU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while encoding, decoding, or exchanging APDUs
#[derive(Debug, Error)]
pub enum Error {
    /// Raw command bytes do not form a valid short-form APDU
    #[error("invalid command length: {0} bytes")]
    InvalidCommandLength(usize),

    /// Response shorter than a status word
    #[error("truncated response: {0} bytes")]
    TruncatedResponse(usize),

    /// Underlying transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),
}
