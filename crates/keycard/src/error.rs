//! Error taxonomy for Keycard operations
//!
//! One central enum covers everything a caller can observe: transport
//! failures, protocol-level surprises, authentication state, cryptographic
//! failures, local input validation, and command-set state preconditions.
//! Status words that have a precise meaning for this applet are mapped to
//! dedicated variants by [`Error::from_status`]; everything else surfaces as
//! [`Error::UnexpectedStatus`] with the raw 16-bit code.

use iso7816_tlv::TlvError;
use tessera_apdu::{StatusWord, TransportError};
use thiserror::Error;

/// Result type for Keycard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Keycard operations
#[derive(Debug, Error)]
pub enum Error {
    //
    // Transport
    //
    /// Failure in the underlying transport
    #[error(transparent)]
    Transport(#[from] TransportError),

    //
    // Protocol
    //
    /// APDU codec failure (malformed command or truncated response)
    #[error(transparent)]
    Apdu(tessera_apdu::Error),

    /// The card returned a status word with no specific mapping
    #[error("unexpected status word {:04X}", .0.to_u16())]
    UnexpectedStatus(StatusWord),

    /// TLV structure could not be decoded
    #[error("TLV error: {0:?}")]
    Tlv(TlvError),

    /// A TLV payload decoded but did not have the expected shape
    #[error("malformed payload: {reason} (tag {tag:#04X})")]
    MalformedPayload {
        /// The tag that was being parsed when the failure occurred
        tag: u8,
        /// What went wrong
        reason: &'static str,
    },

    /// Response payload had an unexpected length
    #[error("invalid response length: expected {expected}, got {actual}")]
    InvalidResponseLength {
        /// Expected payload length
        expected: usize,
        /// Actual payload length
        actual: usize,
    },

    //
    // Authentication
    //
    /// PIN rejected; carries the attempts left before the PIN blocks
    #[error("wrong PIN, {remaining} attempts remaining")]
    WrongPin {
        /// Attempts remaining
        remaining: u8,
    },

    /// PUK rejected; carries the attempts left before the card blocks
    #[error("wrong PUK, {remaining} attempts remaining")]
    WrongPuk {
        /// Attempts remaining
        remaining: u8,
    },

    /// PIN retry counter exhausted; UNBLOCK PIN is required
    #[error("PIN is blocked")]
    PinBlocked,

    /// PUK retry counter exhausted; the card cannot be recovered
    #[error("card is blocked")]
    CardBlocked,

    /// MUTUALLY AUTHENTICATE failed
    #[error("mutual authentication failed")]
    MutualAuthenticationFailed,

    /// Operation requires PIN verification (SW 69 82)
    #[error("security status not satisfied")]
    SecurityStatusNotSatisfied,

    /// Card state does not allow the operation (SW 69 85)
    #[error("conditions of use not satisfied")]
    ConditionsNotSatisfied,

    //
    // Crypto
    //
    /// MAC of an encrypted response did not verify; the channel is closed
    #[error("response MAC mismatch, secure channel desynchronized")]
    MacMismatch,

    /// Card answered with a cryptogram that does not match the pairing
    /// password
    #[error("card cryptogram mismatch (wrong pairing password?)")]
    CryptogramMismatch,

    /// The card's public key could not be parsed
    #[error("invalid card public key")]
    InvalidCardPublicKey,

    /// Elliptic curve failure (key parsing, ECDH)
    #[error(transparent)]
    EllipticCurve(#[from] k256::elliptic_curve::Error),

    /// ECDSA failure (signature scalars, recovery)
    #[error(transparent)]
    Ecdsa(#[from] k256::ecdsa::Error),

    /// Decrypted plaintext had no valid ISO 7816 padding
    #[error("invalid padding in decrypted data")]
    InvalidPadding,

    //
    // Validation
    //
    /// PIN must be exactly 6 decimal digits
    #[error("invalid PIN: must be 6 decimal digits")]
    InvalidPin,

    /// PUK must be exactly 12 decimal digits
    #[error("invalid PUK: must be 12 decimal digits")]
    InvalidPuk,

    /// Pairing password must be at least 5 characters
    #[error("invalid pairing password: must be at least 5 characters")]
    InvalidPairingPassword,

    /// SIGN requires a 32-byte hash
    #[error("data to sign must be exactly 32 bytes")]
    InvalidHashLength,

    /// LOAD KEY (seed) requires a 64-byte BIP39 seed
    #[error("seed must be exactly 64 bytes")]
    InvalidSeedLength,

    /// GENERATE MNEMONIC checksum size must be between 4 and 8
    #[error("mnemonic checksum size must be between 4 and 8")]
    InvalidChecksumSize,

    /// SET PINLESS PATH requires an absolute (`m/...`) path
    #[error("path must be absolute (start with m/)")]
    PathNotAbsolute,

    /// A BIP32 path string could not be parsed
    #[error("invalid derivation path component: {0}")]
    InvalidPath(String),

    //
    // State
    //
    /// Operation needs an open secure channel
    #[error("secure channel not open")]
    SecureChannelNotOpen,

    /// SELECT has not seeded the ECDH handshake yet
    #[error("no ECDH handshake state; SELECT the applet first")]
    HandshakeNotSeeded,

    /// Operation needs a verified PIN
    #[error("PIN verification required")]
    PinVerificationRequired,

    /// Key operation attempted with no key loaded on the card
    #[error("no key loaded on the card")]
    NoKeyLoaded,

    /// Pairing information is required but not available
    #[error("pairing information required")]
    PairingRequired,

    /// Provided pairing info failed its validity predicate
    #[error("invalid pairing information")]
    InvalidPairing,

    /// All pairing slots on the card are taken (SW 6A 84)
    #[error("no available pairing slots")]
    PairingSlotsFull,

    /// INIT sent to an already initialized card
    #[error("card is already initialized")]
    AlreadyInitialized,

    /// Command needs an initialized card
    #[error("card is not initialized")]
    NotInitialized,
}

impl Error {
    /// Map a non-success status word to the closest typed error
    ///
    /// `63 CX` becomes [`Error::WrongPin`] (the UNBLOCK PIN path rewrites it
    /// to [`Error::WrongPuk`]); a counter of zero means blocked.
    pub fn from_status(sw: StatusWord) -> Self {
        if let Some(remaining) = sw.counter() {
            if remaining == 0 {
                return Self::PinBlocked;
            }
            return Self::WrongPin { remaining };
        }

        match sw.to_u16() {
            0x6982 => Self::SecurityStatusNotSatisfied,
            0x6985 => Self::ConditionsNotSatisfied,
            0x6A84 => Self::PairingSlotsFull,
            0x6F05 => Self::MacMismatch,
            _ => Self::UnexpectedStatus(sw),
        }
    }

    /// Whether this error invalidates the secure channel
    ///
    /// MAC mismatches, crypto failures in the message pipeline, and
    /// transport loss leave the IV chain in an unknown state; wrong-PIN and
    /// precondition errors do not.
    pub fn desynchronizes_channel(&self) -> bool {
        matches!(
            self,
            Self::MacMismatch | Self::InvalidPadding | Self::Transport(_)
        )
    }
}

impl From<tessera_apdu::Error> for Error {
    fn from(error: tessera_apdu::Error) -> Self {
        match error {
            tessera_apdu::Error::Transport(e) => Self::Transport(e),
            other => Self::Apdu(other),
        }
    }
}

impl From<TlvError> for Error {
    fn from(error: TlvError) -> Self {
        Self::Tlv(error)
    }
}
