//! Card initialization secrets
//!
//! The PIN, PUK, and pairing password handed to INIT. The struct derives the
//! 32-byte pairing token eagerly so the password itself never has to leave
//! the struct, and everything is wiped on drop: secrets must not outlive the
//! INIT call that consumes them.

use base64::prelude::*;
use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{PairingToken, generate_pairing_token};
use crate::error::{Error, Result};

pub(crate) const PIN_LENGTH: usize = 6;
pub(crate) const PUK_LENGTH: usize = 12;
const MIN_PAIRING_PASSWORD_LENGTH: usize = 5;

/// Secrets used to initialize a card
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secrets {
    pin: String,
    puk: String,
    pairing_pass: String,
    pairing_token: PairingToken,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print credential material.
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

impl Secrets {
    /// Create secrets from a PIN, PUK, and pairing password
    pub fn new(pin: &str, puk: &str, pairing_pass: &str) -> Result<Self> {
        validate_pin(pin)?;
        validate_puk(puk)?;
        validate_pairing_password(pairing_pass)?;

        Ok(Self {
            pin: pin.to_string(),
            puk: puk.to_string(),
            pairing_pass: pairing_pass.to_string(),
            pairing_token: generate_pairing_token(pairing_pass),
        })
    }

    /// Generate random secrets: 6-digit PIN, 12-digit PUK, and a base64url
    /// pairing password
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let pin = format!("{:06}", rng.gen_range(0..1_000_000u32));
        let puk = format!("{:012}", rng.gen_range(0..1_000_000_000_000u64));

        let mut raw = [0u8; 12];
        rng.fill(&mut raw);
        let pairing_pass = BASE64_URL_SAFE_NO_PAD.encode(raw);

        Self {
            pairing_token: generate_pairing_token(&pairing_pass),
            pin,
            puk,
            pairing_pass,
        }
    }

    /// The PIN
    pub fn pin(&self) -> &str {
        &self.pin
    }

    /// The PUK
    pub fn puk(&self) -> &str {
        &self.puk
    }

    /// The pairing password
    pub fn pairing_pass(&self) -> &str {
        &self.pairing_pass
    }

    /// The derived pairing token
    pub fn pairing_token(&self) -> &PairingToken {
        &self.pairing_token
    }

    /// Serialize the INIT plaintext: `PIN || PUK || pairing token`
    pub(crate) fn to_init_payload(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(PIN_LENGTH + PUK_LENGTH + self.pairing_token.len());
        buf.put_slice(self.pin.as_bytes());
        buf.put_slice(self.puk.as_bytes());
        buf.put_slice(&self.pairing_token);
        buf.freeze()
    }
}

/// Check that a PIN is exactly 6 decimal digits
pub fn validate_pin(pin: &str) -> Result<()> {
    if pin.len() == PIN_LENGTH && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::InvalidPin)
    }
}

/// Check that a PUK is exactly 12 decimal digits
pub fn validate_puk(puk: &str) -> Result<()> {
    if puk.len() == PUK_LENGTH && puk.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::InvalidPuk)
    }
}

/// Check that a pairing password is at least 5 characters
pub fn validate_pairing_password(password: &str) -> Result<()> {
    if password.len() >= MIN_PAIRING_PASSWORD_LENGTH {
        Ok(())
    } else {
        Err(Error::InvalidPairingPassword)
    }
}
