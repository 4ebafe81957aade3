use cipher::Key;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::KeycardScp;
use crate::error::{Error, Result};

/// Number of pairing slots on the card
pub const PAIRING_SLOTS: u8 = 5;

/// A client's pairing with a card: the 32-byte pairing key and the slot it
/// occupies
///
/// The key is derived client-side during PAIR and must be stored by the
/// caller to reconnect after a power cycle; the library never persists it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PairingInfo {
    /// Shared 32-byte pairing key
    pub key: Key<KeycardScp>,
    /// Pairing slot index on the card
    #[zeroize(skip)]
    pub index: u8,
}

impl PairingInfo {
    /// Build pairing info from raw key bytes, enforcing the validity
    /// predicate (32-byte key, index within the card's slots)
    pub fn new(key: &[u8], index: u8) -> Result<Self> {
        if key.len() != 32 || index >= PAIRING_SLOTS {
            return Err(Error::InvalidPairing);
        }
        Ok(Self {
            key: Key::<KeycardScp>::clone_from_slice(key),
            index,
        })
    }

    /// Whether this pairing satisfies the validity predicate
    pub fn is_valid(&self) -> bool {
        self.index < PAIRING_SLOTS
    }
}

impl std::fmt::Debug for PairingInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The key is secret material; show the slot only.
        f.debug_struct("PairingInfo")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
