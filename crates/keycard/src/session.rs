//! Secure channel session state
//!
//! A [`Session`] holds the derived AES-256 session keys and the running IV.
//! The IV doubles as the MAC of the last message in either direction; both
//! endpoints advance it in lockstep, so any divergence makes the next
//! exchange fail authentication.

use cipher::{Iv, Key};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{ApduMeta, Challenge, KeycardScp, calculate_mac, derive_session_keys};

/// Derived session key pair
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct Keys {
    enc: Key<KeycardScp>,
    mac: Key<KeycardScp>,
}

impl Keys {
    pub(crate) fn enc(&self) -> &Key<KeycardScp> {
        &self.enc
    }

    pub(crate) fn mac(&self) -> &Key<KeycardScp> {
        &self.mac
    }
}

/// Transient secure channel session: keys plus the running IV
#[derive(Clone)]
pub(crate) struct Session {
    keys: Keys,
    iv: Iv<KeycardScp>,
}

impl Session {
    /// Derive a session from the ECDH secret, the pairing key, and the
    /// salt/IV returned by OPEN SECURE CHANNEL
    pub(crate) fn derive(
        shared_secret: &[u8],
        pairing_key: &Key<KeycardScp>,
        salt: &Challenge,
        iv: Iv<KeycardScp>,
    ) -> Self {
        let (enc, mac) = derive_session_keys(shared_secret, pairing_key, salt);
        Self {
            keys: Keys { enc, mac },
            iv,
        }
    }

    /// Build a session from raw key material (tests and vectors)
    #[cfg(test)]
    pub(crate) fn from_raw(
        enc: &Key<KeycardScp>,
        mac: &Key<KeycardScp>,
        iv: &Iv<KeycardScp>,
    ) -> Self {
        Self {
            keys: Keys {
                enc: *enc,
                mac: *mac,
            },
            iv: *iv,
        }
    }

    pub(crate) fn keys(&self) -> &Keys {
        &self.keys
    }

    pub(crate) fn iv(&self) -> &Iv<KeycardScp> {
        &self.iv
    }

    /// Advance the IV: the MAC over `meta` and `data` becomes the new IV
    pub(crate) fn update_iv(&mut self, meta: &ApduMeta, data: &[u8]) {
        self.iv = calculate_mac(meta, data, self.keys.mac());
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}
