use k256::{PublicKey, SecretKey};

use crate::commands::export_key::ExportOption;
use crate::error::{Error, Result};

use super::Keypair;

/// Key material returned by EXPORT KEY, shaped by the requested option
#[derive(Debug, Clone)]
pub enum ExportedKey {
    /// Private key, with the public key when the card included it
    Complete {
        /// The exported private key
        private_key: SecretKey,
        /// The matching public key, if the card sent it
        public_key: Option<PublicKey>,
    },
    /// Public key only
    PublicOnly(PublicKey),
    /// Public key plus BIP32 chain code
    Extended {
        /// The exported public key
        public_key: PublicKey,
        /// The chain code
        chain_code: [u8; 32],
    },
}

impl ExportedKey {
    /// Shape a parsed keypair template according to the requested export
    /// option, rejecting responses that lack the promised material
    pub(crate) fn from_keypair(keypair: Keypair, requested: ExportOption) -> Result<Self> {
        let missing = |reason| Error::MalformedPayload {
            tag: crate::constants::tags::TEMPLATE_KEYPAIR,
            reason,
        };

        match requested {
            ExportOption::PrivateAndPublic => Ok(Self::Complete {
                private_key: keypair.private_key.ok_or(missing("expected private key"))?,
                public_key: keypair.public_key,
            }),
            ExportOption::PublicKeyOnly => Ok(Self::PublicOnly(
                keypair.public_key.ok_or(missing("expected public key"))?,
            )),
            ExportOption::ExtendedPublicKey => Ok(Self::Extended {
                public_key: keypair.public_key.ok_or(missing("expected public key"))?,
                chain_code: keypair.chain_code.ok_or(missing("expected chain code"))?,
            }),
        }
    }

    /// The public key, when available
    pub fn public_key(&self) -> Option<&PublicKey> {
        match self {
            Self::Complete { public_key, .. } => public_key.as_ref(),
            Self::PublicOnly(public_key) => Some(public_key),
            Self::Extended { public_key, .. } => Some(public_key),
        }
    }

    /// The private key, when available
    pub fn private_key(&self) -> Option<&SecretKey> {
        match self {
            Self::Complete { private_key, .. } => Some(private_key),
            _ => None,
        }
    }

    /// The chain code, when available
    pub fn chain_code(&self) -> Option<&[u8; 32]> {
        match self {
            Self::Extended { chain_code, .. } => Some(chain_code),
            _ => None,
        }
    }
}
