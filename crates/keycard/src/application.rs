//! The Keycard command set
//!
//! [`Keycard`] drives the full card lifecycle over a transport: SELECT on a
//! fresh card, INIT, PAIR, secure channel establishment, PIN verification,
//! and the authenticated key/signing/storage operations. Preconditions are
//! enforced locally (channel open, PIN verified) before anything goes on
//! the wire, and the applet's status words come back as typed errors.
//!
//! A `Keycard` is a single serial actor: every operation takes `&mut self`,
//! so one session can never interleave two APDUs. Share one card between
//! threads by wrapping it in a `Mutex`.

use coins_bip32::path::DerivationPath;
use rand::RngCore;
use tessera_apdu::transport::CardTransport;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::commands::*;
use crate::constants::KEYCARD_AID;
use crate::crypto::{Challenge, calculate_cryptogram, generate_pairing_token};
use crate::error::{Error, Result};
use crate::path::{DeriveMode, KeyPath};
use crate::secrets::{Secrets, validate_pairing_password, validate_pin, validate_puk};
use crate::secure_channel::SecureChannel;
use crate::types::{
    ApplicationInfo, ApplicationStatus, ExportedKey, PairingInfo, SelectedApplication, Signature,
};

use sha2::{Digest, Sha256};

/// High-level Keycard client over a transport
pub struct Keycard<T: CardTransport> {
    channel: SecureChannel<T>,
    application_info: Option<ApplicationInfo>,
    pairing_info: Option<PairingInfo>,
    pin_verified: bool,
    remaining_pin_attempts: Option<u8>,
    last_error: String,
}

impl<T: CardTransport> Keycard<T> {
    /// Create a client over the given transport
    pub fn new(transport: T) -> Self {
        Self {
            channel: SecureChannel::new(transport),
            application_info: None,
            pairing_info: None,
            pin_verified: false,
            remaining_pin_attempts: None,
            last_error: String::new(),
        }
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        self.channel.transport()
    }

    /// Mutable access to the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        self.channel.transport_mut()
    }

    /// Application info cached by the last SELECT of an initialized card
    pub fn application_info(&self) -> Option<&ApplicationInfo> {
        self.application_info.as_ref()
    }

    /// The active pairing, from PAIR or supplied by the caller
    pub fn pairing_info(&self) -> Option<&PairingInfo> {
        self.pairing_info.as_ref()
    }

    /// Install a pairing obtained in an earlier run; the caller owns its
    /// persistence
    pub fn set_pairing_info(&mut self, pairing: PairingInfo) -> Result<()> {
        if !pairing.is_valid() {
            return Err(Error::InvalidPairing);
        }
        self.pairing_info = Some(pairing);
        Ok(())
    }

    /// Whether the secure channel is open
    pub fn is_secure_channel_open(&self) -> bool {
        self.channel.is_open()
    }

    /// Attempts left after the last failed VERIFY PIN, if any
    pub fn remaining_pin_attempts(&self) -> Option<u8> {
        self.remaining_pin_attempts
    }

    /// Human-readable description of the last failure, for logging; the
    /// typed error stays authoritative
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    /// Run an operation, recording its outcome in `last_error`
    fn tracked<R>(&mut self, op: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let result = op(self);
        match &result {
            Ok(_) => self.last_error.clear(),
            Err(err) => {
                self.last_error = err.to_string();
                warn!(error = %err, "keycard operation failed");
            }
        }
        result
    }

    fn require_open(&self) -> Result<()> {
        if self.channel.is_open() {
            Ok(())
        } else {
            Err(Error::SecureChannelNotOpen)
        }
    }

    fn require_pin_verified(&self) -> Result<()> {
        self.require_open()?;
        if self.pin_verified {
            Ok(())
        } else {
            Err(Error::PinVerificationRequired)
        }
    }

    fn require_key_loaded(&self) -> Result<()> {
        match &self.application_info {
            Some(info) if !info.has_key() => Err(Error::NoKeyLoaded),
            _ => Ok(()),
        }
    }

    /// SELECT the applet and seed the ECDH handshake
    ///
    /// Selecting resets the applet, so any live session is discarded first.
    pub fn select(&mut self) -> Result<SelectedApplication> {
        self.tracked(|kc| {
            kc.channel.reset();
            kc.pin_verified = false;

            let cmd = SelectCommand::with_aid(KEYCARD_AID);
            let response = kc.channel.transmit_plain(&cmd)?;
            let selected = SelectCommand::parse_response(&response)?;

            if let Some(card_key) = selected.public_key() {
                kc.channel.seed_handshake(card_key);
            }

            kc.application_info = selected.application_info().cloned();
            debug!(initialized = selected.is_initialized(), "applet selected");
            Ok(selected)
        })
    }

    /// INIT a pre-initialized card with the given secrets, then re-SELECT
    pub fn init(&mut self, secrets: &Secrets) -> Result<()> {
        self.tracked(|kc| {
            let payload = kc.channel.one_shot_encrypt(&secrets.to_init_payload())?;
            let cmd = InitCommand::with_encrypted_payload(payload);
            let response = kc.channel.transmit_plain(&cmd)?;
            InitCommand::parse_response(&response)?;

            debug!("card initialized");
            // The card only reports its initialized state after re-selection.
            kc.select().map(|_| ())
        })
    }

    /// PAIR with the card using the pairing password
    ///
    /// The returned pairing must be stored by the caller to reconnect after
    /// a power cycle.
    pub fn pair(&mut self, pairing_password: &str) -> Result<PairingInfo> {
        self.tracked(|kc| {
            validate_pairing_password(pairing_password)?;
            let token = Zeroizing::new(generate_pairing_token(pairing_password));

            let mut challenge = Challenge::default();
            rand::thread_rng().fill_bytes(&mut challenge);

            let cmd = PairCommand::with_challenge(&challenge);
            let response = kc.channel.transmit_plain(&cmd)?;
            let first = PairCommand::parse_first_stage(&response)?;

            // A wrong password dies here, before the second APDU goes out.
            if first.cryptogram != calculate_cryptogram(&token, &challenge) {
                return Err(Error::CryptogramMismatch);
            }

            let client_cryptogram = calculate_cryptogram(&token, &first.challenge);
            let cmd = PairCommand::with_cryptogram(&client_cryptogram);
            let response = kc.channel.transmit_plain(&cmd)?;
            let last = PairCommand::parse_final_stage(&response)?;

            let key = Sha256::new()
                .chain_update(token.as_slice())
                .chain_update(last.salt)
                .finalize();
            let pairing = PairingInfo::new(&key, last.index)?;

            debug!(index = pairing.index, "paired");
            kc.pairing_info = Some(pairing.clone());
            Ok(pairing)
        })
    }

    /// Open the secure channel with the stored pairing and mutually
    /// authenticate
    pub fn open_secure_channel(&mut self) -> Result<()> {
        self.tracked(|kc| {
            let pairing = kc.pairing_info.clone().ok_or(Error::PairingRequired)?;
            kc.pin_verified = false;
            kc.channel.open(&pairing)
        })
    }

    /// Open the secure channel with an explicit pairing
    pub fn open_secure_channel_with(&mut self, pairing: PairingInfo) -> Result<()> {
        self.set_pairing_info(pairing)?;
        self.open_secure_channel()
    }

    /// VERIFY PIN; wrong attempts surface with the remaining count
    pub fn verify_pin(&mut self, pin: &str) -> Result<()> {
        self.tracked(|kc| {
            kc.require_open()?;
            validate_pin(pin)?;

            let cmd = VerifyPinCommand::with_pin(pin);
            let response = kc.channel.transmit(&cmd)?;
            let result = VerifyPinCommand::parse_response(&response);

            match &result {
                Ok(()) => {
                    kc.pin_verified = true;
                    kc.remaining_pin_attempts = None;
                }
                Err(Error::WrongPin { remaining }) => {
                    kc.remaining_pin_attempts = Some(*remaining)
                }
                Err(Error::PinBlocked) => kc.remaining_pin_attempts = Some(0),
                Err(_) => {}
            }
            result
        })
    }

    /// Change the PIN, PUK, or pairing secret
    pub fn change_credential(&mut self, credential: CredentialType, new_value: &str) -> Result<()> {
        self.tracked(|kc| {
            kc.require_pin_verified()?;

            let cmd = match credential {
                CredentialType::Pin => {
                    validate_pin(new_value)?;
                    ChangePinCommand::with_pin(new_value)
                }
                CredentialType::Puk => {
                    validate_puk(new_value)?;
                    ChangePinCommand::with_puk(new_value)
                }
                CredentialType::PairingSecret => {
                    validate_pairing_password(new_value)?;
                    ChangePinCommand::with_pairing_secret(new_value)
                }
            };

            let response = kc.channel.transmit(&cmd)?;
            ChangePinCommand::parse_response(&response)
        })
    }

    /// Change the PIN
    pub fn change_pin(&mut self, new_pin: &str) -> Result<()> {
        self.change_credential(CredentialType::Pin, new_pin)
    }

    /// Change the PUK
    pub fn change_puk(&mut self, new_puk: &str) -> Result<()> {
        self.change_credential(CredentialType::Puk, new_puk)
    }

    /// Change the pairing secret
    pub fn change_pairing_secret(&mut self, new_password: &str) -> Result<()> {
        self.change_credential(CredentialType::PairingSecret, new_password)
    }

    /// UNBLOCK PIN with the PUK, setting a new PIN
    pub fn unblock_pin(&mut self, puk: &str, new_pin: &str) -> Result<()> {
        self.tracked(|kc| {
            kc.require_open()?;
            validate_puk(puk)?;
            validate_pin(new_pin)?;

            let cmd = UnblockPinCommand::with_puk_and_new_pin(puk, new_pin);
            let response = kc.channel.transmit(&cmd)?;
            let result = UnblockPinCommand::parse_response(&response);

            if result.is_ok() {
                kc.remaining_pin_attempts = None;
            }
            result
        })
    }

    /// GET STATUS: the application status template
    pub fn get_status(&mut self) -> Result<ApplicationStatus> {
        self.tracked(|kc| {
            kc.require_open()?;
            let response = kc.channel.transmit(&GetStatusCommand::application())?;
            GetStatusCommand::parse_application_status(&response)
        })
    }

    /// GET STATUS: the current BIP32 key path
    pub fn get_key_path(&mut self) -> Result<DerivationPath> {
        self.tracked(|kc| {
            kc.require_open()?;
            let response = kc.channel.transmit(&GetStatusCommand::key_path())?;
            GetStatusCommand::parse_key_path(&response)
        })
    }

    /// GENERATE KEY on the card; returns the key UID
    pub fn generate_key(&mut self) -> Result<[u8; 32]> {
        self.tracked(|kc| {
            kc.require_pin_verified()?;
            let response = kc.channel.transmit(&GenerateKeyCommand::create())?;
            let uid = GenerateKeyCommand::parse_response(&response)?;
            if let Some(info) = &mut kc.application_info {
                info.key_uid = Some(uid);
            }
            Ok(uid)
        })
    }

    /// GENERATE MNEMONIC: BIP39 word indices drawn by the card
    pub fn generate_mnemonic(&mut self, checksum_bits: u8) -> Result<Vec<u16>> {
        self.tracked(|kc| {
            kc.require_open()?;
            let cmd = GenerateMnemonicCommand::with_checksum_bits(checksum_bits)?;
            let response = kc.channel.transmit(&cmd)?;
            GenerateMnemonicCommand::parse_response(&response)
        })
    }

    /// LOAD KEY from a 64-byte BIP39 seed; returns the key UID
    pub fn load_seed(&mut self, seed: &[u8]) -> Result<[u8; 32]> {
        self.tracked(|kc| {
            kc.require_pin_verified()?;
            let seed: &[u8; 64] = seed.try_into().map_err(|_| Error::InvalidSeedLength)?;

            let response = kc.channel.transmit(&LoadKeyCommand::with_seed(seed))?;
            let uid = LoadKeyCommand::parse_response(&response)?;
            if let Some(info) = &mut kc.application_info {
                info.key_uid = Some(uid);
            }
            Ok(uid)
        })
    }

    /// REMOVE KEY from the card
    pub fn remove_key(&mut self) -> Result<()> {
        self.tracked(|kc| {
            kc.require_pin_verified()?;
            let response = kc.channel.transmit(&RemoveKeyCommand::remove())?;
            RemoveKeyCommand::parse_response(&response)?;
            if let Some(info) = &mut kc.application_info {
                info.key_uid = None;
            }
            Ok(())
        })
    }

    /// DERIVE KEY: make the key at `path` current
    pub fn derive_key(&mut self, path: &KeyPath) -> Result<()> {
        self.tracked(|kc| {
            kc.require_pin_verified()?;
            kc.require_key_loaded()?;
            let response = kc.channel.transmit(&DeriveKeyCommand::with_path(path))?;
            DeriveKeyCommand::parse_response(&response)
        })
    }

    /// SIGN a 32-byte hash with the current key
    pub fn sign(&mut self, hash: &[u8]) -> Result<Signature> {
        self.tracked(|kc| {
            kc.require_pin_verified()?;
            let hash = check_hash(hash)?;
            let response = kc.channel.transmit(&SignCommand::with_current_key(hash))?;
            SignCommand::parse_response(&response)
        })
    }

    /// SIGN a 32-byte hash with the key at `path`
    pub fn sign_with_path(
        &mut self,
        hash: &[u8],
        path: &KeyPath,
        make_current: bool,
    ) -> Result<Signature> {
        self.tracked(|kc| {
            kc.require_pin_verified()?;
            let hash = check_hash(hash)?;
            let mode = if make_current {
                DeriveMode::Persistent
            } else {
                DeriveMode::Temporary
            };
            let response = kc
                .channel
                .transmit(&SignCommand::with_path(hash, path, mode))?;
            SignCommand::parse_response(&response)
        })
    }

    /// SIGN a 32-byte hash with the pinless path; no PIN required
    pub fn sign_pinless(&mut self, hash: &[u8]) -> Result<Signature> {
        self.tracked(|kc| {
            kc.require_open()?;
            let hash = check_hash(hash)?;
            let response = kc.channel.transmit(&SignCommand::pinless(hash))?;
            SignCommand::parse_response(&response)
        })
    }

    /// SET PINLESS PATH to an absolute path
    pub fn set_pinless_path(&mut self, path: &KeyPath) -> Result<()> {
        self.tracked(|kc| {
            kc.require_pin_verified()?;
            let cmd = SetPinlessPathCommand::with_path(path)?;
            let response = kc.channel.transmit(&cmd)?;
            SetPinlessPathCommand::parse_response(&response)
        })
    }

    /// Clear the pinless path
    pub fn clear_pinless_path(&mut self) -> Result<()> {
        self.tracked(|kc| {
            kc.require_pin_verified()?;
            let response = kc.channel.transmit(&SetPinlessPathCommand::clear())?;
            SetPinlessPathCommand::parse_response(&response)
        })
    }

    /// EXPORT KEY material, optionally deriving first
    pub fn export_key(
        &mut self,
        what: ExportOption,
        path: &KeyPath,
        make_current: bool,
    ) -> Result<ExportedKey> {
        self.tracked(|kc| {
            kc.require_pin_verified()?;

            let cmd = match path {
                KeyPath::Current => ExportKeyCommand::current(what),
                _ => {
                    let mode = if make_current {
                        DeriveMode::Persistent
                    } else {
                        DeriveMode::Temporary
                    };
                    ExportKeyCommand::derived(path, mode, what)
                }
            };

            let response = kc.channel.transmit(&cmd)?;
            let keypair = ExportKeyCommand::parse_response(&response)?;
            ExportedKey::from_keypair(keypair, what)
        })
    }

    /// STORE DATA into a record slot
    pub fn store_data(&mut self, record: PersistentRecord, data: &[u8]) -> Result<()> {
        self.tracked(|kc| {
            kc.require_open()?;
            let response = kc.channel.transmit(&StoreDataCommand::put(record, data))?;
            StoreDataCommand::parse_response(&response)
        })
    }

    /// GET DATA from a record slot
    pub fn get_data(&mut self, record: PersistentRecord) -> Result<Vec<u8>> {
        self.tracked(|kc| {
            kc.require_open()?;
            let response = kc.channel.transmit(&GetDataCommand::get(record))?;
            GetDataCommand::parse_response(&response)
        })
    }

    /// IDENTIFY the card: signature over a challenge, no secure channel
    /// needed
    pub fn identify(&mut self, challenge: Option<&[u8; 32]>) -> Result<Signature> {
        self.tracked(|kc| {
            let cmd = match challenge {
                Some(c) => IdentCommand::with_challenge(c),
                None => IdentCommand::with_random_challenge(),
            };
            let response = kc.channel.transmit_plain(&cmd)?;
            IdentCommand::parse_response(&response)
        })
    }

    /// FACTORY RESET the card
    ///
    /// Re-selects first; a card already in the factory state short-circuits
    /// to success. On success all local state is cleared.
    pub fn factory_reset(&mut self) -> Result<()> {
        self.tracked(|kc| {
            let selected = kc.select()?;
            if !selected.is_initialized() {
                debug!("card already in factory state");
                return Ok(());
            }

            let response = kc.channel.transmit_plain(&FactoryResetCommand::reset())?;
            FactoryResetCommand::parse_response(&response)?;

            kc.channel.reset();
            kc.application_info = None;
            kc.pairing_info = None;
            kc.pin_verified = false;
            kc.remaining_pin_attempts = None;
            Ok(())
        })
    }

    /// UNPAIR a slot; forgetting our own pairing if it matches
    pub fn unpair(&mut self, index: u8) -> Result<()> {
        self.tracked(|kc| {
            kc.require_pin_verified()?;
            let response = kc.channel.transmit(&UnpairCommand::with_index(index))?;
            UnpairCommand::parse_response(&response)?;

            if kc.pairing_info.as_ref().is_some_and(|p| p.index == index) {
                kc.pairing_info = None;
            }
            Ok(())
        })
    }
}

fn check_hash(hash: &[u8]) -> Result<&[u8; 32]> {
    hash.try_into().map_err(|_| Error::InvalidHashLength)
}
