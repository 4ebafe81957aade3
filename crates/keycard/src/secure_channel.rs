//! Secure channel over a card transport
//!
//! Wraps a [`CardTransport`] and, once a session is established, pushes
//! every command through the encrypt/MAC pipeline and every response
//! through verify/decrypt. Without a session, commands pass through
//! untouched, which is exactly what the pre-handshake commands (SELECT,
//! PAIR, INIT, OPEN SECURE CHANNEL, IDENTIFY, FACTORY RESET) need.
//!
//! Lifecycle: `seed` at SELECT (ephemeral ECDH), `open` (OPEN SECURE
//! CHANNEL derives session keys), `authenticate` (MUTUALLY AUTHENTICATE
//! marks the channel open). Any MAC failure invalidates the session: the
//! IV chain on the two endpoints can no longer agree.

use std::fmt;
use std::thread;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use k256::{PublicKey, SecretKey};
use rand::RngCore;
use tessera_apdu::{Command, Response, exchange, transport::CardTransport};
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use crate::commands::mutually_authenticate::MutuallyAuthenticateCommand;
use crate::commands::open_secure_channel::OpenSecureChannelCommand;
use crate::crypto::{
    ApduMeta, Challenge, decrypt_data, ecdh_shared_secret, encrypt_data, one_shot_encrypt,
};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::types::PairingInfo;

/// Delay before the single retry of a command that failed with SW `6F05`.
/// On some carriers the card's crypto state lags one APDU behind the host
/// right after the channel opens.
const HOT_PLUG_RETRY_DELAY: Duration = Duration::from_millis(50);

const MAC_LENGTH: usize = 16;

/// Handshake material retained from SELECT until the channel opens
struct Handshake {
    host_private: SecretKey,
    shared_secret: Zeroizing<[u8; 32]>,
}

/// Secure channel wrapping the underlying transport
pub struct SecureChannel<T: CardTransport> {
    transport: T,
    handshake: Option<Handshake>,
    session: Option<Session>,
    established: bool,
}

impl<T: CardTransport> fmt::Debug for SecureChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureChannel")
            .field("seeded", &self.handshake.is_some())
            .field("session", &self.session.is_some())
            .field("established", &self.established)
            .finish()
    }
}

impl<T: CardTransport> SecureChannel<T> {
    /// Wrap a transport; the channel starts idle
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            handshake: None,
            session: None,
            established: false,
        }
    }

    /// Access the wrapped transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the wrapped transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Whether the channel is open (mutual authentication completed)
    pub fn is_open(&self) -> bool {
        self.established && self.session.is_some()
    }

    /// Whether SELECT has seeded the ECDH handshake
    pub fn is_seeded(&self) -> bool {
        self.handshake.is_some()
    }

    /// Seed the handshake from the card's secure channel public key
    ///
    /// Generates a fresh ephemeral key pair and computes the shared secret.
    /// Nothing goes on the wire; the state powers OPEN SECURE CHANNEL and
    /// the one-shot INIT encryption.
    pub fn seed_handshake(&mut self, card_public_key: &PublicKey) {
        let host_private = SecretKey::random(&mut rand::thread_rng());
        let shared = ecdh_shared_secret(&host_private, card_public_key);

        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(shared.raw_secret_bytes());

        debug!("ECDH handshake seeded");
        self.handshake = Some(Handshake {
            host_private,
            shared_secret: secret,
        });
    }

    /// One-shot encryption of the INIT payload under the raw ECDH secret
    pub fn one_shot_encrypt(&self, data: &[u8]) -> Result<bytes::Bytes> {
        let handshake = self.handshake.as_ref().ok_or(Error::HandshakeNotSeeded)?;
        Ok(one_shot_encrypt(
            &handshake.host_private.public_key(),
            handshake.shared_secret.as_ref(),
            data,
        ))
    }

    /// Open the channel: OPEN SECURE CHANNEL, derive session keys, then
    /// mutually authenticate
    pub fn open(&mut self, pairing: &PairingInfo) -> Result<()> {
        let handshake = self.handshake.as_ref().ok_or(Error::HandshakeNotSeeded)?;

        // Opening again invalidates whatever session was live.
        self.session = None;
        self.established = false;

        let cmd = OpenSecureChannelCommand::with_pairing_index_and_pubkey(
            pairing.index,
            &handshake.host_private.public_key(),
        );
        let response = exchange::transmit(&mut self.transport, &cmd)?;
        let opened = OpenSecureChannelCommand::parse_response(&response)?;

        self.session = Some(Session::derive(
            handshake.shared_secret.as_ref(),
            &pairing.key,
            &opened.salt,
            opened.iv,
        ));
        debug!("session keys derived");

        self.authenticate()
    }

    /// Complete the handshake with MUTUALLY AUTHENTICATE
    fn authenticate(&mut self) -> Result<()> {
        let mut challenge = Challenge::default();
        rand::thread_rng().fill_bytes(&mut challenge);

        let cmd = MutuallyAuthenticateCommand::with_challenge(&challenge);
        let response = self.transmit(&cmd).map_err(|_| {
            self.session = None;
            Error::MutualAuthenticationFailed
        })?;

        match MutuallyAuthenticateCommand::parse_response(&response) {
            Ok(_) => {
                debug!("mutual authentication successful");
                self.established = true;
                Ok(())
            }
            Err(err) => {
                self.session = None;
                Err(err)
            }
        }
    }

    /// Tear down the session and handshake state
    pub fn reset(&mut self) {
        self.session = None;
        self.handshake = None;
        self.established = false;
    }

    /// Mark the session dead while keeping the handshake seed
    pub(crate) fn close_session(&mut self) {
        self.session = None;
        self.established = false;
    }

    /// Send one command bypassing the session entirely
    ///
    /// For the CLA `0x00` commands (SELECT, IDENTIFY, FACTORY RESET, ...)
    /// that stay unencrypted even while a session is live. Plain commands do
    /// not advance the IV chain on either side.
    pub fn transmit_plain(&mut self, command: &Command) -> Result<Response> {
        exchange::transmit(&mut self.transport, command).map_err(Error::from)
    }

    /// Send one command, protected when a session is live
    ///
    /// Errors that desynchronize the IV chain close the session before they
    /// surface.
    pub fn transmit(&mut self, command: &Command) -> Result<Response> {
        if self.session.is_none() {
            return exchange::transmit(&mut self.transport, command).map_err(Error::from);
        }

        match self.transmit_protected(command) {
            Ok(response) => Ok(response),
            Err(err) => {
                if err.desynchronizes_channel() {
                    warn!(error = %err, "secure channel desynchronized, closing session");
                    self.close_session();
                }
                Err(err)
            }
        }
    }

    fn transmit_protected(&mut self, command: &Command) -> Result<Response> {
        let mut retried = false;
        loop {
            let wire = self.protect(command)?;
            let outer = exchange::transmit(&mut self.transport, &wire)?;

            if outer.status().to_u16() == 0x6F05 {
                if retried {
                    // Both attempts failed authentication; the IV chains no
                    // longer agree.
                    return Err(Error::MacMismatch);
                }
                // Hot-plug quirk: the first post-open encrypted command can
                // fail while the card catches up. One retry, then surface.
                warn!("SW 6F05 on protected command, retrying once");
                retried = true;
                thread::sleep(HOT_PLUG_RETRY_DELAY);
                continue;
            }

            return self.process(&outer);
        }
    }

    /// Encrypt and authenticate an outgoing command
    fn protect(&mut self, command: &Command) -> Result<Command> {
        let session = self.session.as_mut().ok_or(Error::SecureChannelNotOpen)?;

        let plaintext = command.data().unwrap_or(&[]);
        let ciphertext = encrypt_data(plaintext, session.keys().enc(), session.iv());

        // Metadata block covers the header and the final wire length (the
        // MAC itself occupies the first 16 data bytes the card sees).
        let mut meta = ApduMeta::default();
        meta[0] = command.cla;
        meta[1] = command.ins;
        meta[2] = command.p1;
        meta[3] = command.p2;
        meta[4] = (ciphertext.len() + MAC_LENGTH) as u8;

        session.update_iv(&meta, &ciphertext);

        let mut data = BytesMut::with_capacity(MAC_LENGTH + ciphertext.len());
        data.put_slice(session.iv());
        data.put_slice(&ciphertext);

        trace!(
            cla = format_args!("{:02X}", command.cla),
            ins = format_args!("{:02X}", command.ins),
            len = data.len(),
            "protected command"
        );

        let mut wire = Command::new_with_data(command.cla, command.ins, command.p1, command.p2, data.freeze());
        if let Some(le) = command.le {
            wire = wire.with_le(le);
        }
        Ok(wire)
    }

    /// Verify and decrypt a response
    ///
    /// Non-success outer status words pass through untouched so the caller
    /// can interpret them; decrypted plaintext already ends in the logical
    /// status word.
    fn process(&mut self, outer: &Response) -> Result<Response> {
        if !outer.is_success() {
            return Ok(outer.clone());
        }

        let payload = outer.payload();
        if payload.is_empty() {
            return Ok(outer.clone());
        }

        if payload.len() < MAC_LENGTH {
            return Err(Error::InvalidResponseLength {
                expected: MAC_LENGTH,
                actual: payload.len(),
            });
        }

        let session = self.session.as_mut().ok_or(Error::SecureChannelNotOpen)?;
        let (rmac, rdata) = payload.split_at(MAC_LENGTH);

        // Decrypt with the pre-update IV (the MAC of our request), then
        // advance the chain and check the card's MAC.
        let plaintext = decrypt_data(rdata, session.keys().enc(), session.iv())?;

        let mut meta = ApduMeta::default();
        meta[0] = payload.len() as u8;
        session.update_iv(&meta, rdata);

        if session.iv().as_slice() != rmac {
            warn!("response MAC verification failed");
            return Err(Error::MacMismatch);
        }

        // The plaintext carries its own trailing SW1 SW2.
        Response::from_bytes(&plaintext).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipher::{Iv, Key};
    use hex_literal::hex;
    use tessera_apdu::MockTransport;

    use crate::crypto::{KeycardScp, calculate_mac};

    fn test_session() -> Session {
        let enc = hex!("FDBCB1637597CF3F8F5E8263007D4E45F64C12D44066D4576EB1443D60AEF441");
        let mac = hex!("2FB70219E6635EE0958AB3F7A428BA87E8CD6E6F873A5725A55F25B102D0F1F7");
        let iv = hex!("627E64358FA9BDCDAD4442BD8006E0A5");
        Session::from_raw(
            Key::<KeycardScp>::from_slice(&enc),
            Key::<KeycardScp>::from_slice(&mac),
            Iv::<KeycardScp>::from_slice(&iv),
        )
    }

    fn channel_with_session(
        responses: Vec<bytes::Bytes>,
    ) -> SecureChannel<MockTransport> {
        let mut channel = SecureChannel::new(MockTransport::new(responses));
        channel.session = Some(test_session());
        channel.established = true;
        channel
    }

    #[test]
    fn protect_command_reference_vector() {
        // Vector from the reference Go implementation.
        let mut channel = channel_with_session(vec![]);

        let data = hex!("D545A5E95963B6BCED86A6AE826D34C5E06AC64A1217EFFA1415A96674A82500");
        let command = Command::new_with_data(0x80, 0x11, 0x00, 0x00, data.to_vec());

        let wire = channel.protect(&command).unwrap();
        assert_eq!(
            wire.data().unwrap(),
            hex!(
                "BA796BF8FAD1FD50407B87127B94F5023EF8903AE926EAD8A204F961B8A0EDAEE7CCCFE7F7F6380CE2C6F188E598E4468B7DEDD0E807C18CCBDA71A55F3E1F9A"
            )
        );

        // The running IV is now the MAC just transmitted.
        let session = channel.session.as_ref().unwrap();
        assert_eq!(
            session.iv().as_slice(),
            hex!("BA796BF8FAD1FD50407B87127B94F502")
        );
    }

    /// Build a card-side response for the session's current state: encrypt
    /// `plaintext || sw` under the request MAC as IV, MAC it, and prepend.
    fn card_response(session: &Session, request_mac: &Iv<KeycardScp>, plaintext: &[u8]) -> Vec<u8> {
        let ciphertext = encrypt_data(plaintext, session.keys().enc(), request_mac);

        let mut meta = ApduMeta::default();
        meta[0] = (ciphertext.len() + MAC_LENGTH) as u8;
        let mac = calculate_mac(&meta, &ciphertext, session.keys().mac());

        let mut raw = Vec::new();
        raw.extend_from_slice(&mac);
        raw.extend_from_slice(&ciphertext);
        raw.extend_from_slice(&[0x90, 0x00]);
        raw
    }

    #[test]
    fn response_pipeline_verifies_and_decrypts() {
        let mut channel = channel_with_session(vec![]);

        // Protect a request to advance the IV chain, mirroring the card.
        let command = Command::new_with_data(0x80, 0xF2, 0x00, 0x00, vec![]).with_le(0);
        let _ = channel.protect(&command).unwrap();
        let request_mac = *channel.session.as_ref().unwrap().iv();

        // Card answers with plaintext `A5 A5 || 9000` through its own side
        // of the pipeline.
        let raw = card_response(
            channel.session.as_ref().unwrap(),
            &request_mac,
            &[0xA5, 0xA5, 0x90, 0x00],
        );

        let outer = Response::from_bytes(&raw).unwrap();
        let logical = channel.process(&outer).unwrap();

        assert!(logical.is_success());
        assert_eq!(logical.payload(), &[0xA5, 0xA5]);

        // The IV chain now ends at the response MAC.
        assert_eq!(
            channel.session.as_ref().unwrap().iv().as_slice(),
            &raw[..16]
        );
    }

    #[test]
    fn flipped_bit_fails_mac_verification() {
        let mut channel = channel_with_session(vec![]);

        let command = Command::new_with_data(0x80, 0xF2, 0x00, 0x00, vec![]).with_le(0);
        let _ = channel.protect(&command).unwrap();
        let request_mac = *channel.session.as_ref().unwrap().iv();

        let mut raw = card_response(
            channel.session.as_ref().unwrap(),
            &request_mac,
            &[0xA5, 0xA5, 0x90, 0x00],
        );
        // Flip one ciphertext bit.
        raw[20] ^= 0x01;

        let outer = Response::from_bytes(&raw).unwrap();
        assert!(matches!(channel.process(&outer), Err(Error::MacMismatch)));
    }

    #[test]
    fn logical_status_word_is_unwrapped() {
        // A wrong-PIN answer arrives as outer 9000 with `63 C2` inside the
        // encrypted plaintext.
        let mut channel = channel_with_session(vec![]);

        let command = Command::new_with_data(0x80, 0x20, 0x00, 0x00, b"123456".to_vec());
        let _ = channel.protect(&command).unwrap();
        let request_mac = *channel.session.as_ref().unwrap().iv();

        let raw = card_response(
            channel.session.as_ref().unwrap(),
            &request_mac,
            &[0x63, 0xC2],
        );

        let outer = Response::from_bytes(&raw).unwrap();
        let logical = channel.process(&outer).unwrap();
        assert_eq!(logical.status().to_u16(), 0x63C2);
        assert!(logical.payload().is_empty());
    }

    #[test]
    fn pass_through_without_session() {
        let mut channel = SecureChannel::new(MockTransport::with_response(
            bytes::Bytes::from_static(&[0x90, 0x00]),
        ));

        let command = Command::new(0x00, 0xA4, 0x04, 0x00);
        let response = channel.transmit(&command).unwrap();
        assert!(response.is_success());

        // The command went out untouched.
        assert_eq!(
            channel.transport().commands[0].as_ref(),
            command.to_bytes().as_ref()
        );
    }

    #[test]
    fn mac_mismatch_closes_session() {
        // Outer success with garbage payload: decryption yields bad padding
        // or the MAC check fails; either way the session must die.
        let mut bad = vec![0u8; 48];
        bad.extend_from_slice(&[0x90, 0x00]);
        let mut channel = channel_with_session(vec![bytes::Bytes::from(bad)]);

        let command = Command::new_with_data(0x80, 0xF2, 0x00, 0x00, vec![]).with_le(0);
        assert!(channel.transmit(&command).is_err());
        assert!(!channel.is_open());
        assert!(channel.session.is_none());
    }

    #[test]
    fn hot_plug_retry_happens_once() {
        // First protected exchange answers 6F05, the retry succeeds with an
        // empty payload.
        let mut channel = channel_with_session(vec![
            bytes::Bytes::from_static(&[0x6F, 0x05]),
            bytes::Bytes::from_static(&[0x90, 0x00]),
        ]);

        let command = Command::new_with_data(0x80, 0x20, 0x00, 0x00, b"123456".to_vec());
        let response = channel.transmit(&command).unwrap();
        assert!(response.is_success());
        assert_eq!(channel.transport().commands.len(), 2);
    }

    #[test]
    fn persistent_6f05_surfaces_and_closes() {
        let mut channel = channel_with_session(vec![bytes::Bytes::from_static(&[0x6F, 0x05])]);

        let command = Command::new_with_data(0x80, 0x20, 0x00, 0x00, b"123456".to_vec());
        match channel.transmit(&command) {
            Err(Error::MacMismatch) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(channel.session.is_none());
    }
}
