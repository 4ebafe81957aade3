//! Plain-path flows against a scripted transport: everything that happens
//! before (or without) a secure channel.

use bytes::Bytes;
use k256::SecretKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use tessera_keycard::{Error, Keycard, MockTransport, Secrets};

fn card_public_key_bytes() -> Vec<u8> {
    SecretKey::random(&mut rand::thread_rng())
        .public_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec()
}

/// `0x80 || 0x41 || pubkey`, the pre-initialized SELECT payload
fn pre_initialized_select_response(pubkey: &[u8]) -> Bytes {
    let mut raw = vec![0x80, 0x41];
    raw.extend_from_slice(pubkey);
    raw.extend_from_slice(&[0x90, 0x00]);
    Bytes::from(raw)
}

fn initialized_select_response(pubkey: &[u8]) -> Bytes {
    let mut inner = Vec::new();
    inner.extend_from_slice(&[0x8F, 16]);
    inner.extend_from_slice(&[0x42; 16]);
    inner.extend_from_slice(&[0x80, 65]);
    inner.extend_from_slice(pubkey);
    inner.extend_from_slice(&[0x02, 2, 3, 1]);
    inner.extend_from_slice(&[0x02, 1, 5]);
    inner.extend_from_slice(&[0x8E, 0]);
    inner.extend_from_slice(&[0x8D, 1, 0x0F]);

    let mut raw = vec![0xA4, inner.len() as u8];
    raw.extend_from_slice(&inner);
    raw.extend_from_slice(&[0x90, 0x00]);
    Bytes::from(raw)
}

#[test]
fn select_pre_initialized_card() {
    let pubkey = card_public_key_bytes();
    let transport = MockTransport::new(vec![pre_initialized_select_response(&pubkey)]);
    let mut keycard = Keycard::new(transport);

    let selected = keycard.select().unwrap();
    assert!(!selected.is_initialized());
    assert_eq!(
        selected.public_key().unwrap().to_encoded_point(false).as_bytes(),
        pubkey.as_slice()
    );

    // No instance UID yet: nothing cached as application info.
    assert!(keycard.application_info().is_none());

    // The SELECT went out with the Keycard AID.
    assert_eq!(
        keycard.transport().commands[0].as_ref(),
        [
            0x00, 0xA4, 0x04, 0x00, 0x09, 0xA0, 0x00, 0x00, 0x08, 0x04, 0x00, 0x01, 0x01, 0x01,
            0x00
        ]
    );
}

#[test]
fn init_encrypts_and_reselects() {
    let pubkey = card_public_key_bytes();
    let transport = MockTransport::new(vec![
        pre_initialized_select_response(&pubkey),
        Bytes::from_static(&[0x90, 0x00]),
        initialized_select_response(&pubkey),
    ]);
    let mut keycard = Keycard::new(transport);

    keycard.select().unwrap();

    let secrets = Secrets::new("123456", "123456789012", "some-password").unwrap();
    keycard.init(&secrets).unwrap();

    // INIT went through, and the automatic re-SELECT cached the card info.
    assert!(keycard.application_info().is_some());

    let init_apdu = &keycard.transport().commands[1];
    assert_eq!(&init_apdu[..4], &[0x00, 0xFD, 0x00, 0x00]);
    // One-shot wrapping: pubkey length marker, 65-byte key, 16-byte IV, and
    // the padded 50-byte plaintext rounds to 64 ciphertext bytes.
    assert_eq!(init_apdu[5], 0x41);
    assert_eq!(init_apdu[4] as usize, 1 + 65 + 16 + 64);
}

#[test]
fn init_without_select_is_rejected() {
    let mut keycard = Keycard::new(MockTransport::with_success());
    let secrets = Secrets::new("123456", "123456789012", "some-password").unwrap();

    assert!(matches!(
        keycard.init(&secrets),
        Err(Error::HandshakeNotSeeded)
    ));
    assert!(!keycard.last_error().is_empty());
}

#[test]
fn factory_reset_short_circuits_on_factory_state() {
    let pubkey = card_public_key_bytes();
    let transport = MockTransport::new(vec![pre_initialized_select_response(&pubkey)]);
    let mut keycard = Keycard::new(transport);

    // A pre-initialized card needs no wipe: select-only, no reset APDU.
    keycard.factory_reset().unwrap();
    assert_eq!(keycard.transport().commands.len(), 1);
}

#[test]
fn unknown_status_word_carries_raw_code() {
    let transport = MockTransport::new(vec![Bytes::from_static(&[0x6D, 0x00])]);
    let mut keycard = Keycard::new(transport);

    match keycard.select() {
        Err(Error::UnexpectedStatus(sw)) => assert_eq!(sw.to_u16(), 0x6D00),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(keycard.last_error().contains("6D00"));
}

#[test]
fn transport_failure_surfaces() {
    let mut transport = MockTransport::with_success();
    transport.connected = false;
    let mut keycard = Keycard::new(transport);

    assert!(matches!(keycard.select(), Err(Error::Transport(_))));
}

#[test]
fn pairing_password_is_validated_before_any_apdu() {
    let mut keycard = Keycard::new(MockTransport::with_success());
    assert!(matches!(
        keycard.pair("abc"),
        Err(Error::InvalidPairingPassword)
    ));
    assert!(keycard.transport().commands.is_empty());
}
