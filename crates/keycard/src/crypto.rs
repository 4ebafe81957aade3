//! Cryptographic primitives for the Keycard secure channel
//!
//! All confidentiality is secp256k1 ECDH + AES-256-CBC; integrity is an
//! AES-CBC based retail MAC ([`calculate_mac`]). Padding throughout is
//! ISO/IEC 9797-1 method 2 (`0x80` then zeros), the same scheme the applet
//! uses on its side of the channel.

use bytes::{BufMut, Bytes, BytesMut};
use cipher::{
    BlockDecryptMut, BlockEncryptMut, Iv, IvSizeUser, Key, KeyIvInit, KeySizeUser,
    typenum::{U16, U32},
};
use generic_array::GenericArray;
use k256::{PublicKey, SecretKey, ecdh::SharedSecret, elliptic_curve::sec1::ToEncodedPoint};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Salt for the PBKDF2 pairing password derivation
pub const PAIRING_TOKEN_SALT: &str = "Keycard Pairing Password Salt";
/// PBKDF2 iteration count for the pairing token
const PAIRING_TOKEN_ITERATIONS: u32 = 50_000;

const BLOCK_SIZE: usize = 16;

/// 32-byte pairing token derived from the pairing password
pub type PairingToken = GenericArray<u8, U32>;
/// 32-byte SHA-256 cryptogram exchanged during pairing
pub type Cryptogram = GenericArray<u8, U32>;
/// 32-byte random challenge
pub type Challenge = GenericArray<u8, U32>;
/// 16-byte metadata block authenticated alongside each secure-channel message
pub(crate) type ApduMeta = GenericArray<u8, U16>;

type Encryptor = cbc::Encryptor<aes::Aes256>;
type Decryptor = cbc::Decryptor<aes::Aes256>;

/// Key/IV sizing marker for the Keycard secure channel (AES-256, 16-byte IV)
pub struct KeycardScp;

impl KeySizeUser for KeycardScp {
    type KeySize = U32;
}

impl IvSizeUser for KeycardScp {
    type IvSize = U16;
}

/// Compute the secp256k1 ECDH shared secret
///
/// The raw X coordinate is the secret, as used by the applet; no KDF is
/// applied on top.
pub(crate) fn ecdh_shared_secret(private: &SecretKey, public: &PublicKey) -> SharedSecret {
    k256::elliptic_curve::ecdh::diffie_hellman(private.to_nonzero_scalar(), public.as_affine())
}

/// Derive the 32-byte pairing token from a pairing password
///
/// PBKDF2-HMAC-SHA-256 with 50 000 iterations; password and salt are NFKD
/// normalized first.
pub(crate) fn generate_pairing_token(password: &str) -> PairingToken {
    let password: String = password.nfkd().collect();
    let salt: String = PAIRING_TOKEN_SALT.nfkd().collect();

    let mut token = PairingToken::default();
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        PAIRING_TOKEN_ITERATIONS,
        &mut token,
    );
    token
}

/// Pairing cryptogram: `SHA-256(secret || challenge)`
pub(crate) fn calculate_cryptogram(secret: &PairingToken, challenge: &Challenge) -> Cryptogram {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update(challenge);
    hasher.finalize()
}

/// Derive session keys from the ECDH secret, pairing key, and the card's salt
///
/// `H = SHA-512(secret || pairing_key || salt)`; the encryption key is
/// `H[0..32]` and the MAC key `H[32..64]`.
pub(crate) fn derive_session_keys(
    secret: &[u8],
    pairing_key: &Key<KeycardScp>,
    salt: &Challenge,
) -> (Key<KeycardScp>, Key<KeycardScp>) {
    let mut hasher = Sha512::new();
    hasher.update(secret);
    hasher.update(pairing_key);
    hasher.update(salt);
    let digest = Zeroizing::new(hasher.finalize());

    let enc = Key::<KeycardScp>::clone_from_slice(&digest[0..32]);
    let mac = Key::<KeycardScp>::clone_from_slice(&digest[32..64]);
    (enc, mac)
}

/// Pad with ISO/IEC 9797-1 method 2: append `0x80`, then zeros to a block
/// boundary. Always grows the input by at least one byte.
pub(crate) fn pad(data: &[u8]) -> Vec<u8> {
    let padded_len = (data.len() / BLOCK_SIZE + 1) * BLOCK_SIZE;
    let mut out = Vec::with_capacity(padded_len);
    out.extend_from_slice(data);
    out.push(0x80);
    out.resize(padded_len, 0x00);
    out
}

/// Strip ISO/IEC 9797-1 method 2 padding; absence of the `0x80` sentinel is
/// a decoding error.
pub(crate) fn unpad(data: &[u8]) -> Result<&[u8]> {
    for (i, &byte) in data.iter().enumerate().rev() {
        match byte {
            0x00 => continue,
            0x80 => return Ok(&data[..i]),
            _ => break,
        }
    }
    Err(Error::InvalidPadding)
}

fn cbc_encrypt_in_place(key: &Key<KeycardScp>, iv: &Iv<KeycardScp>, buf: &mut [u8]) {
    debug_assert_eq!(buf.len() % BLOCK_SIZE, 0);
    let mut encryptor = Encryptor::new(key, iv);
    for block in buf.chunks_exact_mut(BLOCK_SIZE) {
        encryptor.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

fn cbc_decrypt_in_place(key: &Key<KeycardScp>, iv: &Iv<KeycardScp>, buf: &mut [u8]) {
    debug_assert_eq!(buf.len() % BLOCK_SIZE, 0);
    let mut decryptor = Decryptor::new(key, iv);
    for block in buf.chunks_exact_mut(BLOCK_SIZE) {
        decryptor.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

/// Pad and encrypt a message payload under the session encryption key
pub(crate) fn encrypt_data(data: &[u8], key: &Key<KeycardScp>, iv: &Iv<KeycardScp>) -> Bytes {
    let mut buf = pad(data);
    cbc_encrypt_in_place(key, iv, &mut buf);
    Bytes::from(buf)
}

/// Decrypt and unpad a message payload under the session encryption key
pub(crate) fn decrypt_data(
    data: &[u8],
    key: &Key<KeycardScp>,
    iv: &Iv<KeycardScp>,
) -> Result<Bytes> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(Error::InvalidResponseLength {
            expected: BLOCK_SIZE,
            actual: data.len(),
        });
    }

    let mut buf = Zeroizing::new(data.to_vec());
    cbc_decrypt_in_place(key, iv, &mut buf);
    let plaintext = unpad(&buf)?;
    Ok(Bytes::copy_from_slice(plaintext))
}

/// Retail MAC over a 16-byte metadata block and a message
///
/// The padded message is appended to `meta` and the whole buffer is
/// encrypted with AES-256-CBC under a zero IV; the second-to-last ciphertext
/// block is the MAC. Because CBC chains sequentially, this single pass is
/// identical to encrypting `meta` first and using its last ciphertext block
/// as the IV for the message.
pub(crate) fn calculate_mac(
    meta: &ApduMeta,
    data: &[u8],
    mac_key: &Key<KeycardScp>,
) -> Iv<KeycardScp> {
    let mut buf = Vec::with_capacity(meta.len() + data.len() + BLOCK_SIZE);
    buf.extend_from_slice(meta);
    buf.extend_from_slice(&pad(data));

    cbc_encrypt_in_place(mac_key, &Iv::<KeycardScp>::default(), &mut buf);

    Iv::<KeycardScp>::clone_from_slice(&buf[buf.len() - 32..buf.len() - 16])
}

/// One-shot encryption of the INIT payload
///
/// Session keys do not exist yet when INIT runs, so the plaintext is
/// encrypted directly under the raw ECDH secret with a fresh random IV and
/// wrapped as `[len(host_pub)] [host_pub(65)] [iv(16)] [ciphertext]`.
/// No MAC is applied; the applet validates the plaintext semantically.
pub(crate) fn one_shot_encrypt(host_public: &PublicKey, secret: &[u8], data: &[u8]) -> Bytes {
    let mut iv = Iv::<KeycardScp>::default();
    rand::thread_rng().fill_bytes(&mut iv);

    let mut ciphertext = pad(data);
    cbc_encrypt_in_place(Key::<KeycardScp>::from_slice(secret), &iv, &mut ciphertext);

    let host_pub = host_public.to_encoded_point(false);
    let mut out = BytesMut::with_capacity(1 + host_pub.len() + iv.len() + ciphertext.len());
    out.put_u8(host_pub.len() as u8);
    out.put_slice(host_pub.as_bytes());
    out.put_slice(&iv);
    out.put_slice(&ciphertext);
    out.freeze()
}
