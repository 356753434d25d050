//! Cryptographic primitives
//!
//! - HMAC-SHA512 authentication tags, compared in constant time
//! - AES-256-CTR encryption with a fresh IV per message
//! - HKDF-SHA256 derivation of working keys from short secrets
//!
//! Encryption carries no integrity of its own. Every ciphertext travels inside
//! a message whose tag covers it, and decrypting with the wrong key simply
//! yields garbage.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::key::{InitializationVector, KeyData, Tag};

type HmacSha512 = Hmac<Sha512>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Length of an authentication tag (HMAC-SHA512 output)
pub const TAG_LEN: usize = 64;

/// Length of an AES initialization vector
pub const IV_LEN: usize = 16;

/// Length of symmetric key material
pub const KEY_LEN: usize = 32;

/// Generate `size` cryptographically random bytes
pub fn random(size: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; size];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Fixed-size variant of [`random`]
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes
}

/// HMAC-SHA512 of `message` under `key`
pub fn authenticate(key: &KeyData, message: &[u8]) -> Tag {
    let mut mac = HmacSha512::new_from_slice(key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(message);
    let mut bytes = [0u8; TAG_LEN];
    bytes.copy_from_slice(&mac.finalize().into_bytes());
    Tag::from(bytes)
}

/// Check `tag` against `message` without leaking timing information
pub fn verify(key: &KeyData, message: &[u8], tag: &Tag) -> bool {
    let expected = authenticate(key, message);
    expected.as_bytes()[..].ct_eq(&tag.as_bytes()[..]).into()
}

/// Encrypt `plaintext` under `key` with a fresh random IV
///
/// The ciphertext has the same length as the plaintext.
pub fn encrypt(key: &KeyData, plaintext: &[u8]) -> (Vec<u8>, InitializationVector) {
    let iv = InitializationVector::random();
    let mut buf = plaintext.to_vec();
    apply_keystream(key, &iv, &mut buf);
    (buf, iv)
}

/// Inverse of [`encrypt`] for the same key and IV
pub fn decrypt(key: &KeyData, iv: &InitializationVector, ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = ciphertext.to_vec();
    apply_keystream(key, iv, &mut buf);
    buf
}

fn apply_keystream(key: &KeyData, iv: &InitializationVector, buf: &mut [u8]) {
    let mut cipher = Aes256Ctr::new(key.as_bytes().into(), iv.as_bytes().into());
    cipher.apply_keystream(buf);
}

/// Stretch a (possibly short) secret into key material bound to `context`
pub fn derive_key(secret: &[u8], context: &[u8]) -> KeyData {
    let hkdf = Hkdf::<Sha256>::new(Some(b"bolt-lock"), secret);
    let mut okm = [0u8; KEY_LEN];
    hkdf.expand(context, &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    KeyData::from(okm)
}
