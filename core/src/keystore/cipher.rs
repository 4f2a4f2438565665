//! AES-128-CTR and the HMAC-SHA256 integrity tag.
//!
//! The MAC covers the ciphertext only and is keyed with the second half of
//! the derived key. It is checked before anything is decrypted.

use aes::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::kdf::DerivedKey;
use super::KeystoreError;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// `HMAC-SHA256(mac_key, ciphertext)`.
pub fn compute_mac(key: &DerivedKey, ciphertext: &[u8]) -> Result<[u8; 32], KeystoreError> {
    let mut mac = HmacSha256::new_from_slice(key.mac_key())
        .map_err(|e| KeystoreError::KeyDerivation(e.to_string()))?;
    mac.update(ciphertext);
    Ok(mac.finalize().into_bytes().into())
}

/// Checks the stored MAC in constant time. A mismatch means the password
/// was wrong (or the file was tampered with; the two are indistinguishable).
pub fn verify_mac(
    key: &DerivedKey,
    ciphertext: &[u8],
    expected: &[u8],
) -> Result<(), KeystoreError> {
    let actual = compute_mac(key, ciphertext)?;
    if bool::from(actual[..].ct_eq(expected)) {
        Ok(())
    } else {
        Err(KeystoreError::IncorrectPassword)
    }
}

/// AES-128-CTR keystream application. Encryption and decryption are the
/// same operation.
pub fn apply_aes_ctr(key: &DerivedKey, iv: &[u8; 16], input: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut buf = Zeroizing::new(input.to_vec());
    let mut cipher = Aes128Ctr::new(key.decryption_key().into(), iv.into());
    cipher.apply_keystream(&mut buf);
    buf
}
