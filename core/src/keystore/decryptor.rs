//! Password → keypair.
//!
//! The order of checks is the contract here: cheap structural checks first,
//! then the (deliberately expensive) derivation, then the MAC, and only then
//! decryption. A file with an unknown cipher never costs a scrypt run, and a
//! wrong password never produces plaintext.

use std::sync::Arc;

use zeroize::Zeroizing;

use super::cipher::{apply_aes_ctr, verify_mac};
use super::format::Keystore;
use super::kdf::{KeyDerivation, Scrypt};
use super::KeystoreError;
use crate::config::{
    KEYSTORE_IV_LENGTH, KEYSTORE_MAC_LENGTH, SIGNING_KEY_LENGTH, VERIFYING_KEY_LENGTH,
};
use crate::crypto::address::Address;
use crate::crypto::keys::{KeyError, UserKeypair};

/// The result of a successful decryption.
///
/// Owns the only in-memory copy of the secret key. Not `Clone`; the signing
/// key is zeroized when this is dropped, and `Debug` prints the address only.
#[derive(Debug)]
pub struct DecryptedIdentity {
    keypair: UserKeypair,
    address: Address,
}

impl DecryptedIdentity {
    pub fn keypair(&self) -> &UserKeypair {
        &self.keypair
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn into_keypair(self) -> UserKeypair {
        self.keypair
    }
}

/// Decrypts keystores with a pluggable KDF (scrypt by default).
pub struct KeystoreDecryptor<K = Scrypt> {
    kdf: Arc<K>,
}

impl<K> Clone for KeystoreDecryptor<K> {
    fn clone(&self) -> Self {
        Self {
            kdf: Arc::clone(&self.kdf),
        }
    }
}

impl Default for KeystoreDecryptor<Scrypt> {
    fn default() -> Self {
        Self::new()
    }
}

impl KeystoreDecryptor<Scrypt> {
    pub fn new() -> Self {
        Self::with_kdf(Scrypt)
    }
}

impl<K: KeyDerivation> KeystoreDecryptor<K> {
    /// Uses a custom key derivation.
    pub fn with_kdf(kdf: K) -> Self {
        Self { kdf: Arc::new(kdf) }
    }

    /// Decrypts `keystore` with `password`. Blocks for the duration of the
    /// scrypt run; see [`Self::decrypt_async`] inside a runtime.
    pub fn decrypt(
        &self,
        keystore: &Keystore,
        password: &str,
    ) -> Result<DecryptedIdentity, KeystoreError> {
        keystore.check_supported()?;

        let params = keystore.scrypt_params();
        params.validate()?;

        let crypto = &keystore.crypto;
        if crypto.kdfparams.salt.is_empty() {
            return Err(KeystoreError::InvalidKdfParams("empty salt".into()));
        }
        let iv: [u8; KEYSTORE_IV_LENGTH] = keystore
            .iv()
            .ok_or_else(|| KeystoreError::Malformed("missing cipher iv".into()))?
            .try_into()
            .map_err(|_| {
                KeystoreError::Malformed(format!("iv must be {KEYSTORE_IV_LENGTH} bytes"))
            })?;
        if crypto.mac.len() != KEYSTORE_MAC_LENGTH {
            return Err(KeystoreError::Malformed(format!(
                "mac must be {KEYSTORE_MAC_LENGTH} bytes, got {}",
                crypto.mac.len()
            )));
        }
        if crypto.ciphertext.is_empty() {
            return Err(KeystoreError::Malformed("empty ciphertext".into()));
        }

        let derived = self.kdf.derive(
            password.as_bytes(),
            crypto.kdfparams.salt.as_slice(),
            &params,
        )?;

        verify_mac(&derived, crypto.ciphertext.as_slice(), crypto.mac.as_slice())?;

        let plaintext = apply_aes_ctr(&derived, &iv, crypto.ciphertext.as_slice());
        let keypair = keypair_from_plaintext(&plaintext)?;
        let address = keypair.address();

        check_recorded_address(keystore, &address)?;

        tracing::debug!(address = %address, "keystore decrypted");
        Ok(DecryptedIdentity { keypair, address })
    }
}

impl<K: KeyDerivation + 'static> KeystoreDecryptor<K> {
    /// Runs [`Self::decrypt`] on the blocking pool so the derivation does not
    /// stall the runtime. This is the only suspension point of a decryption.
    pub async fn decrypt_async(
        &self,
        keystore: Keystore,
        password: Zeroizing<String>,
    ) -> Result<DecryptedIdentity, KeystoreError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.decrypt(&keystore, &password))
            .await
            .map_err(|e| KeystoreError::KeyDerivation(format!("decryption task failed: {e}")))?
    }
}

fn keypair_from_plaintext(plaintext: &[u8]) -> Result<UserKeypair, KeystoreError> {
    let keypair = match plaintext.len() {
        SIGNING_KEY_LENGTH => UserKeypair::from_slice(plaintext)?,
        n if n == SIGNING_KEY_LENGTH + VERIFYING_KEY_LENGTH => {
            UserKeypair::from_seed_and_public(plaintext)?
        }
        n => return Err(KeyError::InvalidSecretKeyLength(n).into()),
    };
    Ok(keypair)
}

fn check_recorded_address(keystore: &Keystore, derived: &Address) -> Result<(), KeystoreError> {
    if let Some(hex_addr) = keystore.address.as_deref() {
        if !hex_addr.trim().eq_ignore_ascii_case(&derived.to_hex()) {
            return Err(KeyError::KeypairMismatch.into());
        }
    }
    if let Some(bech32) = keystore.bech32.as_deref() {
        if bech32.trim() != derived.to_bech32() {
            return Err(KeyError::KeypairMismatch.into());
        }
    }
    Ok(())
}
