//! # Keystores
//!
//! Password-encrypted secret key files, the way MultiversX wallets export
//! them:
//!
//! ```text
//! password ──scrypt(salt, n, r, p)──▶ derived key (32 bytes)
//!                                      ├─ [0..16]  AES-128-CTR key
//!                                      └─ [16..32] HMAC-SHA256 key
//!
//! HMAC(mac key, ciphertext) == mac ?  ──no──▶ IncorrectPassword
//!                                     └─yes─▶ AES-CTR(ciphertext) = seed ‖ pubkey
//! ```
//!
//! Only decryption lives here. Creating keystores is a wallet's job.

pub mod cipher;
pub mod decryptor;
pub mod format;
pub mod kdf;

pub use decryptor::{DecryptedIdentity, KeystoreDecryptor};
pub use format::Keystore;
pub use kdf::{DerivedKey, KeyDerivation, Scrypt, ScryptParams};

use thiserror::Error;

use crate::crypto::keys::KeyError;

/// Everything that can go wrong between a keystore path and a keypair.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("keystore not found: {0}")]
    NotFound(String),

    #[error("failed to read keystore: {0}")]
    Io(String),

    #[error("malformed keystore: {0}")]
    Malformed(String),

    #[error("unsupported keystore format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid scrypt parameters: {0}")]
    InvalidKdfParams(String),

    #[error("incorrect password")]
    IncorrectPassword,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("decrypted key is invalid: {0}")]
    Key(#[from] KeyError),
}
