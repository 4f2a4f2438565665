//! The JSON keystore schema.
//!
//! Field names and hex encodings match the files wallets already export, so
//! everything here is `#[serde(rename)]`-exact. Parsing a file never decrypts
//! anything; it only gives the decryptor typed access to the parameters.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

use super::kdf::ScryptParams;
use super::KeystoreError;
use crate::config::{
    KEYSTORE_CIPHER, KEYSTORE_KDF, KEYSTORE_KIND_SECRET_KEY, SUPPORTED_KEYSTORE_VERSIONS,
};

/// Bytes that travel as a hex string.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x"))
            .map(HexBytes)
            .map_err(|e| serde::de::Error::custom(format!("invalid hex: {e}")))
    }
}

/// `crypto.cipherparams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherParams {
    pub iv: HexBytes,
}

/// `crypto.kdfparams`. Some exporters put the IV here instead of in
/// `cipherparams`; both layouts are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub dklen: usize,
    pub salt: HexBytes,
    pub n: u64,
    pub r: u32,
    pub p: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<HexBytes>,
}

/// The `crypto` section of a keystore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoSection {
    pub ciphertext: HexBytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipherparams: Option<CipherParams>,
    pub cipher: String,
    pub kdf: String,
    pub kdfparams: KdfParams,
    pub mac: HexBytes,
}

/// A password-encrypted secret key file.
///
/// Immutable once loaded. Build one with [`Keystore::from_json`],
/// [`Keystore::from_slice`] or [`Keystore::load`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keystore {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Hex public key of the account, when the exporter recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Bech32 address of the account, when the exporter recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bech32: Option<String>,
    pub crypto: CryptoSection,
}

impl Keystore {
    /// Parses a keystore from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, KeystoreError> {
        serde_json::from_str(json).map_err(|e| KeystoreError::Malformed(e.to_string()))
    }

    /// Parses a keystore from raw bytes (e.g. an uploaded file).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeystoreError> {
        serde_json::from_slice(bytes).map_err(|e| KeystoreError::Malformed(e.to_string()))
    }

    /// Reads and parses a keystore file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, KeystoreError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => KeystoreError::NotFound(path.display().to_string()),
            _ => KeystoreError::Io(format!("{}: {}", path.display(), e)),
        })?;
        let keystore = Self::from_slice(&bytes)?;
        tracing::debug!(path = %path.display(), version = keystore.version, "keystore loaded");
        Ok(keystore)
    }

    /// Checks version, kind, cipher and KDF. Runs before anything expensive.
    pub fn check_supported(&self) -> Result<(), KeystoreError> {
        if !SUPPORTED_KEYSTORE_VERSIONS.contains(&self.version) {
            return Err(KeystoreError::UnsupportedFormat(format!(
                "keystore version {}",
                self.version
            )));
        }
        if let Some(kind) = &self.kind {
            if kind != KEYSTORE_KIND_SECRET_KEY {
                return Err(KeystoreError::UnsupportedFormat(format!(
                    "keystore kind '{kind}'"
                )));
            }
        }
        if self.crypto.cipher != KEYSTORE_CIPHER {
            return Err(KeystoreError::UnsupportedFormat(format!(
                "cipher '{}'",
                self.crypto.cipher
            )));
        }
        if self.crypto.kdf != KEYSTORE_KDF {
            return Err(KeystoreError::UnsupportedFormat(format!(
                "kdf '{}'",
                self.crypto.kdf
            )));
        }
        Ok(())
    }

    /// The AES-CTR initialization vector, wherever the exporter put it.
    pub fn iv(&self) -> Option<&[u8]> {
        self.crypto
            .cipherparams
            .as_ref()
            .map(|c| c.iv.as_slice())
            .or_else(|| self.crypto.kdfparams.iv.as_ref().map(|iv| iv.as_slice()))
    }

    /// The scrypt cost parameters as recorded in the file (unvalidated).
    pub fn scrypt_params(&self) -> ScryptParams {
        let k = &self.crypto.kdfparams;
        ScryptParams {
            n: k.n,
            r: k.r,
            p: k.p,
            dklen: k.dklen,
        }
    }
}
