//! # Key Management
//!
//! Ed25519 keypairs for MultiversX accounts.
//!
//! A user account is nothing more than an Ed25519 public key; the 32-byte
//! seed recovered from a keystore is the whole secret. This module wraps
//! `ed25519-dalek` so the rest of the crate never touches raw scalars.
//!
//! ## Security considerations
//!
//! - Signing keys are zeroized on drop (ed25519-dalek's `zeroize` feature).
//! - `UserKeypair` is not `Clone` and not `Serialize`. Copying or exporting a
//!   secret has to be spelled out with [`UserKeypair::secret_key_bytes`].
//! - Key bytes are never logged, and `Debug` only prints the public half.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

use super::address::Address;
use crate::config::{SIGNATURE_LENGTH, SIGNING_KEY_LENGTH, VERIFYING_KEY_LENGTH};

/// Errors that can occur during key operations.
///
/// Vague on purpose: error messages that describe key material are a leak.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key: expected {SIGNING_KEY_LENGTH} bytes, got {0}")]
    InvalidSecretKeyLength(usize),

    #[error("invalid secret key encoding")]
    InvalidSecretKeyEncoding,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("keypair validation failed: public key does not match secret key")]
    KeypairMismatch,
}

/// An account keypair wrapping an Ed25519 signing key.
///
/// # Examples
///
/// ```
/// use warp_core::crypto::keys::UserKeypair;
///
/// let kp = UserKeypair::from_seed(&[7u8; 32]);
/// let sig = kp.sign(b"createProposal");
/// assert!(kp.public_key().verify(b"createProposal", &sig));
/// ```
pub struct UserKeypair {
    signing_key: SigningKey,
}

/// The public half of an account. Doubles as the address payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserPublicKey {
    bytes: [u8; VERIFYING_KEY_LENGTH],
}

/// A 64-byte Ed25519 signature.
///
/// Deterministic for a given (key, message) pair, so two signatures over the
/// same transaction are byte-identical.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct UserSignature {
    bytes: [u8; SIGNATURE_LENGTH],
}

impl UserKeypair {
    /// Constructs a keypair from a 32-byte seed.
    ///
    /// In Ed25519 the seed *is* the secret key; the public key and the
    /// expanded scalar are derived from it.
    pub fn from_seed(seed: &[u8; SIGNING_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstructs a keypair from a byte slice, rejecting wrong lengths.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let seed: [u8; SIGNING_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKeyLength(bytes.len()))?;
        let seed = Zeroizing::new(seed);
        Ok(Self::from_seed(&seed))
    }

    /// Reconstructs a keypair from a hex-encoded seed.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKeyEncoding)?,
        );
        Self::from_slice(&bytes)
    }

    /// Reconstructs a keypair from `seed || public_key` (64 bytes), the layout
    /// stored inside keystores. The embedded public key must match the seed.
    pub fn from_seed_and_public(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != SIGNING_KEY_LENGTH + VERIFYING_KEY_LENGTH {
            return Err(KeyError::InvalidSecretKeyLength(bytes.len()));
        }
        let (seed, public) = bytes.split_at(SIGNING_KEY_LENGTH);
        let keypair = Self::from_slice(seed)?;
        if keypair.public_key().as_bytes() != public {
            return Err(KeyError::KeypairMismatch);
        }
        Ok(keypair)
    }

    /// Returns the public key associated with this keypair.
    pub fn public_key(&self) -> UserPublicKey {
        UserPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// The bech32 account address for this keypair.
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> UserSignature {
        UserSignature {
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }

    /// Exports the raw 32-byte seed, wrapped so it is wiped when dropped.
    ///
    /// **Handle with care.** There is no legitimate reason to print this.
    pub fn secret_key_bytes(&self) -> Zeroizing<[u8; SIGNING_KEY_LENGTH]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }
}

impl fmt::Debug for UserKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Public half only. A partial secret in a log is still a leak.
        write!(f, "UserKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// UserPublicKey
// ---------------------------------------------------------------------------

impl UserPublicKey {
    /// Wraps raw bytes without curve validation. Addresses of smart contracts
    /// are not curve points, so validation is opt-in via [`Self::try_from_slice`].
    pub fn from_bytes(bytes: [u8; VERIFYING_KEY_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Parses a public key and checks that it is a valid Ed25519 point.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; VERIFYING_KEY_LENGTH] =
            slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; VERIFYING_KEY_LENGTH] {
        &self.bytes
    }

    /// Verify a signature against this public key.
    pub fn verify(&self, message: &[u8], signature: &UserSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig = DalekSignature::from_bytes(&signature.bytes);
        verifying_key.verify(message, &sig).is_ok()
    }

    /// Hex-encoded representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for UserPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserPublicKey({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// UserSignature
// ---------------------------------------------------------------------------

impl UserSignature {
    /// Wraps raw signature bytes.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Parses a hex-encoded signature.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let bytes = hex::decode(hex_str).ok()?;
        let bytes: [u8; SIGNATURE_LENGTH] = bytes.try_into().ok()?;
        Some(Self { bytes })
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.bytes
    }

    /// Hex-encoded form, the representation the API expects.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for UserSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserSignature({})", self.to_hex())
    }
}

impl Serialize for UserSignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for UserSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| serde::de::Error::custom("invalid signature hex"))
    }
}
