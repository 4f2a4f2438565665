//! Password-based key derivation.
//!
//! scrypt is the only KDF the keystore format defines. Its cost parameters
//! come straight out of an untrusted file, so they are bounds-checked before
//! a single byte of memory is allocated for the derivation.

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::KeystoreError;
use crate::config::{
    DERIVED_KEY_LENGTH, SCRYPT_MAX_MEMORY_BYTES, SCRYPT_MAX_N, SCRYPT_MAX_P, SCRYPT_MAX_R,
};

/// scrypt cost parameters as recorded in a keystore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptParams {
    pub n: u64,
    pub r: u32,
    pub p: u32,
    pub dklen: usize,
}

impl ScryptParams {
    /// Rejects parameters that are malformed or would cost more than the
    /// configured ceilings.
    pub fn validate(&self) -> Result<(), KeystoreError> {
        let invalid = |msg: String| Err(KeystoreError::InvalidKdfParams(msg));

        if self.dklen != DERIVED_KEY_LENGTH {
            return invalid(format!(
                "dklen must be {DERIVED_KEY_LENGTH}, got {}",
                self.dklen
            ));
        }
        if self.n < 2 || !self.n.is_power_of_two() {
            return invalid(format!("n must be a power of two >= 2, got {}", self.n));
        }
        if self.n > SCRYPT_MAX_N {
            return invalid(format!("n {} exceeds maximum {SCRYPT_MAX_N}", self.n));
        }
        if self.r == 0 || self.r > SCRYPT_MAX_R {
            return invalid(format!("r must be in 1..={SCRYPT_MAX_R}, got {}", self.r));
        }
        if self.p == 0 || self.p > SCRYPT_MAX_P {
            return invalid(format!("p must be in 1..={SCRYPT_MAX_P}, got {}", self.p));
        }
        let memory = 128 * self.n * u64::from(self.r);
        if memory > SCRYPT_MAX_MEMORY_BYTES {
            return invalid(format!(
                "n * r requires {memory} bytes, more than {SCRYPT_MAX_MEMORY_BYTES}"
            ));
        }
        Ok(())
    }

    /// `log2(n)`. Only meaningful once [`Self::validate`] passed.
    pub fn log_n(&self) -> u8 {
        self.n.trailing_zeros() as u8
    }
}

/// The 32-byte scrypt output. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; DERIVED_KEY_LENGTH],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; DERIVED_KEY_LENGTH]) -> Self {
        Self { bytes }
    }

    /// First half: the AES-128 key.
    pub fn decryption_key(&self) -> &[u8] {
        &self.bytes[..16]
    }

    /// Second half: the HMAC-SHA256 key.
    pub fn mac_key(&self) -> &[u8] {
        &self.bytes[16..]
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Turns a password into a [`DerivedKey`].
///
/// Implemented by [`Scrypt`] in production. The trait is the seam tests use
/// to prove that no derivation happens for files rejected up front.
pub trait KeyDerivation: Send + Sync {
    fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
        params: &ScryptParams,
    ) -> Result<DerivedKey, KeystoreError>;
}

/// scrypt via the RustCrypto `scrypt` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scrypt;

impl KeyDerivation for Scrypt {
    fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
        params: &ScryptParams,
    ) -> Result<DerivedKey, KeystoreError> {
        params.validate()?;

        let scrypt_params = scrypt::Params::new(params.log_n(), params.r, params.p, params.dklen)
            .map_err(|e| KeystoreError::InvalidKdfParams(e.to_string()))?;

        let mut out = [0u8; DERIVED_KEY_LENGTH];
        scrypt::scrypt(password, salt, &scrypt_params, &mut out)
            .map_err(|e| KeystoreError::KeyDerivation(e.to_string()))?;

        let key = DerivedKey::from_bytes(out);
        out.zeroize();
        Ok(key)
    }
}
