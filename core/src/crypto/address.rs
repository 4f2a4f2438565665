//! Bech32 account addresses (`erd1…`).
//!
//! An address is the 32-byte public key of a user account, or the 32-byte
//! identifier of a smart contract, encoded as bech32 with the `erd` prefix.
//! Contracts are recognizable by their zero-byte prefix.

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::keys::UserPublicKey;
use crate::config::{ADDRESS_HRP, ADDRESS_LENGTH, SMART_CONTRACT_ZERO_PREFIX};

/// Errors from parsing an address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("bech32 decode error: {0}")]
    Bech32Decode(String),

    #[error("wrong address prefix: expected '{expected}', got '{got}'")]
    InvalidHrp { expected: String, got: String },

    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("invalid address hex: {0}")]
    InvalidHex(String),
}

/// A MultiversX account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    bytes: [u8; ADDRESS_LENGTH],
}

impl Address {
    /// Wraps raw address bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self { bytes }
    }

    /// The all-zero address. Receiver of contract deployments.
    pub fn zero() -> Self {
        Self {
            bytes: [0u8; ADDRESS_LENGTH],
        }
    }

    /// The address of a user account.
    pub fn from_public_key(pk: &UserPublicKey) -> Self {
        Self {
            bytes: *pk.as_bytes(),
        }
    }

    /// Parses a bech32 `erd1…` string.
    pub fn from_bech32(s: &str) -> Result<Self, AddressError> {
        let (hrp, data) =
            bech32::decode(s.trim()).map_err(|e| AddressError::Bech32Decode(e.to_string()))?;

        if hrp.as_str() != ADDRESS_HRP {
            return Err(AddressError::InvalidHrp {
                expected: ADDRESS_HRP.to_string(),
                got: hrp.to_string(),
            });
        }

        Self::from_slice(&data)
    }

    /// Parses a hex-encoded 32-byte address.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let data = hex::decode(s.trim()).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Self::from_slice(&data)
    }

    fn from_slice(data: &[u8]) -> Result<Self, AddressError> {
        let bytes: [u8; ADDRESS_LENGTH] =
            data.try_into().map_err(|_| AddressError::InvalidLength {
                expected: ADDRESS_LENGTH,
                got: data.len(),
            })?;
        Ok(Self { bytes })
    }

    /// Bech32 encoding.
    pub fn to_bech32(&self) -> String {
        let hrp = Hrp::parse(ADDRESS_HRP).expect("static HRP is valid");
        bech32::encode::<Bech32>(hrp, &self.bytes)
            .expect("encoding a 32-byte payload should never fail")
    }

    /// Hex encoding of the raw bytes. This is how addresses travel as call
    /// arguments.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.bytes
    }

    /// `true` for contract addresses (and the zero address).
    pub fn is_smart_contract(&self) -> bool {
        self.bytes[..SMART_CONTRACT_ZERO_PREFIX]
            .iter()
            .all(|b| *b == 0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_bech32())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bech32(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_bech32())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_bech32(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONTRACT_DEPLOY_ADDRESS;
    use crate::crypto::keys::UserKeypair;

    const ALICE_SEED: &str = "413f42575f7f26fad3317a778771212fdb80245850981e48b58a4f25e344e8f9";
    const ALICE_ADDRESS: &str = "erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th";
    const ALICE_PUBKEY: &str = "0139472eff6886771a982f3083da5d421f24c29181e63888228dc81ca60d69e1";

    #[test]
    fn alice_address_from_seed() {
        let kp = UserKeypair::from_hex(ALICE_SEED).unwrap();
        assert_eq!(kp.address().to_bech32(), ALICE_ADDRESS);
        assert_eq!(kp.address().to_hex(), ALICE_PUBKEY);
    }

    #[test]
    fn bech32_roundtrip() {
        let addr: Address = ALICE_ADDRESS.parse().unwrap();
        assert_eq!(addr.to_bech32(), ALICE_ADDRESS);
        assert_eq!(Address::from_hex(ALICE_PUBKEY).unwrap(), addr);
    }

    #[test]
    fn rejects_foreign_prefix() {
        let hrp = Hrp::parse("tnova").unwrap();
        let foreign = bech32::encode::<Bech32>(hrp, &[1u8; 32]).unwrap();
        assert!(matches!(
            Address::from_bech32(&foreign),
            Err(AddressError::InvalidHrp { .. })
        ));
    }

    #[test]
    fn rejects_wrong_length() {
        let hrp = Hrp::parse(ADDRESS_HRP).unwrap();
        let short = bech32::encode::<Bech32>(hrp, &[1u8; 20]).unwrap();
        assert_eq!(
            Address::from_bech32(&short).unwrap_err(),
            AddressError::InvalidLength {
                expected: 32,
                got: 20
            }
        );
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut s = ALICE_ADDRESS.to_string();
        s.pop();
        s.push('q');
        assert!(Address::from_bech32(&s).is_err());
    }

    #[test]
    fn deploy_address_is_zero() {
        assert_eq!(Address::zero().to_bech32(), CONTRACT_DEPLOY_ADDRESS);
        assert!(Address::zero().is_smart_contract());
    }

    #[test]
    fn user_accounts_are_not_contracts() {
        let addr: Address = ALICE_ADDRESS.parse().unwrap();
        assert!(!addr.is_smart_contract());

        let mut bytes = [0u8; 32];
        bytes[8..].copy_from_slice(&[0x05; 24]);
        assert!(Address::from_bytes(bytes).is_smart_contract());
    }

    #[test]
    fn serde_uses_bech32() {
        let addr: Address = ALICE_ADDRESS.parse().unwrap();
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            format!("\"{}\"", ALICE_ADDRESS)
        );
    }
}
