//! Argument and metadata types for contract calls.
//!
//! MultiversX contract calls carry their arguments in the transaction data
//! field as `@`-separated hex. The encoding depends on the declared type, so
//! callers hand over typed [`Argument`]s rather than pre-encoded strings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::address::Address;

// ---------------------------------------------------------------------------
// Argument
// ---------------------------------------------------------------------------

/// A typed contract-call argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Argument {
    /// UTF-8 text, sent as the hex of its bytes.
    Utf8(String),
    /// Raw bytes, sent as hex.
    Bytes(Vec<u8>),
    /// `true` is `01`, `false` is the empty argument.
    Bool(bool),
    /// Unsigned integer as minimal big-endian hex. Zero is the empty argument.
    BigUint(u128),
    /// A 32-byte address, sent as the hex of its bytes.
    Address(Address),
}

impl Argument {
    /// The hex form that goes between the `@` separators.
    pub fn to_hex(&self) -> String {
        match self {
            Argument::Utf8(s) => hex::encode(s.as_bytes()),
            Argument::Bytes(b) => hex::encode(b),
            Argument::Bool(true) => "01".to_string(),
            Argument::Bool(false) => String::new(),
            Argument::BigUint(v) => encode_biguint(*v),
            Argument::Address(a) => a.to_hex(),
        }
    }
}

fn encode_biguint(value: u128) -> String {
    if value == 0 {
        return String::new();
    }
    let digits = format!("{value:x}");
    if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits
    }
}

impl From<&str> for Argument {
    fn from(s: &str) -> Self {
        Argument::Utf8(s.to_string())
    }
}

impl From<String> for Argument {
    fn from(s: String) -> Self {
        Argument::Utf8(s)
    }
}

impl From<bool> for Argument {
    fn from(b: bool) -> Self {
        Argument::Bool(b)
    }
}

impl From<u64> for Argument {
    fn from(v: u64) -> Self {
        Argument::BigUint(u128::from(v))
    }
}

impl From<u128> for Argument {
    fn from(v: u128) -> Self {
        Argument::BigUint(v)
    }
}

impl From<Address> for Argument {
    fn from(a: Address) -> Self {
        Argument::Address(a)
    }
}

impl From<Vec<u8>> for Argument {
    fn from(b: Vec<u8>) -> Self {
        Argument::Bytes(b)
    }
}

// ---------------------------------------------------------------------------
// CodeMetadata
// ---------------------------------------------------------------------------

/// Deployment flags stored alongside contract code.
///
/// Two bytes on the wire: `upgradeable = 0x0100`, `readable = 0x0400`,
/// `payable = 0x0002`, `payable_by_sc = 0x0004`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeMetadata {
    pub upgradeable: bool,
    pub readable: bool,
    pub payable: bool,
    pub payable_by_sc: bool,
}

impl Default for CodeMetadata {
    fn default() -> Self {
        Self {
            upgradeable: true,
            readable: true,
            payable: false,
            payable_by_sc: false,
        }
    }
}

impl CodeMetadata {
    /// Everything enabled.
    pub fn all() -> Self {
        Self {
            upgradeable: true,
            readable: true,
            payable: true,
            payable_by_sc: true,
        }
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        let mut bytes = [0u8; 2];
        if self.upgradeable {
            bytes[0] |= 0x01;
        }
        if self.readable {
            bytes[0] |= 0x04;
        }
        if self.payable {
            bytes[1] |= 0x02;
        }
        if self.payable_by_sc {
            bytes[1] |= 0x04;
        }
        bytes
    }
}

impl fmt::Display for CodeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_is_hex_of_bytes() {
        assert_eq!(
            Argument::from("Increase user limits").to_hex(),
            "496e6372656173652075736572206c696d697473"
        );
        assert_eq!(Argument::from("").to_hex(), "");
    }

    #[test]
    fn bools() {
        assert_eq!(Argument::Bool(true).to_hex(), "01");
        assert_eq!(Argument::Bool(false).to_hex(), "");
    }

    #[test]
    fn integers_are_minimal_big_endian() {
        assert_eq!(Argument::from(0u64).to_hex(), "");
        assert_eq!(Argument::from(1u64).to_hex(), "01");
        assert_eq!(Argument::from(255u64).to_hex(), "ff");
        assert_eq!(Argument::from(256u64).to_hex(), "0100");
        assert_eq!(Argument::from(10_000_000u64).to_hex(), "989680");
        assert_eq!(
            Argument::from(u128::MAX).to_hex(),
            "ffffffffffffffffffffffffffffffff"
        );
    }

    #[test]
    fn addresses_are_raw_hex() {
        let addr = Address::from_bytes([0xAB; 32]);
        assert_eq!(Argument::from(addr).to_hex(), "ab".repeat(32));
    }

    #[test]
    fn code_metadata_bytes() {
        assert_eq!(CodeMetadata::default().to_string(), "0500");
        assert_eq!(CodeMetadata::all().to_string(), "0506");
        let none = CodeMetadata {
            upgradeable: false,
            readable: false,
            payable: false,
            payable_by_sc: false,
        };
        assert_eq!(none.to_string(), "0000");
    }

    #[test]
    fn argument_json_shape() {
        let json = serde_json::to_string(&Argument::BigUint(5)).unwrap();
        assert_eq!(json, r#"{"type":"biguint","value":5}"#);
    }
}
