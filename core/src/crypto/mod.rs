//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers over audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for account keys and transaction signatures.
//! - **Bech32** (`bech32`) for the `erd1…` address encoding.
//!
//! Keystore-specific primitives (scrypt, AES-128-CTR, HMAC-SHA256) live in
//! [`crate::keystore`], next to the file format that needs them.
//!
//! Nothing in here rolls its own crypto. If you are tempted to, don't.

pub mod address;
pub mod keys;

pub use address::{Address, AddressError};
pub use keys::{KeyError, UserKeypair, UserPublicKey, UserSignature};
