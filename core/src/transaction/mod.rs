//! # Transaction Module
//!
//! Construction and signing of MultiversX transactions.
//!
//! ## Architecture
//!
//! ```text
//! types.rs    — Typed call arguments and deployment code metadata
//! data.rs     — Data-field encoders (contract calls, deployments)
//! builder.rs  — Transaction + fluent TransactionBuilder + canonical bytes
//! signing.rs  — Ed25519 signing into a read-only SignedTransaction
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Build**: [`TransactionBuilder`] assembles the fields, the nonce comes
//!    from [`crate::network::AccountNonceTracker`].
//! 2. **Sign**: [`sign_transaction`] with the sender's keypair.
//! 3. **Broadcast**: [`crate::network::Broadcaster`].

pub mod builder;
pub mod data;
pub mod signing;
pub mod types;

pub use builder::{build_contract_call, Transaction, TransactionBuilder};
pub use signing::{
    sign_transaction, sign_with_secret, sign_with_secret_hex, SignedTransaction, WireTransaction,
};
pub use types::{Argument, CodeMetadata};

use thiserror::Error;

use crate::crypto::address::Address;
use crate::crypto::keys::KeyError;

/// Errors from building a transaction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("gas limit {provided} is below the {required} the data field needs")]
    GasLimitTooLow { required: u64, provided: u64 },

    #[error("failed to serialize transaction: {0}")]
    Serialization(String),
}

/// Errors from signing a transaction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("invalid signing key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("signer {signer} is not the transaction sender {sender}")]
    SenderMismatch { sender: Address, signer: Address },

    #[error(transparent)]
    Encoding(#[from] TransactionError),
}
