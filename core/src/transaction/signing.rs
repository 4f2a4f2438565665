//! Transaction signing with Ed25519 keypairs.
//!
//! Signing consumes an unsigned [`Transaction`] and produces a
//! [`SignedTransaction`], a read-only pairing of the transaction and its
//! signature. There is no way to mutate a field behind a signature: go back
//! through [`SignedTransaction::into_unsigned`] and sign again.

use serde::Serialize;

use super::builder::Transaction;
use super::SigningError;
use crate::crypto::keys::{UserKeypair, UserPublicKey, UserSignature};

/// A transaction together with the sender's signature over its
/// [`Transaction::signable_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: Transaction,
    signature: UserSignature,
}

/// The JSON body `POST /transactions` expects.
#[derive(Debug, Clone, Serialize)]
pub struct WireTransaction {
    pub nonce: u64,
    pub value: String,
    pub receiver: String,
    pub sender: String,
    #[serde(rename = "gasPrice")]
    pub gas_price: u64,
    #[serde(rename = "gasLimit")]
    pub gas_limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(rename = "chainID")]
    pub chain_id: String,
    pub version: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub options: u32,
    pub signature: String,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn signature(&self) -> &UserSignature {
        &self.signature
    }

    pub fn nonce(&self) -> u64 {
        self.tx.nonce
    }

    /// Drops the signature and hands back the editable transaction.
    pub fn into_unsigned(self) -> Transaction {
        self.tx
    }

    /// Checks the signature against the sender address, which for user
    /// accounts is the public key itself.
    pub fn verify(&self) -> bool {
        let Ok(bytes) = self.tx.signable_bytes() else {
            return false;
        };
        UserPublicKey::from_bytes(*self.tx.sender.as_bytes()).verify(&bytes, &self.signature)
    }

    /// The API submission body.
    pub fn to_wire(&self) -> WireTransaction {
        let tx = &self.tx;
        WireTransaction {
            nonce: tx.nonce,
            value: tx.value.to_string(),
            receiver: tx.receiver.to_bech32(),
            sender: tx.sender.to_bech32(),
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            data: tx.data_base64(),
            chain_id: tx.chain_id.clone(),
            version: tx.version,
            options: tx.options,
            signature: self.signature.to_hex(),
        }
    }
}

/// Signs `tx` with `keypair`.
///
/// The keypair must belong to the transaction's sender; signing someone
/// else's transaction produces a signature the network would reject anyway,
/// so it is refused here.
///
/// ```rust
/// use warp_core::crypto::keys::UserKeypair;
/// use warp_core::transaction::{sign_transaction, TransactionBuilder};
///
/// let kp = UserKeypair::from_seed(&[7u8; 32]);
/// let tx = TransactionBuilder::new("D")
///     .sender(kp.address())
///     .receiver(kp.address())
///     .build()
///     .unwrap();
/// let signed = sign_transaction(tx, &kp).unwrap();
/// assert!(signed.verify());
/// ```
pub fn sign_transaction(
    tx: Transaction,
    keypair: &UserKeypair,
) -> Result<SignedTransaction, SigningError> {
    let signer = keypair.address();
    if signer != tx.sender {
        return Err(SigningError::SenderMismatch {
            sender: tx.sender,
            signer,
        });
    }
    let signable = tx.signable_bytes()?;
    let signature = keypair.sign(&signable);
    Ok(SignedTransaction { tx, signature })
}

/// Signs with a raw 32-byte secret seed.
pub fn sign_with_secret(tx: Transaction, secret: &[u8]) -> Result<SignedTransaction, SigningError> {
    let keypair = UserKeypair::from_slice(secret)?;
    sign_transaction(tx, &keypair)
}

/// Signs with a hex-encoded secret seed.
pub fn sign_with_secret_hex(
    tx: Transaction,
    secret_hex: &str,
) -> Result<SignedTransaction, SigningError> {
    let keypair = UserKeypair::from_hex(secret_hex)?;
    sign_transaction(tx, &keypair)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
