//! The network collaborator.
//!
//! Everything the pipeline needs from a node fits in three calls. The
//! production implementation is [`super::http::ApiNetworkProvider`]; tests
//! use [`super::mock::MockProvider`].

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::types::{AccountOnNetwork, TransactionOnNetwork};
use crate::crypto::address::Address;
use crate::transaction::SignedTransaction;

/// Failures talking to the network.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Connection refused, TLS failure, timeout, …
    #[error("network unreachable: {0}")]
    Transport(String),

    /// The node answered with a non-success status we have no better
    /// interpretation for.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The node refused the transaction. `reason` is the server's message.
    #[error("transaction rejected: {reason}")]
    Rejected { reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// The response did not match the expected schema.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Worth asking again: the node was unreachable, overloaded or
    /// rate limiting.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Read and write access to a MultiversX network.
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    /// Current on-chain state of an account.
    async fn get_account(&self, address: &Address) -> Result<AccountOnNetwork, ProviderError>;

    /// Submits a signed transaction and returns its hash.
    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<String, ProviderError>;

    /// Looks up a transaction, including its contract results.
    async fn get_transaction(&self, hash: &str) -> Result<TransactionOnNetwork, ProviderError>;
}

#[async_trait]
impl<P: NetworkProvider + ?Sized> NetworkProvider for Arc<P> {
    async fn get_account(&self, address: &Address) -> Result<AccountOnNetwork, ProviderError> {
        (**self).get_account(address).await
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<String, ProviderError> {
        (**self).send_transaction(tx).await
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionOnNetwork, ProviderError> {
        (**self).get_transaction(hash).await
    }
}
