//! Submission and confirmation.
//!
//! `broadcast` sends once and reports the server's verdict; nothing is
//! retried here, because a resubmission needs a fresh nonce and that is the
//! caller's decision. `await_outcome` polls until the transaction is final or
//! the deadline passes, and a missed deadline is a status, not an error.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use super::outcome::TransactionOutcome;
use super::provider::{NetworkProvider, ProviderError};
use crate::config::DEFAULT_POLL_INTERVAL;
use crate::transaction::SignedTransaction;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    /// The network refused the transaction because of its nonce.
    #[error("nonce conflict: {reason}")]
    NonceConflict { reason: String },

    /// The network refused the transaction for any other reason.
    #[error("transaction rejected: {reason}")]
    TransactionRejected { reason: String },

    #[error(transparent)]
    Provider(ProviderError),
}

impl From<ProviderError> for BroadcastError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Rejected { reason } if reason.to_lowercase().contains("nonce") => {
                BroadcastError::NonceConflict { reason }
            }
            ProviderError::Rejected { reason } => BroadcastError::TransactionRejected { reason },
            other => BroadcastError::Provider(other),
        }
    }
}

/// Sends signed transactions and watches them settle.
#[derive(Debug, Clone)]
pub struct Broadcaster<P> {
    provider: P,
    poll_interval: Duration,
}

impl<P: NetworkProvider> Broadcaster<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the delay between status polls. Clamped to at least 1 ms.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Submits `tx` and returns its hash.
    pub async fn broadcast(&self, tx: &SignedTransaction) -> Result<String, BroadcastError> {
        match self.provider.send_transaction(tx).await {
            Ok(hash) => {
                tracing::info!(hash = %hash, nonce = tx.nonce(), "transaction broadcast");
                Ok(hash)
            }
            Err(e) => {
                let err = BroadcastError::from(e);
                tracing::warn!(nonce = tx.nonce(), error = %err, "broadcast failed");
                Err(err)
            }
        }
    }

    /// Polls `hash` until it is final or `timeout` elapses.
    ///
    /// A hash the node does not know yet counts as pending, as do transport
    /// hiccups and server-side (5xx, 429) answers. A response that does not
    /// decode is an error. A timeout too large to represent as an instant
    /// polls without a deadline.
    pub async fn await_outcome(
        &self,
        hash: &str,
        timeout: Duration,
    ) -> Result<TransactionOutcome, BroadcastError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut polls = 0u32;

        loop {
            polls += 1;
            match self.provider.get_transaction(hash).await {
                Ok(tx) if tx.status.is_final() => {
                    let outcome = TransactionOutcome::from_network(hash, &tx)?;
                    tracing::info!(hash, status = %outcome.status, polls, "transaction final");
                    return Ok(outcome);
                }
                Ok(tx) => {
                    tracing::debug!(hash, status = %tx.status, polls, "still pending");
                }
                Err(ProviderError::NotFound(_)) => {
                    tracing::debug!(hash, polls, "not indexed yet");
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(hash, polls, error = %e, "poll failed, retrying");
                }
                Err(e) => return Err(e.into()),
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::warn!(hash, polls, ?timeout, "gave up waiting for outcome");
                        return Ok(TransactionOutcome::timed_out(hash));
                    }
                    self.poll_interval.min(deadline - now)
                }
                None => self.poll_interval,
            };
            tokio::time::sleep(pause).await;
        }
    }
}
