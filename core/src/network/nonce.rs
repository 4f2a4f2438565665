//! Local nonce bookkeeping for one account.
//!
//! [`AccountNonceTracker::sync`] takes the network's word for the nonce;
//! [`AccountNonceTracker::next`] hands out the current value and bumps it
//! locally, so several transactions can be built back to back without
//! waiting for each to land.
//!
//! Callers build against [`AccountNonceTracker::peek`] and call `next()`
//! once the transaction exists, so a transaction that never got built
//! leaves no gap. A nonce handed out by `next()` is spent, even if the
//! transaction carrying it never reaches the network. The tracker does not
//! roll back. Callers that want to recover from a failed broadcast call
//! `sync()` again.
//!
//! Both methods take `&mut self`: one tracker, one writer.

use thiserror::Error;

use super::provider::{NetworkProvider, ProviderError};
use crate::crypto::address::Address;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NonceError {
    #[error("nonce tracker for {0} has not been synchronized with the network")]
    NotSynchronized(Address),

    #[error("nonce overflow")]
    Overflow,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Hands out sequential nonces for a single account.
#[derive(Debug, Clone)]
pub struct AccountNonceTracker {
    address: Address,
    nonce: Option<u64>,
}

impl AccountNonceTracker {
    /// A tracker that must be synced before use.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            nonce: None,
        }
    }

    /// A tracker starting from a known nonce.
    pub fn starting_at(address: Address, nonce: u64) -> Self {
        Self {
            address,
            nonce: Some(nonce),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The nonce the next transaction will get, if known.
    pub fn current(&self) -> Option<u64> {
        self.nonce
    }

    /// Fetches the account from the network and adopts its nonce,
    /// discarding whatever was tracked locally.
    pub async fn sync<P: NetworkProvider + ?Sized>(
        &mut self,
        provider: &P,
    ) -> Result<u64, NonceError> {
        let account = provider.get_account(&self.address).await?;
        if let Some(local) = self.nonce {
            if local != account.nonce {
                tracing::debug!(
                    address = %self.address,
                    local,
                    network = account.nonce,
                    "local nonce replaced by network nonce"
                );
            }
        }
        self.nonce = Some(account.nonce);
        Ok(account.nonce)
    }

    /// The nonce the next transaction will get, without reserving it.
    pub fn peek(&self) -> Result<u64, NonceError> {
        self.nonce.ok_or(NonceError::NotSynchronized(self.address))
    }

    /// Returns the current nonce and advances the local counter.
    pub fn next(&mut self) -> Result<u64, NonceError> {
        let current = self.nonce.ok_or(NonceError::NotSynchronized(self.address))?;
        let advanced = current.checked_add(1).ok_or(NonceError::Overflow)?;
        self.nonce = Some(advanced);
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mock::MockProvider;

    fn addr() -> Address {
        Address::from_bytes([7u8; 32])
    }

    #[tokio::test]
    async fn three_nexts_after_sync() {
        let mock = MockProvider::new().with_account(addr(), 41);
        let mut tracker = AccountNonceTracker::new(addr());

        assert_eq!(tracker.sync(&mock).await.unwrap(), 41);
        assert_eq!(tracker.next().unwrap(), 41);
        assert_eq!(tracker.next().unwrap(), 42);
        assert_eq!(tracker.next().unwrap(), 43);
        assert_eq!(tracker.current(), Some(44));
        assert_eq!(mock.account_queries(), 1);
    }

    #[test]
    fn next_before_sync_fails() {
        let mut tracker = AccountNonceTracker::new(addr());
        assert_eq!(
            tracker.next().unwrap_err(),
            NonceError::NotSynchronized(addr())
        );
    }

    #[tokio::test]
    async fn sync_overwrites_local_value() {
        let mock = MockProvider::new().with_account(addr(), 5);
        let mut tracker = AccountNonceTracker::starting_at(addr(), 100);
        tracker.next().unwrap();
        assert_eq!(tracker.sync(&mock).await.unwrap(), 5);
        assert_eq!(tracker.next().unwrap(), 5);
    }

    #[test]
    fn spent_nonces_are_not_returned() {
        // A nonce handed out for a transaction that was never sent stays
        // spent; the gap is only closed by a sync.
        let mut tracker = AccountNonceTracker::starting_at(addr(), 9);
        let _abandoned = tracker.next().unwrap();
        assert_eq!(tracker.next().unwrap(), 10);
    }

    #[test]
    fn peek_does_not_advance() {
        let mut tracker = AccountNonceTracker::starting_at(addr(), 3);
        assert_eq!(tracker.peek().unwrap(), 3);
        assert_eq!(tracker.peek().unwrap(), 3);
        assert_eq!(tracker.next().unwrap(), 3);
        assert_eq!(tracker.peek().unwrap(), 4);
        assert_eq!(
            AccountNonceTracker::new(addr()).peek().unwrap_err(),
            NonceError::NotSynchronized(addr())
        );
    }

    #[test]
    fn overflow_is_an_error() {
        let mut tracker = AccountNonceTracker::starting_at(addr(), u64::MAX);
        assert_eq!(tracker.next().unwrap_err(), NonceError::Overflow);
        assert_eq!(tracker.current(), Some(u64::MAX));
    }

    #[tokio::test]
    async fn sync_propagates_provider_errors() {
        let mock = MockProvider::new();
        mock.set_offline(true);
        let mut tracker = AccountNonceTracker::new(addr());
        assert!(matches!(
            tracker.sync(&mock).await,
            Err(NonceError::Provider(ProviderError::Transport(_)))
        ));
        assert_eq!(tracker.current(), None);
    }
}
