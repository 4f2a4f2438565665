//! An in-memory network for tests and dry runs.
//!
//! [`MockProvider`] keeps per-account nonces, accepts transactions whose
//! nonce matches, and reports outcomes scripted ahead of time. Clones share
//! state, so a test can keep a handle while the pipeline owns another.

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::provider::{NetworkProvider, ProviderError};
use super::types::{AccountOnNetwork, NetworkStatus, TransactionOnNetwork};
use crate::crypto::address::Address;
use crate::transaction::SignedTransaction;

/// What the mock reports for the next accepted transaction.
#[derive(Debug, Clone)]
pub struct ScriptedOutcome {
    /// Number of `get_transaction` calls answered with `pending` first.
    /// `usize::MAX` never finalizes.
    pub pending_polls: usize,
    /// The final answer. Its hash is overwritten with the real one.
    pub result: TransactionOnNetwork,
}

impl ScriptedOutcome {
    pub fn success() -> Self {
        Self {
            pending_polls: 0,
            result: TransactionOnNetwork {
                hash: String::new(),
                status: NetworkStatus::Success,
                logs: None,
                results: Vec::new(),
            },
        }
    }

    pub fn never_final() -> Self {
        Self {
            pending_polls: usize::MAX,
            ..Self::success()
        }
    }

    pub fn after_polls(mut self, pending_polls: usize) -> Self {
        self.pending_polls = pending_polls;
        self
    }

    pub fn with_result(result: TransactionOnNetwork) -> Self {
        Self {
            pending_polls: 0,
            result,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    accounts: HashMap<Address, AccountOnNetwork>,
    sent: Vec<SignedTransaction>,
    rejections: VecDeque<String>,
    poll_failures: VecDeque<ProviderError>,
    scripted: VecDeque<ScriptedOutcome>,
    transactions: HashMap<String, (usize, TransactionOnNetwork)>,
    account_queries: usize,
    transaction_queries: usize,
    offline: bool,
}

/// Scriptable in-memory [`NetworkProvider`].
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account with an on-chain nonce.
    pub fn with_account(self, address: Address, nonce: u64) -> Self {
        self.set_nonce(address, nonce);
        self
    }

    /// Overwrites an account's on-chain nonce (e.g. to simulate a
    /// transaction sent from another machine).
    pub fn set_nonce(&self, address: Address, nonce: u64) {
        let mut state = self.state.lock();
        let account = state
            .accounts
            .entry(address)
            .or_insert_with(|| AccountOnNetwork {
                address,
                nonce: 0,
                balance: "0".into(),
            });
        account.nonce = nonce;
    }

    /// The next `send_transaction` fails with `reason`, without consuming
    /// the nonce.
    pub fn reject_next(&self, reason: impl Into<String>) {
        self.state.lock().rejections.push_back(reason.into());
    }

    /// Outcome for the next accepted transaction. Unscripted transactions
    /// succeed immediately.
    pub fn push_outcome(&self, outcome: ScriptedOutcome) {
        self.state.lock().scripted.push_back(outcome);
    }

    /// Registers a transaction that was sent outside this mock.
    pub fn insert_transaction(&self, hash: impl Into<String>, outcome: ScriptedOutcome) {
        let hash = hash.into();
        let mut result = outcome.result;
        result.hash = hash.clone();
        self.state
            .lock()
            .transactions
            .insert(hash, (outcome.pending_polls, result));
    }

    /// The next `get_transaction` call fails with `error`. Queued failures
    /// are served in order, one per call.
    pub fn fail_next_poll(&self, error: ProviderError) {
        self.state.lock().poll_failures.push_back(error);
    }

    /// Every call fails with a transport error while offline.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Transactions accepted so far, in order.
    pub fn sent(&self) -> Vec<SignedTransaction> {
        self.state.lock().sent.clone()
    }

    pub fn account_queries(&self) -> usize {
        self.state.lock().account_queries
    }

    pub fn transaction_queries(&self) -> usize {
        self.state.lock().transaction_queries
    }

    fn hash_of(tx: &SignedTransaction) -> String {
        let mut hasher = Sha256::new();
        hasher.update(tx.signature().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl NetworkProvider for MockProvider {
    async fn get_account(&self, address: &Address) -> Result<AccountOnNetwork, ProviderError> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(ProviderError::Transport("mock network offline".into()));
        }
        state.account_queries += 1;
        Ok(state
            .accounts
            .get(address)
            .cloned()
            .unwrap_or_else(|| AccountOnNetwork {
                address: *address,
                nonce: 0,
                balance: "0".into(),
            }))
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<String, ProviderError> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(ProviderError::Transport("mock network offline".into()));
        }
        if let Some(reason) = state.rejections.pop_front() {
            return Err(ProviderError::Rejected { reason });
        }
        if !tx.verify() {
            return Err(ProviderError::Rejected {
                reason: "invalid signature".into(),
            });
        }

        let sender = tx.transaction().sender;
        let expected = state.accounts.get(&sender).map(|a| a.nonce).unwrap_or(0);
        let nonce = tx.nonce();
        if nonce < expected {
            return Err(ProviderError::Rejected {
                reason: format!("lowerNonceInTx: tx nonce {nonce}, account nonce {expected}"),
            });
        }
        if nonce > expected {
            return Err(ProviderError::Rejected {
                reason: format!("higherNonceInTx: tx nonce {nonce}, account nonce {expected}"),
            });
        }

        let hash = Self::hash_of(tx);
        let scripted = state
            .scripted
            .pop_front()
            .unwrap_or_else(ScriptedOutcome::success);
        let mut result = scripted.result;
        result.hash = hash.clone();

        state
            .accounts
            .entry(sender)
            .or_insert_with(|| AccountOnNetwork {
                address: sender,
                nonce: 0,
                balance: "0".into(),
            })
            .nonce = nonce + 1;
        state
            .transactions
            .insert(hash.clone(), (scripted.pending_polls, result));
        state.sent.push(tx.clone());
        Ok(hash)
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionOnNetwork, ProviderError> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(ProviderError::Transport("mock network offline".into()));
        }
        state.transaction_queries += 1;
        if let Some(error) = state.poll_failures.pop_front() {
            return Err(error);
        }
        let (pending, result) = state
            .transactions
            .get_mut(hash)
            .ok_or_else(|| ProviderError::NotFound(hash.to_string()))?;
        if *pending > 0 {
            if *pending != usize::MAX {
                *pending -= 1;
            }
            return Ok(TransactionOnNetwork::pending(hash));
        }
        Ok(result.clone())
    }
}
