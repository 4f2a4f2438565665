//! # Network Layer
//!
//! Everything that talks to a MultiversX node, and the bookkeeping that has
//! to stay in step with it.
//!
//! ```text
//! provider.rs     — NetworkProvider trait (get_account, send_transaction, get_transaction)
//! http.rs         — ApiNetworkProvider: the trait over the public REST API (reqwest)
//! mock.rs         — MockProvider: in-memory network for tests and dry runs
//! types.rs        — Response schemas
//! nonce.rs        — AccountNonceTracker
//! broadcaster.rs  — Broadcaster: submit, then poll for a final status
//! outcome.rs      — TransactionOutcome parsing (deployed contracts, return data, errors)
//! ```

pub mod broadcaster;
pub mod http;
pub mod mock;
pub mod nonce;
pub mod outcome;
pub mod provider;
pub mod types;

pub use broadcaster::{BroadcastError, Broadcaster};
pub use http::ApiNetworkProvider;
pub use mock::{MockProvider, ScriptedOutcome};
pub use nonce::{AccountNonceTracker, NonceError};
pub use outcome::{OutcomeEvent, OutcomeStatus, TransactionOutcome};
pub use provider::{NetworkProvider, ProviderError};
pub use types::{AccountOnNetwork, NetworkStatus, TransactionOnNetwork};
