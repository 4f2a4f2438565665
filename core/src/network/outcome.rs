//! Turning raw network transactions into typed outcomes.
//!
//! Deploys are recognized by their `SCDeploy` event (whose address is the new
//! contract), failures by `signalError`/`internalVMErrors`, and return values
//! by the first contract result whose data looks like `@<code>@<value>…`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::provider::ProviderError;
use super::types::{NetworkStatus, TransactionOnNetwork};
use crate::crypto::address::Address;

const SC_DEPLOY_EVENT: &str = "SCDeploy";
const SIGNAL_ERROR_EVENT: &str = "signalError";
const INTERNAL_VM_ERRORS_EVENT: &str = "internalVMErrors";

/// Where a transaction ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Pending,
    Success,
    Failed,
    Invalid,
    /// Still not final when the caller's deadline passed. The transaction may
    /// yet complete; poll again to find out.
    Timeout,
}

impl OutcomeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeStatus::Success)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeStatus::Pending => "pending",
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Invalid => "invalid",
            OutcomeStatus::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// A log event with decoded topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEvent {
    pub identifier: String,
    pub address: String,
    #[serde(with = "hex_list")]
    pub topics: Vec<Vec<u8>>,
}

/// The parsed result of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub hash: String,
    pub status: OutcomeStatus,
    pub events: Vec<OutcomeEvent>,
    /// Contracts created by this transaction, in event order.
    pub deployed_contracts: Vec<Address>,
    /// Return code of the first contract result (`ok`, `user error`, …).
    pub return_code: Option<String>,
    /// Values returned by the contract, raw bytes.
    #[serde(with = "hex_list")]
    pub return_data: Vec<Vec<u8>>,
    /// Error message reported by the VM, if any.
    pub error: Option<String>,
}

impl TransactionOutcome {
    /// The outcome reported when polling gives up.
    pub fn timed_out(hash: impl Into<String>) -> Self {
        Self::empty(hash.into(), OutcomeStatus::Timeout)
    }

    fn empty(hash: String, status: OutcomeStatus) -> Self {
        Self {
            hash,
            status,
            events: Vec::new(),
            deployed_contracts: Vec::new(),
            return_code: None,
            return_data: Vec::new(),
            error: None,
        }
    }

    /// Parses a network transaction. `hash` is used when the response does
    /// not echo it back.
    pub fn from_network(hash: &str, tx: &TransactionOnNetwork) -> Result<Self, ProviderError> {
        let status = match tx.status {
            NetworkStatus::Success => OutcomeStatus::Success,
            NetworkStatus::Fail => OutcomeStatus::Failed,
            NetworkStatus::Invalid => OutcomeStatus::Invalid,
            NetworkStatus::Pending | NetworkStatus::Unknown => OutcomeStatus::Pending,
        };
        let hash = if tx.hash.is_empty() { hash } else { &tx.hash };
        let mut outcome = Self::empty(hash.to_string(), status);

        for event in tx.all_events() {
            let topics = event
                .topics
                .iter()
                .map(|t| decode_base64(t))
                .collect::<Result<Vec<_>, _>>()?;

            match event.identifier.as_str() {
                SC_DEPLOY_EVENT => {
                    let address = Address::from_bech32(&event.address)
                        .map_err(|e| ProviderError::Decode(format!("SCDeploy address: {e}")))?;
                    outcome.deployed_contracts.push(address);
                }
                SIGNAL_ERROR_EVENT | INTERNAL_VM_ERRORS_EVENT if outcome.error.is_none() => {
                    outcome.error = Some(error_message(&topics, event.data.as_deref()));
                }
                _ => {}
            }

            outcome.events.push(OutcomeEvent {
                identifier: event.identifier.clone(),
                address: event.address.clone(),
                topics,
            });
        }

        if let Some((code, values)) = first_return_data(tx)? {
            outcome.return_code = Some(code);
            outcome.return_data = values;
        }

        if outcome.error.is_none() && status == OutcomeStatus::Failed {
            outcome.error = tx
                .results
                .iter()
                .find_map(|r| r.return_message.clone())
                .or_else(|| Some("transaction failed".to_string()));
        }

        Ok(outcome)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The first deployed contract, for deploy transactions.
    pub fn contract_address(&self) -> Option<Address> {
        self.deployed_contracts.first().copied()
    }
}

fn decode_base64(s: &str) -> Result<Vec<u8>, ProviderError> {
    BASE64
        .decode(s)
        .map_err(|e| ProviderError::Decode(format!("invalid base64 '{s}': {e}")))
}

/// `signalError` puts the message in topic 1; some node versions put it in
/// the event data instead.
fn error_message(topics: &[Vec<u8>], data: Option<&str>) -> String {
    if let Some(msg) = topics.get(1).filter(|t| !t.is_empty()) {
        return String::from_utf8_lossy(msg).into_owned();
    }
    data.and_then(|d| BASE64.decode(d).ok())
        .map(|d| String::from_utf8_lossy(&d).into_owned())
        .unwrap_or_else(|| "execution failed".to_string())
}

fn first_return_data(
    tx: &TransactionOnNetwork,
) -> Result<Option<(String, Vec<Vec<u8>>)>, ProviderError> {
    for result in &tx.results {
        let Some(data) = result.data.as_deref() else {
            continue;
        };
        let raw = decode_base64(data)?;
        let Ok(text) = std::str::from_utf8(&raw) else {
            continue;
        };
        let Some(rest) = text.strip_prefix('@') else {
            continue;
        };

        let mut parts = rest.split('@');
        let code_hex = parts.next().unwrap_or_default();
        let code = hex::decode(code_hex)
            .map_err(|e| ProviderError::Decode(format!("return code '{code_hex}': {e}")))?;
        let values = parts
            .map(|p| {
                hex::decode(p)
                    .map_err(|e| ProviderError::Decode(format!("return value '{p}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Some((String::from_utf8_lossy(&code).into_owned(), values)));
    }
    Ok(None)
}

mod hex_list {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(items.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(d)?
            .into_iter()
            .map(|h| hex::decode(h).map_err(serde::de::Error::custom))
            .collect()
    }
}
