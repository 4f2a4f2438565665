//! Response schemas of the MultiversX API.
//!
//! Only the fields the pipeline reads are modelled. Unknown fields are
//! ignored; missing required fields are a decode error, never a silent
//! default.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::address::Address;

/// `GET /accounts/{address}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOnNetwork {
    pub address: Address,
    pub nonce: u64,
    /// Atomic units as a decimal string.
    #[serde(default)]
    pub balance: String,
}

/// `POST /transactions` success body.
#[derive(Debug, Clone, Deserialize)]
pub struct SendTransactionResponse {
    #[serde(rename = "txHash")]
    pub tx_hash: String,
}

/// Error body the API returns with 4xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error: String,
    #[serde(default, rename = "statusCode")]
    pub status_code: Option<u16>,
}

/// Status string reported by the API (and, under older names, the gateway).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkStatus {
    #[serde(alias = "received", alias = "partially-executed")]
    Pending,
    #[serde(alias = "executed")]
    Success,
    #[serde(alias = "failed")]
    Fail,
    Invalid,
    #[serde(other)]
    Unknown,
}

impl NetworkStatus {
    /// `true` once the status can no longer change.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            NetworkStatus::Success | NetworkStatus::Fail | NetworkStatus::Invalid
        )
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkStatus::Pending => "pending",
            NetworkStatus::Success => "success",
            NetworkStatus::Fail => "fail",
            NetworkStatus::Invalid => "invalid",
            NetworkStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One log event. Topics are base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOnNetwork {
    pub address: String,
    pub identifier: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsOnNetwork {
    #[serde(default)]
    pub events: Vec<EventOnNetwork>,
}

/// A smart contract result. `data` is base64 of `@<code>@<value>…`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractResultOnNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, rename = "returnMessage", skip_serializing_if = "Option::is_none")]
    pub return_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<LogsOnNetwork>,
}

/// `GET /transactions/{hash}?withResults=true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOnNetwork {
    #[serde(rename = "txHash", default)]
    pub hash: String,
    pub status: NetworkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<LogsOnNetwork>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ContractResultOnNetwork>,
}

impl TransactionOnNetwork {
    pub fn pending(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            status: NetworkStatus::Pending,
            logs: None,
            results: Vec::new(),
        }
    }

    /// Events from the transaction and from all of its contract results.
    pub fn all_events(&self) -> impl Iterator<Item = &EventOnNetwork> {
        self.logs
            .iter()
            .flat_map(|l| l.events.iter())
            .chain(
                self.results
                    .iter()
                    .filter_map(|r| r.logs.as_ref())
                    .flat_map(|l| l.events.iter()),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_api_transaction() {
        let json = r#"{
            "txHash": "abc",
            "status": "success",
            "gasUsed": 123,
            "logs": {"address": "erd1x", "events": [
                {"address": "erd1qqqqqqqqqqqqqpgqkr2ygjp0luge4jfjqv8z873qreuyms4xldvs42uf9f",
                 "identifier": "SCDeploy",
                 "topics": ["AAAAAAAAAAAFALDUREgv/xGayTIDDiP6IB54TcKm+1k="]}
            ]},
            "results": [{"data": "QDZmNmI=", "nonce": 8}]
        }"#;
        let tx: TransactionOnNetwork = serde_json::from_str(json).unwrap();
        assert_eq!(tx.status, NetworkStatus::Success);
        assert_eq!(tx.all_events().count(), 1);
        assert_eq!(tx.results[0].data.as_deref(), Some("QDZmNmI="));
    }

    #[test]
    fn gateway_status_names() {
        let s: NetworkStatus = serde_json::from_str("\"executed\"").unwrap();
        assert_eq!(s, NetworkStatus::Success);
        let s: NetworkStatus = serde_json::from_str("\"received\"").unwrap();
        assert_eq!(s, NetworkStatus::Pending);
        let s: NetworkStatus = serde_json::from_str("\"rewardsDistributed\"").unwrap();
        assert_eq!(s, NetworkStatus::Unknown);
        assert!(!NetworkStatus::Pending.is_final());
        assert!(NetworkStatus::Invalid.is_final());
    }

    #[test]
    fn account_requires_nonce() {
        let ok: AccountOnNetwork = serde_json::from_str(
            r#"{"address":"erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th","nonce":42,"balance":"1000"}"#,
        )
        .unwrap();
        assert_eq!(ok.nonce, 42);

        let missing = serde_json::from_str::<AccountOnNetwork>(
            r#"{"address":"erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th"}"#,
        );
        assert!(missing.is_err());
    }
}
