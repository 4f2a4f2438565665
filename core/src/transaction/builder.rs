//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] assembles an unsigned [`Transaction`]. It does
//! not sign; that happens in [`super::signing`], so construction stays
//! testable without key material.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::data::{call_data, deploy_data};
use super::types::{Argument, CodeMetadata};
use super::TransactionError;
use crate::config::{estimate_gas_limit, DEFAULT_GAS_PRICE, TRANSACTION_VERSION};
use crate::crypto::address::Address;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An unsigned MultiversX transaction.
///
/// # Canonical Byte Format
///
/// [`Transaction::signable_bytes`] is the compact JSON object
///
/// ```text
/// {"nonce":7,"value":"0","receiver":"erd1…","sender":"erd1…",
///  "gasPrice":1000000000,"gasLimit":10000000,"data":"<base64>",
///  "chainID":"D","version":2}
/// ```
///
/// with fields in exactly that order. `data` is omitted when empty and
/// `options` is appended only when non-zero. The value is a decimal string
/// because it routinely exceeds 2^53.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's sequence number at the time of building.
    pub nonce: u64,
    /// EGLD amount in atomic units (10^-18).
    pub value: u128,
    pub receiver: Address,
    pub sender: Address,
    pub gas_price: u64,
    pub gas_limit: u64,
    /// Raw data field. For contract calls this is the ASCII
    /// `function@arg@arg` string.
    pub data: Vec<u8>,
    /// `D`, `T` or `1`. Signatures do not replay across chains.
    pub chain_id: String,
    pub version: u32,
    pub options: u32,
}

/// Field order here *is* the wire order. Do not sort.
#[derive(Serialize)]
struct SignableFields<'a> {
    nonce: u64,
    value: String,
    receiver: String,
    sender: String,
    #[serde(rename = "gasPrice")]
    gas_price: u64,
    #[serde(rename = "gasLimit")]
    gas_limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(rename = "chainID")]
    chain_id: &'a str,
    version: u32,
    #[serde(skip_serializing_if = "is_zero")]
    options: u32,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl Transaction {
    /// Returns the canonical bytes the signature covers.
    pub fn signable_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let fields = SignableFields {
            nonce: self.nonce,
            value: self.value.to_string(),
            receiver: self.receiver.to_bech32(),
            sender: self.sender.to_bech32(),
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            data: self.data_base64(),
            chain_id: &self.chain_id,
            version: self.version,
            options: self.options,
        };
        serde_json::to_vec(&fields).map_err(|e| TransactionError::Serialization(e.to_string()))
    }

    /// Base64 data field, `None` when empty. This is how the API carries it.
    pub fn data_base64(&self) -> Option<String> {
        if self.data.is_empty() {
            None
        } else {
            Some(BASE64.encode(&self.data))
        }
    }

    /// The data field as text, if it is UTF-8 (call data always is).
    pub fn data_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`]s.
///
/// ```rust
/// use warp_core::crypto::address::Address;
/// use warp_core::transaction::TransactionBuilder;
///
/// let alice = Address::from_bytes([1u8; 32]);
/// let dao = Address::from_bytes([2u8; 32]);
/// let tx = TransactionBuilder::new("D")
///     .sender(alice)
///     .receiver(dao)
///     .nonce(7)
///     .gas_limit(10_000_000)
///     .call("createProposal", &["Increase user limits".into()])
///     .build()
///     .unwrap();
/// assert!(tx.data_str().unwrap().starts_with("createProposal@"));
/// ```
///
/// Defaults: value 0, gas price [`DEFAULT_GAS_PRICE`], version
/// [`TRANSACTION_VERSION`], options 0, and a gas limit just large enough for
/// the data field when none is set.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    chain_id: String,
    sender: Option<Address>,
    receiver: Option<Address>,
    value: u128,
    nonce: u64,
    gas_price: u64,
    gas_limit: Option<u64>,
    data: Vec<u8>,
    version: u32,
    options: u32,
}

impl TransactionBuilder {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            sender: None,
            receiver: None,
            value: 0,
            nonce: 0,
            gas_price: DEFAULT_GAS_PRICE,
            gas_limit: None,
            data: Vec::new(),
            version: TRANSACTION_VERSION,
            options: 0,
        }
    }

    pub fn sender(mut self, address: Address) -> Self {
        self.sender = Some(address);
        self
    }

    pub fn receiver(mut self, address: Address) -> Self {
        self.receiver = Some(address);
        self
    }

    pub fn value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Raw data field.
    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Sets the data field to a contract call.
    pub fn call(self, function: &str, arguments: &[Argument]) -> Self {
        self.data(call_data(function, arguments))
    }

    /// Turns this into a deployment: deploy payload in the data field and
    /// the zero address as receiver.
    pub fn deploy(self, code: &[u8], metadata: CodeMetadata, arguments: &[Argument]) -> Self {
        self.receiver(Address::zero())
            .data(deploy_data(code, metadata, arguments))
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn options(mut self, options: u32) -> Self {
        self.options = options;
        self
    }

    /// Consumes the builder and produces an unsigned [`Transaction`].
    ///
    /// Fails if sender or receiver is missing, or if the gas limit cannot
    /// even pay for the data field.
    pub fn build(self) -> Result<Transaction, TransactionError> {
        let sender = self.sender.ok_or(TransactionError::MissingField("sender"))?;
        let receiver = self
            .receiver
            .ok_or(TransactionError::MissingField("receiver"))?;
        if self.chain_id.is_empty() {
            return Err(TransactionError::MissingField("chain_id"));
        }

        let required = estimate_gas_limit(self.data.len(), 0);
        let gas_limit = self.gas_limit.unwrap_or(required);
        if gas_limit < required {
            return Err(TransactionError::GasLimitTooLow {
                required,
                provided: gas_limit,
            });
        }

        Ok(Transaction {
            nonce: self.nonce,
            value: self.value,
            receiver,
            sender,
            gas_price: self.gas_price,
            gas_limit,
            data: self.data,
            chain_id: self.chain_id,
            version: self.version,
            options: self.options,
        })
    }
}

/// Builds a zero-value contract call in one go.
pub fn build_contract_call(
    sender: Address,
    nonce: u64,
    contract: Address,
    function: &str,
    arguments: &[Argument],
    gas_limit: u64,
    chain_id: &str,
) -> Result<Transaction, TransactionError> {
    TransactionBuilder::new(chain_id)
        .sender(sender)
        .receiver(contract)
        .nonce(nonce)
        .gas_limit(gas_limit)
        .call(function, arguments)
        .build()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th";
    const DAO: &str = "erd1qqqqqqqqqqqqqpgqkr2ygjp0luge4jfjqv8z873qreuyms4xldvs42uf9f";

    fn proposal(nonce: u64) -> Transaction {
        build_contract_call(
            ALICE.parse().unwrap(),
            nonce,
            DAO.parse().unwrap(),
            "createProposal",
            &["Increase user limits".into()],
            10_000_000,
            "D",
        )
        .unwrap()
    }

    #[test]
    fn canonical_json_is_exact() {
        let expected = concat!(
            r#"{"nonce":7,"value":"0","#,
            r#""receiver":"erd1qqqqqqqqqqqqqpgqkr2ygjp0luge4jfjqv8z873qreuyms4xldvs42uf9f","#,
            r#""sender":"erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th","#,
            r#""gasPrice":1000000000,"gasLimit":10000000,"#,
            r#""data":"Y3JlYXRlUHJvcG9zYWxANDk2ZTYzNzI2NTYxNzM2NTIwNzU3MzY1NzIyMDZjNjk2ZDY5NzQ3Mw==","#,
            r#""chainID":"D","version":2}"#
        );
        assert_eq!(
            String::from_utf8(proposal(7).signable_bytes().unwrap()).unwrap(),
            expected
        );
    }

    #[test]
    fn proposal_data_field() {
        assert_eq!(
            proposal(7).data_str(),
            Some("createProposal@496e6372656173652075736572206c696d697473")
        );
    }

    #[test]
    fn empty_data_and_zero_options_are_omitted() {
        let tx = TransactionBuilder::new("T")
            .sender(ALICE.parse().unwrap())
            .receiver(ALICE.parse().unwrap())
            .value(1_000_000_000_000_000_000)
            .build()
            .unwrap();
        let json = String::from_utf8(tx.signable_bytes().unwrap()).unwrap();
        assert!(!json.contains("\"data\""));
        assert!(!json.contains("\"options\""));
        assert!(json.contains(r#""value":"1000000000000000000""#));
        assert_eq!(tx.gas_limit, 50_000);

        let with_options = TransactionBuilder::new("T")
            .sender(ALICE.parse().unwrap())
            .receiver(ALICE.parse().unwrap())
            .options(1)
            .build()
            .unwrap();
        let json = String::from_utf8(with_options.signable_bytes().unwrap()).unwrap();
        assert!(json.ends_with(r#""version":2,"options":1}"#));
    }

    #[test]
    fn every_field_changes_the_bytes() {
        let base = proposal(7);
        let base_bytes = base.signable_bytes().unwrap();

        let mut variants = Vec::new();
        let mut t = base.clone();
        t.nonce += 1;
        variants.push(t);
        let mut t = base.clone();
        t.value = 1;
        variants.push(t);
        let mut t = base.clone();
        t.receiver = Address::zero();
        variants.push(t);
        let mut t = base.clone();
        t.sender = Address::zero();
        variants.push(t);
        let mut t = base.clone();
        t.gas_price += 1;
        variants.push(t);
        let mut t = base.clone();
        t.gas_limit += 1;
        variants.push(t);
        let mut t = base.clone();
        t.data.push(b'0');
        variants.push(t);
        let mut t = base.clone();
        t.chain_id = "T".into();
        variants.push(t);
        let mut t = base.clone();
        t.version = 1;
        variants.push(t);
        let mut t = base.clone();
        t.options = 2;
        variants.push(t);

        for v in variants {
            assert_ne!(v.signable_bytes().unwrap(), base_bytes, "{v:?}");
        }
    }

    #[test]
    fn setter_order_does_not_matter() {
        let a = TransactionBuilder::new("D")
            .sender(ALICE.parse().unwrap())
            .receiver(DAO.parse().unwrap())
            .nonce(3)
            .gas_limit(1_000_000)
            .call("vote", &[1u64.into()])
            .build()
            .unwrap();
        let b = TransactionBuilder::new("D")
            .call("vote", &[1u64.into()])
            .gas_limit(1_000_000)
            .nonce(3)
            .receiver(DAO.parse().unwrap())
            .sender(ALICE.parse().unwrap())
            .build()
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.signable_bytes().unwrap(), b.signable_bytes().unwrap());
    }

    #[test]
    fn missing_fields() {
        assert_eq!(
            TransactionBuilder::new("D")
                .receiver(Address::zero())
                .build()
                .unwrap_err(),
            TransactionError::MissingField("sender")
        );
        assert_eq!(
            TransactionBuilder::new("D")
                .sender(Address::zero())
                .build()
                .unwrap_err(),
            TransactionError::MissingField("receiver")
        );
        assert_eq!(
            TransactionBuilder::new("")
                .sender(Address::zero())
                .receiver(Address::zero())
                .build()
                .unwrap_err(),
            TransactionError::MissingField("chain_id")
        );
    }

    #[test]
    fn gas_limit_must_cover_data() {
        let err = TransactionBuilder::new("D")
            .sender(ALICE.parse().unwrap())
            .receiver(ALICE.parse().unwrap())
            .data(vec![b'x'; 100])
            .gas_limit(50_000)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            TransactionError::GasLimitTooLow {
                required: 200_000,
                provided: 50_000
            }
        );
    }

    #[test]
    fn deploy_targets_zero_address() {
        let tx = TransactionBuilder::new("D")
            .sender(ALICE.parse().unwrap())
            .gas_limit(50_000_000)
            .deploy(&[0x00, 0x61, 0x73, 0x6d], CodeMetadata::all(), &[])
            .build()
            .unwrap();
        assert_eq!(tx.receiver, Address::zero());
        assert_eq!(tx.data_str(), Some("0061736d@0500@0506"));
    }
}
