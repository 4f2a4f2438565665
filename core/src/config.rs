//! # Protocol Configuration & Constants
//!
//! Every magic number the pipeline relies on lives here: gas economics,
//! keystore cost bounds, polling cadence, and the per-network endpoints.
//! If you're hardcoding a chain ID somewhere else, move it here.
//!
//! [`PipelineConfig`] bundles the tunable subset so that the CLI can load
//! overrides from a JSON file without recompiling.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Address Format
// ---------------------------------------------------------------------------

/// Bech32 human-readable prefix for MultiversX accounts.
pub const ADDRESS_HRP: &str = "erd";

/// Raw public key length behind every address.
pub const ADDRESS_LENGTH: usize = 32;

/// Smart contract addresses start with this many zero bytes. The VM reserves
/// the prefix so that user keys can never collide with contract accounts.
pub const SMART_CONTRACT_ZERO_PREFIX: usize = 8;

/// Receiver of every contract deployment: the all-zero system address.
pub const CONTRACT_DEPLOY_ADDRESS: &str =
    "erd1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq6gq4hu";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 secret seed length.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Ed25519 public key length.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Only cipher the keystore format defines.
pub const KEYSTORE_CIPHER: &str = "aes-128-ctr";

/// Only KDF the keystore format defines.
pub const KEYSTORE_KDF: &str = "scrypt";

/// Keystore versions we know how to read. Version 5 added the `kind` field.
pub const SUPPORTED_KEYSTORE_VERSIONS: &[u32] = &[4, 5];

/// The only `kind` we decrypt. Mnemonic keystores need key derivation paths,
/// which is wallet management, not signing.
pub const KEYSTORE_KIND_SECRET_KEY: &str = "secretKey";

/// Derived key length. First half decrypts, second half authenticates.
pub const DERIVED_KEY_LENGTH: usize = 32;

/// AES-128-CTR initialization vector length.
pub const KEYSTORE_IV_LENGTH: usize = 16;

/// HMAC-SHA256 output length.
pub const KEYSTORE_MAC_LENGTH: usize = 32;

/// Upper bound on scrypt `N`. 2^20 is what the hardened wallet exports use;
/// anything above is a corrupt or hostile file.
pub const SCRYPT_MAX_N: u64 = 1 << 20;

/// Upper bound on scrypt `r`.
pub const SCRYPT_MAX_R: u32 = 16;

/// Upper bound on scrypt `p`.
pub const SCRYPT_MAX_P: u32 = 16;

/// Memory ceiling for a single derivation (`128 * N * r` bytes). 256 MiB.
pub const SCRYPT_MAX_MEMORY_BYTES: u64 = 256 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Transaction Parameters
// ---------------------------------------------------------------------------

/// Gas price every network currently enforces as its minimum.
pub const DEFAULT_GAS_PRICE: u64 = 1_000_000_000;

/// Base gas cost of any transaction.
pub const MIN_GAS_LIMIT: u64 = 50_000;

/// Gas charged per byte of the data field.
pub const GAS_PER_DATA_BYTE: u64 = 1_500;

/// Transaction version that signs over the JSON form.
pub const TRANSACTION_VERSION: u32 = 2;

/// Gas limit used for DAO proposal calls.
pub const DEFAULT_PROPOSAL_GAS_LIMIT: u64 = 10_000_000;

/// Gas limit used for contract deployments. Contracts are large.
pub const DEFAULT_DEPLOY_GAS_LIMIT: u64 = 50_000_000;

/// Gas limit used for registry calls (alias registration).
pub const DEFAULT_REGISTRY_GAS_LIMIT: u64 = 10_000_000;

/// Default extra gas on top of the data cost for inscription transactions.
pub const DEFAULT_INSCRIPTION_EXECUTION_GAS: u64 = 0;

// ---------------------------------------------------------------------------
// Timing Constants
// ---------------------------------------------------------------------------

/// How often `await_outcome` asks the network about a pending hash.
/// Roughly one round on every network.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(6);

/// How long `await_outcome` keeps polling before reporting `timeout`.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Wait before a follow-up transaction in the same session, so the network
/// has observed the first one before it sees the second nonce.
pub const DEFAULT_PROPAGATION_DELAY: Duration = Duration::from_secs(30);

/// Wait between consecutive entries of a batch.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(5);

/// HTTP request timeout for the API provider.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Networks
// ---------------------------------------------------------------------------

/// Error returned when a network name is not recognized.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown network '{0}' (expected devnet, testnet or mainnet)")]
pub struct UnknownNetwork(pub String);

/// The public MultiversX networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Devnet,
    Testnet,
    Mainnet,
}

impl Network {
    /// Chain identifier that every transaction must carry.
    pub fn chain_id(&self) -> &'static str {
        match self {
            Network::Devnet => "D",
            Network::Testnet => "T",
            Network::Mainnet => "1",
        }
    }

    /// Public API base URL.
    pub fn api_url(&self) -> &'static str {
        match self {
            Network::Devnet => "https://devnet-api.multiversx.com",
            Network::Testnet => "https://testnet-api.multiversx.com",
            Network::Mainnet => "https://api.multiversx.com",
        }
    }

    /// Block explorer base URL.
    pub fn explorer_url(&self) -> &'static str {
        match self {
            Network::Devnet => "https://devnet-explorer.multiversx.com",
            Network::Testnet => "https://testnet-explorer.multiversx.com",
            Network::Mainnet => "https://explorer.multiversx.com",
        }
    }

    /// Explorer link for a transaction hash.
    pub fn transaction_url(&self, hash: &str) -> String {
        format!("{}/transactions/{}", self.explorer_url(), hash)
    }

    /// Explorer link for an account or contract.
    pub fn account_url(&self, address: &str) -> String {
        format!("{}/accounts/{}", self.explorer_url(), address)
    }

    /// Base URL of the warp viewer for this network.
    pub fn warps_url(&self) -> &'static str {
        match self {
            Network::Devnet => "https://devnet.warps.tools",
            Network::Testnet => "https://testnet.warps.tools",
            Network::Mainnet => "https://warps.tools",
        }
    }

    /// Name used on the command line and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "devnet" | "d" => Ok(Network::Devnet),
            "testnet" | "t" => Ok(Network::Testnet),
            "mainnet" | "1" => Ok(Network::Mainnet),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Configuration
// ---------------------------------------------------------------------------

/// Tunables for one pipeline session.
///
/// Durations are serialized as milliseconds so config files stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target network. Decides the chain ID stamped on every transaction.
    pub network: Network,
    /// Gas price for every transaction.
    pub gas_price: u64,
    /// Gas limit for proposal calls.
    pub proposal_gas_limit: u64,
    /// Gas limit for deployments.
    pub deploy_gas_limit: u64,
    /// Gas limit for registry calls.
    pub registry_gas_limit: u64,
    /// Execution allowance added to the data cost of an inscription.
    pub inscription_execution_gas: u64,
    /// Polling cadence while awaiting an outcome.
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,
    /// How long to wait for a terminal status.
    #[serde(with = "duration_millis")]
    pub confirmation_timeout: Duration,
    /// Delay before a follow-up transaction in the same session.
    #[serde(with = "duration_millis")]
    pub propagation_delay: Duration,
    /// Delay between batch entries.
    #[serde(with = "duration_millis")]
    pub batch_delay: Duration,
    /// Whether operations poll for a final outcome after broadcasting.
    /// Deployments always do, since the contract address is the point.
    pub await_outcome: bool,
    /// Whether a batch re-reads the account nonce after an entry fails to
    /// broadcast. When off, later entries keep the locally reserved
    /// nonces and the gap left by the failed entry stays open.
    pub resync_after_failure: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            network: Network::Devnet,
            gas_price: DEFAULT_GAS_PRICE,
            proposal_gas_limit: DEFAULT_PROPOSAL_GAS_LIMIT,
            deploy_gas_limit: DEFAULT_DEPLOY_GAS_LIMIT,
            registry_gas_limit: DEFAULT_REGISTRY_GAS_LIMIT,
            inscription_execution_gas: DEFAULT_INSCRIPTION_EXECUTION_GAS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            propagation_delay: DEFAULT_PROPAGATION_DELAY,
            batch_delay: DEFAULT_BATCH_DELAY,
            await_outcome: true,
            resync_after_failure: true,
        }
    }
}

impl PipelineConfig {
    /// Default configuration targeting the given network.
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Gas needed to carry `data_len` bytes of data plus an execution allowance.
pub fn estimate_gas_limit(data_len: usize, execution_gas: u64) -> u64 {
    MIN_GAS_LIMIT + GAS_PER_DATA_BYTE * data_len as u64 + execution_gas
}
