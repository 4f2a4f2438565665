//! # Transaction Pipeline
//!
//! One signing session for one account:
//!
//! ```text
//! load keystore → decrypt → sync nonce → build → sign → broadcast → await outcome
//! ```
//!
//! [`TransactionPipeline::open`] covers the first two steps and never touches
//! the network, so a wrong password or a damaged keystore fails before any
//! request is made. Every operation after that runs the remaining steps and
//! reports failures as a [`PipelineError`] naming the phase.
//!
//! Single-call operations (`execute`, `create_proposal`, `deploy_contract`)
//! sync the nonce from the network first. Operations that send several
//! transactions (`publish_with_alias`, `create_proposals`) sync once and take
//! follow-up nonces from the local tracker.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::{estimate_gas_limit, Network, PipelineConfig};
use crate::crypto::address::Address;
use crate::keystore::{DecryptedIdentity, Keystore, KeystoreDecryptor, KeystoreError};
use crate::network::{
    AccountNonceTracker, BroadcastError, Broadcaster, NetworkProvider, NonceError,
    TransactionOutcome,
};
use crate::transaction::{
    sign_transaction, Argument, CodeMetadata, SigningError, TransactionBuilder, TransactionError,
};

/// Endpoint name of the DAO contract's proposal entry point.
pub const CREATE_PROPOSAL_FUNCTION: &str = "createProposal";

/// Endpoint name of the warp alias registry.
pub const REGISTER_ALIAS_FUNCTION: &str = "registerAlias";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The step of the pipeline an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Load,
    Decrypt,
    Sync,
    Build,
    Sign,
    Broadcast,
    Confirm,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Load => "load",
            Phase::Decrypt => "decrypt",
            Phase::Sync => "sync",
            Phase::Build => "build",
            Phase::Sign => "sign",
            Phase::Broadcast => "broadcast",
            Phase::Confirm => "confirm",
        })
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("load failed: {0}")]
    Load(#[source] KeystoreError),

    #[error("decrypt failed: {0}")]
    Decrypt(#[source] KeystoreError),

    #[error("sync failed: {0}")]
    Sync(#[source] NonceError),

    #[error("build failed: {0}")]
    Build(#[source] TransactionError),

    #[error("sign failed: {0}")]
    Sign(#[source] SigningError),

    #[error("broadcast failed: {0}")]
    Broadcast(#[source] BroadcastError),

    #[error("confirm failed: {0}")]
    Confirm(#[source] BroadcastError),
}

impl PipelineError {
    pub fn phase(&self) -> Phase {
        match self {
            PipelineError::Load(_) => Phase::Load,
            PipelineError::Decrypt(_) => Phase::Decrypt,
            PipelineError::Sync(_) => Phase::Sync,
            PipelineError::Build(_) => Phase::Build,
            PipelineError::Sign(_) => Phase::Sign,
            PipelineError::Broadcast(_) => Phase::Broadcast,
            PipelineError::Confirm(_) => Phase::Confirm,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A transaction the network accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub hash: String,
    pub nonce: u64,
    pub explorer_url: String,
    /// Present when the pipeline waited for the transaction to settle.
    pub outcome: Option<TransactionOutcome>,
}

impl Submission {
    /// False only when an outcome was awaited and it was not a success.
    pub fn succeeded(&self) -> bool {
        self.outcome.as_ref().map_or(true, |o| o.is_success())
    }
}

/// Result of [`TransactionPipeline::deploy_contract`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deployment {
    pub submission: Submission,
    /// Missing when the deploy failed or did not settle in time.
    pub contract: Option<Address>,
}

/// Where a published warp should also be registered under a readable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRequest {
    pub alias: String,
    pub registry: Address,
    /// Registration fee paid to the registry, in the smallest unit.
    pub fee: u128,
}

/// Result of [`TransactionPipeline::publish_with_alias`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publication {
    pub inscription: Submission,
    pub warp_url: String,
    pub alias: Option<AliasRegistration>,
    /// Warp link per requested recipient (bech32), with the recipient
    /// pre-filled as `to`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub recipient_links: BTreeMap<String, String>,
}

/// `warp_url` with `params` appended as URL-encoded query parameters.
pub fn warp_link(warp_url: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return warp_url.to_string();
    }
    match reqwest::Url::parse(warp_url) {
        Ok(mut url) => {
            url.query_pairs_mut().extend_pairs(params);
            url.to_string()
        }
        Err(e) => {
            tracing::warn!(warp_url, error = %e, "cannot add query parameters to warp link");
            warp_url.to_string()
        }
    }
}

/// Outcome of the alias step. A failed registration does not undo the
/// inscription; it is reported here instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasRegistration {
    pub alias: String,
    pub alias_url: String,
    pub submission: Option<Submission>,
    pub error: Option<String>,
}

/// One line of a proposal batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchEntry {
    pub index: usize,
    pub description: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a proposal batch, written next to the input by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub timestamp: DateTime<Utc>,
    pub contract: Address,
    pub network: Network,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchEntry>,
}

/// Proposal descriptions from a batch file: one per line, trimmed, with
/// blank lines and `#` comments dropped.
pub fn parse_batch_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// TransactionPipeline
// ---------------------------------------------------------------------------

/// A decrypted identity bound to a network provider.
///
/// The key material lives as long as the pipeline and is wiped when it is
/// dropped.
pub struct TransactionPipeline<P> {
    identity: DecryptedIdentity,
    tracker: AccountNonceTracker,
    broadcaster: Broadcaster<P>,
    config: PipelineConfig,
}

impl<P> fmt::Debug for TransactionPipeline<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionPipeline")
            .field("address", &self.identity.address())
            .field("nonce", &self.tracker.current())
            .field("network", &self.config.network)
            .finish_non_exhaustive()
    }
}

impl<P: NetworkProvider> TransactionPipeline<P> {
    /// Loads and decrypts the keystore at `path`.
    pub async fn open(
        path: impl AsRef<Path>,
        password: Zeroizing<String>,
        provider: P,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "loading keystore");
        let keystore = Keystore::load(path).await.map_err(PipelineError::Load)?;
        Self::from_keystore(keystore, password, provider, config).await
    }

    /// Decrypts an already parsed keystore.
    pub async fn from_keystore(
        keystore: Keystore,
        password: Zeroizing<String>,
        provider: P,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let identity = KeystoreDecryptor::new()
            .decrypt_async(keystore, password)
            .await
            .map_err(PipelineError::Decrypt)?;
        tracing::info!(address = %identity.address(), "wallet unlocked");
        Ok(Self::from_identity(identity, provider, config))
    }

    pub fn from_identity(
        identity: DecryptedIdentity,
        provider: P,
        config: PipelineConfig,
    ) -> Self {
        let broadcaster = Broadcaster::new(provider).with_poll_interval(config.poll_interval);
        Self {
            tracker: AccountNonceTracker::new(identity.address()),
            identity,
            broadcaster,
            config,
        }
    }

    pub fn address(&self) -> Address {
        self.identity.address()
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        self.broadcaster.provider()
    }

    /// The nonce the next transaction will use, if synced.
    pub fn next_nonce(&self) -> Option<u64> {
        self.tracker.current()
    }

    /// Re-reads the account nonce from the network.
    pub async fn sync_nonce(&mut self) -> Result<u64, PipelineError> {
        let nonce = self
            .tracker
            .sync(self.broadcaster.provider())
            .await
            .map_err(PipelineError::Sync)?;
        tracing::info!(address = %self.address(), nonce, "nonce synced");
        Ok(nonce)
    }

    // -- Single-call operations ---------------------------------------------

    /// Calls `function` on `contract` with the given arguments.
    pub async fn execute(
        &mut self,
        contract: Address,
        function: &str,
        arguments: &[Argument],
        gas_limit: u64,
    ) -> Result<Submission, PipelineError> {
        self.sync_nonce().await?;
        let builder = self
            .builder()
            .receiver(contract)
            .gas_limit(gas_limit)
            .call(function, arguments);
        let mut submission = self.submit(builder).await?;
        if self.config.await_outcome {
            self.confirm(&mut submission).await?;
        }
        Ok(submission)
    }

    /// Submits `createProposal@<hex(description)>` to the DAO contract.
    pub async fn create_proposal(
        &mut self,
        contract: Address,
        description: &str,
    ) -> Result<Submission, PipelineError> {
        tracing::info!(%contract, description, "creating proposal");
        self.execute(
            contract,
            CREATE_PROPOSAL_FUNCTION,
            &[Argument::from(description)],
            self.config.proposal_gas_limit,
        )
        .await
    }

    /// Deploys `code` and waits for the new contract's address.
    pub async fn deploy_contract(
        &mut self,
        code: &[u8],
        metadata: CodeMetadata,
        arguments: &[Argument],
    ) -> Result<Deployment, PipelineError> {
        self.sync_nonce().await?;
        tracing::info!(code_len = code.len(), %metadata, "deploying contract");
        let builder = self
            .builder()
            .receiver(Address::zero())
            .gas_limit(self.config.deploy_gas_limit)
            .deploy(code, metadata, arguments);
        let mut submission = self.submit(builder).await?;
        self.confirm(&mut submission).await?;

        let contract = submission
            .outcome
            .as_ref()
            .filter(|o| o.is_success())
            .and_then(TransactionOutcome::contract_address);
        match contract {
            Some(address) => tracing::info!(%address, "contract deployed"),
            None => tracing::warn!(hash = %submission.hash, "deploy produced no contract address"),
        }
        Ok(Deployment {
            submission,
            contract,
        })
    }

    // -- Multi-transaction operations ---------------------------------------

    /// Inscribes `warp_json` in a transaction to self and, if asked,
    /// registers an alias for it.
    ///
    /// The alias transaction takes the next local nonce and is sent after
    /// the configured propagation delay. Its failure is reported in the
    /// result rather than returned as an error. Each of `recipients` gets a
    /// link to the warp with its address pre-filled.
    pub async fn publish_with_alias(
        &mut self,
        warp_json: &str,
        alias: Option<&AliasRequest>,
        recipients: &[Address],
    ) -> Result<Publication, PipelineError> {
        self.sync_nonce().await?;
        let gas_limit = estimate_gas_limit(warp_json.len(), self.config.inscription_execution_gas);
        tracing::info!(data_len = warp_json.len(), gas_limit, "publishing warp");
        let builder = self
            .builder()
            .receiver(self.address())
            .gas_limit(gas_limit)
            .data(warp_json.as_bytes());
        let mut inscription = self.submit(builder).await?;
        let warp_url = format!("{}/warp/{}", self.config.network.warps_url(), inscription.hash);
        let recipient_links = recipients
            .iter()
            .map(|recipient| {
                let bech32 = recipient.to_bech32();
                let link = warp_link(&warp_url, &[("to", bech32.as_str())]);
                (bech32, link)
            })
            .collect();

        let alias = match alias {
            Some(request) => Some(self.register_alias(&inscription.hash, request).await),
            None => None,
        };

        if self.config.await_outcome {
            self.confirm(&mut inscription).await?;
        }

        Ok(Publication {
            inscription,
            warp_url,
            alias,
            recipient_links,
        })
    }

    async fn register_alias(&mut self, warp_hash: &str, request: &AliasRequest) -> AliasRegistration {
        let alias_url = format!(
            "{}/warp/alias/{}",
            self.config.network.warps_url(),
            request.alias
        );

        tracing::info!(
            delay = ?self.config.propagation_delay,
            alias = %request.alias,
            "waiting for the inscription to propagate"
        );
        tokio::time::sleep(self.config.propagation_delay).await;

        let hash_arg = match hex::decode(warp_hash) {
            Ok(bytes) => Argument::Bytes(bytes),
            Err(_) => Argument::from(warp_hash),
        };
        let builder = self
            .builder()
            .receiver(request.registry)
            .value(request.fee)
            .gas_limit(self.config.registry_gas_limit)
            .call(
                REGISTER_ALIAS_FUNCTION,
                &[hash_arg, Argument::from(request.alias.as_str())],
            );

        let result = match self.submit(builder).await {
            Ok(mut submission) if self.config.await_outcome => {
                self.confirm(&mut submission).await.map(|_| submission)
            }
            other => other,
        };

        let (submission, error) = match result {
            Ok(s) if !s.succeeded() => {
                let reason = s
                    .outcome
                    .as_ref()
                    .and_then(|o| o.error.clone())
                    .unwrap_or_else(|| "alias registration did not succeed".to_string());
                (Some(s), Some(reason))
            }
            Ok(s) => (Some(s), None),
            Err(e) => (None, Some(e.to_string())),
        };
        if let Some(reason) = &error {
            tracing::warn!(alias = %request.alias, error = %reason, "alias registration failed");
        }

        AliasRegistration {
            alias: request.alias.clone(),
            alias_url,
            submission,
            error,
        }
    }

    /// Submits one proposal per description, in order, pausing between
    /// entries. Entry failures are recorded in the report; only the initial
    /// nonce sync can fail the whole batch.
    ///
    /// After a failed broadcast the nonce is re-read from the network when
    /// `resync_after_failure` is set. Otherwise the reserved nonce stays
    /// spent and the following entries are sent past the gap.
    pub async fn create_proposals(
        &mut self,
        contract: Address,
        descriptions: &[String],
    ) -> Result<BatchReport, PipelineError> {
        tracing::info!(%contract, total = descriptions.len(), "starting proposal batch");
        self.sync_nonce().await?;

        let mut results = Vec::with_capacity(descriptions.len());
        for (index, description) in descriptions.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            let entry = match self.send_proposal(contract, description).await {
                Ok(submission) => BatchEntry {
                    index,
                    description: description.clone(),
                    success: submission.succeeded(),
                    error: submission.outcome.as_ref().and_then(|o| o.error.clone()),
                    hash: Some(submission.hash),
                    explorer_url: Some(submission.explorer_url),
                    phase: None,
                },
                Err(e) => {
                    tracing::warn!(index, error = %e, "proposal failed");
                    if e.phase() == Phase::Broadcast && self.config.resync_after_failure {
                        if let Err(resync) = self.sync_nonce().await {
                            tracing::warn!(error = %resync, "nonce resync failed");
                        }
                    }
                    BatchEntry {
                        index,
                        description: description.clone(),
                        success: false,
                        hash: None,
                        explorer_url: None,
                        phase: Some(e.phase()),
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(entry);
        }

        let successful = results.iter().filter(|e| e.success).count();
        let report = BatchReport {
            timestamp: Utc::now(),
            contract,
            network: self.config.network,
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        };
        tracing::info!(
            total = report.total,
            successful = report.successful,
            failed = report.failed,
            "proposal batch finished"
        );
        Ok(report)
    }

    async fn send_proposal(
        &mut self,
        contract: Address,
        description: &str,
    ) -> Result<Submission, PipelineError> {
        let builder = self
            .builder()
            .receiver(contract)
            .gas_limit(self.config.proposal_gas_limit)
            .call(CREATE_PROPOSAL_FUNCTION, &[Argument::from(description)]);
        let mut submission = self.submit(builder).await?;
        if self.config.await_outcome {
            self.confirm(&mut submission).await?;
        }
        Ok(submission)
    }

    // -- Steps ---------------------------------------------------------------

    fn builder(&self) -> TransactionBuilder {
        TransactionBuilder::new(self.config.network.chain_id())
            .sender(self.address())
            .gas_price(self.config.gas_price)
    }

    /// Builds and signs against the tracked nonce, reserves it, then
    /// broadcasts. A build or sign failure leaves the nonce unspent.
    async fn submit(&mut self, builder: TransactionBuilder) -> Result<Submission, PipelineError> {
        let nonce = self.tracker.peek().map_err(PipelineError::Sync)?;
        let tx = builder.nonce(nonce).build().map_err(PipelineError::Build)?;
        let signed = sign_transaction(tx, self.identity.keypair()).map_err(PipelineError::Sign)?;
        self.tracker.next().map_err(PipelineError::Sync)?;
        let hash = self
            .broadcaster
            .broadcast(&signed)
            .await
            .map_err(PipelineError::Broadcast)?;

        Ok(Submission {
            explorer_url: self.config.network.transaction_url(&hash),
            hash,
            nonce,
            outcome: None,
        })
    }

    async fn confirm(&self, submission: &mut Submission) -> Result<(), PipelineError> {
        let outcome = self
            .broadcaster
            .await_outcome(&submission.hash, self.config.confirmation_timeout)
            .await
            .map_err(PipelineError::Confirm)?;
        submission.outcome = Some(outcome);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_lines_skip_blanks_and_comments() {
        let input = "  first  \n\n# comment\n   # indented comment\nsecond\n\t\n";
        assert_eq!(parse_batch_lines(input), vec!["first", "second"]);
    }

    #[test]
    fn warp_link_encodes_parameters() {
        let base = "https://devnet.warps.tools/warp/ab12";
        assert_eq!(warp_link(base, &[]), base);
        assert_eq!(
            warp_link(base, &[("to", "erd1qyu5"), ("note", "1 EGLD & thanks")]),
            "https://devnet.warps.tools/warp/ab12?to=erd1qyu5&note=1+EGLD+%26+thanks"
        );
        assert_eq!(warp_link("not a url", &[("to", "x")]), "not a url");
    }

    #[test]
    fn phase_names() {
        assert_eq!(Phase::Decrypt.to_string(), "decrypt");
        assert_eq!(serde_json::to_string(&Phase::Confirm).unwrap(), "\"confirm\"");
    }

    #[test]
    fn error_reports_phase() {
        let err = PipelineError::Decrypt(KeystoreError::IncorrectPassword);
        assert_eq!(err.phase(), Phase::Decrypt);
        assert!(err.to_string().starts_with("decrypt failed"));
    }

    #[test]
    fn submission_without_outcome_counts_as_sent() {
        let s = Submission {
            hash: "ab".into(),
            nonce: 1,
            explorer_url: String::new(),
            outcome: None,
        };
        assert!(s.succeeded());
        let failed = Submission {
            outcome: Some(TransactionOutcome::timed_out("ab")),
            ..s
        };
        assert!(!failed.succeeded());
    }
}
