//! Subcommand handlers.
//!
//! Each handler builds what it needs from the parsed arguments, runs one
//! pipeline operation and prints the result as JSON on stdout.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use zeroize::Zeroizing;

use warp_core::config::{Network, PipelineConfig};
use warp_core::crypto::address::Address;
use warp_core::input::{prompt_proposal, ProposalDefaults, StdinInput, UserInputSource};
use warp_core::keystore::{Keystore, KeystoreDecryptor};
use warp_core::network::{ApiNetworkProvider, Broadcaster};
use warp_core::pipeline::{parse_batch_lines, AliasRequest, TransactionPipeline};
use warp_core::transaction::{Argument, CodeMetadata};

use crate::cli::{
    BatchArgs, CallArgs, DeployArgs, InteractiveArgs, ProposeArgs, PublishArgs, StatusArgs,
    WalletArgs,
};

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

/// Reads `--config` (if any) and applies the global overrides.
pub fn load_config(
    path: Option<&Path>,
    network: Option<Network>,
    no_wait: bool,
) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            PipelineConfig::from_json(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(network) = network {
        config.network = network;
    }
    if no_wait {
        config.await_outcome = false;
    }
    Ok(config)
}

/// Encodes a command-line value as a contract argument.
///
/// `0x…` is raw hex, `erd1…` an address, `true`/`false` a boolean, plain
/// digits an unsigned number and anything else UTF-8 text.
pub fn parse_argument(raw: &str) -> Result<Argument> {
    if let Some(hex_str) = raw.strip_prefix("0x") {
        let bytes =
            hex::decode(hex_str).with_context(|| format!("invalid hex argument '{raw}'"))?;
        return Ok(Argument::Bytes(bytes));
    }
    if raw.starts_with("erd1") {
        let address: Address = raw
            .parse()
            .with_context(|| format!("invalid address argument '{raw}'"))?;
        return Ok(Argument::Address(address));
    }
    match raw {
        "true" => return Ok(Argument::Bool(true)),
        "false" => return Ok(Argument::Bool(false)),
        _ => {}
    }
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        let n: u128 = raw
            .parse()
            .with_context(|| format!("number argument '{raw}' is too large"))?;
        return Ok(Argument::BigUint(n));
    }
    Ok(Argument::Utf8(raw.to_string()))
}

fn parse_arguments(raw: &[String]) -> Result<Vec<Argument>> {
    raw.iter().map(|a| parse_argument(a)).collect()
}

/// File name of a batch report written at `millis` since the epoch.
pub fn report_file_name(millis: i64) -> String {
    format!("proposal-results-{millis}.json")
}

/// Deployment flags from the command line, starting from
/// [`CodeMetadata::default`].
pub fn code_metadata(args: &DeployArgs) -> CodeMetadata {
    let defaults = CodeMetadata::default();
    CodeMetadata {
        upgradeable: defaults.upgradeable && !args.not_upgradeable,
        readable: defaults.readable && !args.not_readable,
        payable: defaults.payable || args.payable,
        payable_by_sc: defaults.payable_by_sc || args.payable_by_sc,
    }
}

fn password(wallet: &WalletArgs) -> Result<Zeroizing<String>> {
    match &wallet.password {
        Some(pw) => Ok(Zeroizing::new(pw.clone())),
        None => StdinInput
            .ask_secret(&format!("Password for {}: ", wallet.wallet.display()))
            .context("failed to read password"),
    }
}

async fn open_pipeline(
    wallet: &WalletArgs,
    config: PipelineConfig,
) -> Result<TransactionPipeline<ApiNetworkProvider>> {
    let password = password(wallet)?;
    let provider = ApiNetworkProvider::for_network(config.network)?;
    let pipeline = TransactionPipeline::open(&wallet.wallet, password, provider, config).await?;
    Ok(pipeline)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn propose(args: ProposeArgs, config: PipelineConfig) -> Result<()> {
    let mut pipeline = open_pipeline(&args.wallet, config).await?;
    let submission = pipeline
        .create_proposal(args.contract, &args.description)
        .await?;
    print_json(&submission)?;
    if !submission.succeeded() {
        bail!("proposal {} did not succeed", submission.hash);
    }
    Ok(())
}

pub async fn batch(args: BatchArgs, config: PipelineConfig) -> Result<()> {
    let contents = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let descriptions = parse_batch_lines(&contents);
    if descriptions.is_empty() {
        bail!("no proposals found in {}", args.file.display());
    }

    let mut pipeline = open_pipeline(&args.wallet, config).await?;
    let report = pipeline
        .create_proposals(args.contract, &descriptions)
        .await?;

    let path = args
        .out_dir
        .join(report_file_name(report.timestamp.timestamp_millis()));
    let json = serde_json::to_string_pretty(&report)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "batch report written");

    print_json(&report)?;
    if report.failed > 0 {
        bail!("{} of {} proposals failed", report.failed, report.total);
    }
    Ok(())
}

pub async fn call(args: CallArgs, config: PipelineConfig) -> Result<()> {
    let arguments = parse_arguments(&args.args)?;
    let mut pipeline = open_pipeline(&args.wallet, config).await?;
    let submission = pipeline
        .execute(args.contract, &args.function, &arguments, args.gas_limit)
        .await?;
    print_json(&submission)?;
    if !submission.succeeded() {
        bail!("call {} did not succeed", submission.hash);
    }
    Ok(())
}

pub async fn deploy(args: DeployArgs, config: PipelineConfig) -> Result<()> {
    let code = tokio::fs::read(&args.code)
        .await
        .with_context(|| format!("failed to read {}", args.code.display()))?;
    let arguments = parse_arguments(&args.args)?;
    let metadata = code_metadata(&args);

    let network = config.network;
    let mut pipeline = open_pipeline(&args.wallet, config).await?;
    let deployment = pipeline
        .deploy_contract(&code, metadata, &arguments)
        .await?;
    print_json(&deployment)?;

    match deployment.contract {
        Some(address) => {
            eprintln!("Contract: {}", network.account_url(&address.to_bech32()));
            Ok(())
        }
        None => bail!("deploy {} did not produce a contract", deployment.submission.hash),
    }
}

pub async fn publish(args: PublishArgs, config: PipelineConfig) -> Result<()> {
    let warp = tokio::fs::read_to_string(&args.warp)
        .await
        .with_context(|| format!("failed to read {}", args.warp.display()))?;
    serde_json::from_str::<serde_json::Value>(&warp)
        .with_context(|| format!("{} is not valid JSON", args.warp.display()))?;

    let alias = match (args.alias, args.registry) {
        (Some(alias), Some(registry)) => Some(AliasRequest {
            alias,
            registry,
            fee: args.fee,
        }),
        (Some(_), None) => bail!("--alias needs --registry"),
        (None, _) => None,
    };

    let mut pipeline = open_pipeline(&args.wallet, config).await?;
    let publication = pipeline
        .publish_with_alias(&warp, alias.as_ref(), &args.recipients)
        .await?;
    print_json(&publication)?;
    for (recipient, link) in &publication.recipient_links {
        eprintln!("{recipient}: {link}");
    }

    if !publication.inscription.succeeded() {
        bail!("inscription {} did not succeed", publication.inscription.hash);
    }
    if let Some(error) = publication.alias.as_ref().and_then(|a| a.error.as_deref()) {
        eprintln!("Warp published, alias registration failed: {error}");
    }
    Ok(())
}

pub async fn interactive(args: InteractiveArgs, config: PipelineConfig) -> Result<()> {
    let defaults = ProposalDefaults {
        contract: args.contract,
        wallet: args.wallet,
        network: config.network,
    };
    let request = tokio::task::spawn_blocking(move || prompt_proposal(&mut StdinInput, &defaults))
        .await
        .context("prompt task failed")??;
    let Some(request) = request else {
        return Ok(());
    };

    let config = PipelineConfig {
        network: request.network,
        ..config
    };
    let provider = ApiNetworkProvider::for_network(config.network)?;
    let mut pipeline =
        TransactionPipeline::open(&request.wallet, request.password, provider, config).await?;
    let submission = pipeline
        .create_proposal(request.contract, &request.description)
        .await?;
    print_json(&submission)?;
    Ok(())
}

#[derive(Serialize)]
struct AddressReport {
    bech32: String,
    hex: String,
}

pub async fn address(wallet: WalletArgs) -> Result<()> {
    let keystore = Keystore::load(&wallet.wallet).await?;
    let password = password(&wallet)?;
    let identity = KeystoreDecryptor::new()
        .decrypt_async(keystore, password)
        .await?;
    print_json(&AddressReport {
        bech32: identity.address().to_bech32(),
        hex: identity.address().to_hex(),
    })
}

pub async fn status(args: StatusArgs, config: PipelineConfig) -> Result<()> {
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or(config.confirmation_timeout);
    let provider = ApiNetworkProvider::for_network(config.network)?;
    let broadcaster = Broadcaster::new(provider).with_poll_interval(config.poll_interval);
    let outcome = broadcaster.await_outcome(&args.hash, timeout).await?;
    print_json(&outcome)?;
    eprintln!("{}", config.network.transaction_url(&args.hash));
    Ok(())
}
