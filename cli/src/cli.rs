//! # CLI Interface
//!
//! Argument structure for `warp-cli`. Every flag that names a wallet,
//! password, network, contract or config file can also come from the
//! environment, so batch jobs do not have to put secrets on the command line.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use warp_core::config::Network;
use warp_core::crypto::address::Address;

use crate::logging::LogFormat;

/// Signs and broadcasts MultiversX transactions from a keystore file.
#[derive(Parser, Debug)]
#[command(
    name = "warp-cli",
    about = "Sign and broadcast MultiversX transactions from a keystore",
    version,
    propagate_version = true
)]
pub struct WarpCli {
    #[command(subcommand)]
    pub command: Commands,

    /// Network to talk to: devnet, testnet or mainnet.
    ///
    /// Overrides the network in `--config`.
    #[arg(long, short = 'n', global = true, env = "WARP_NETWORK")]
    pub network: Option<Network>,

    /// Pipeline configuration file (JSON). Missing fields take defaults.
    #[arg(long, short = 'c', global = true, env = "WARP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Return as soon as the network accepts a transaction instead of
    /// waiting for it to settle. Deployments always wait.
    #[arg(long, global = true)]
    pub no_wait: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit one DAO proposal.
    Propose(ProposeArgs),
    /// Submit one proposal per line of a file.
    Batch(BatchArgs),
    /// Call any endpoint of a contract.
    Call(CallArgs),
    /// Deploy a contract from a .wasm file.
    Deploy(DeployArgs),
    /// Inscribe a warp on chain, optionally registering an alias for it.
    Publish(PublishArgs),
    /// Answer prompts to build and submit a proposal.
    Interactive(InteractiveArgs),
    /// Print the address of a keystore.
    Address(WalletArgs),
    /// Wait for an already broadcast transaction and print its outcome.
    Status(StatusArgs),
}

/// Keystore location and password.
#[derive(Args, Debug, Clone)]
pub struct WalletArgs {
    /// Path to the keystore JSON file.
    #[arg(long, short = 'w', env = "WARP_WALLET")]
    pub wallet: PathBuf,

    /// Keystore password. Prompted for when omitted.
    #[arg(long, env = "WARP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProposeArgs {
    /// Proposal description.
    pub description: String,

    /// DAO contract address.
    #[arg(long, env = "WARP_CONTRACT")]
    pub contract: Address,

    #[command(flatten)]
    pub wallet: WalletArgs,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// File with one description per line. Blank lines and lines starting
    /// with `#` are skipped.
    pub file: PathBuf,

    /// DAO contract address.
    #[arg(long, env = "WARP_CONTRACT")]
    pub contract: Address,

    /// Directory for the `proposal-results-<ms>.json` report.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub wallet: WalletArgs,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Contract address.
    pub contract: Address,

    /// Endpoint name.
    pub function: String,

    /// Arguments in order. `0x…` is raw hex, `erd1…` an address, digits a
    /// number, `true`/`false` a boolean, anything else UTF-8 text.
    #[arg(long = "arg")]
    pub args: Vec<String>,

    #[arg(long, default_value_t = 10_000_000)]
    pub gas_limit: u64,

    #[command(flatten)]
    pub wallet: WalletArgs,
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Compiled contract (.wasm).
    pub code: PathBuf,

    /// Constructor arguments, encoded as for `call`.
    #[arg(long = "arg")]
    pub args: Vec<String>,

    /// Deploy without the upgradeable flag.
    #[arg(long)]
    pub not_upgradeable: bool,

    /// Deploy without the readable flag.
    #[arg(long)]
    pub not_readable: bool,

    /// Let the contract receive payments from accounts.
    #[arg(long)]
    pub payable: bool,

    /// Let the contract receive payments from other contracts.
    #[arg(long)]
    pub payable_by_sc: bool,

    #[command(flatten)]
    pub wallet: WalletArgs,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Warp definition (JSON).
    pub warp: PathBuf,

    /// Alias to register for the published warp.
    #[arg(long, requires = "registry")]
    pub alias: Option<String>,

    /// Alias registry contract.
    #[arg(long, env = "WARP_REGISTRY")]
    pub registry: Option<Address>,

    /// Registration fee, in the smallest denomination.
    #[arg(long, default_value_t = 0)]
    pub fee: u128,

    /// Print a link with this address pre-filled. Repeatable.
    #[arg(long = "recipient")]
    pub recipients: Vec<Address>,

    #[command(flatten)]
    pub wallet: WalletArgs,
}

#[derive(Args, Debug)]
pub struct InteractiveArgs {
    /// Default offered for the contract prompt.
    #[arg(long, env = "WARP_CONTRACT")]
    pub contract: Option<Address>,

    /// Default offered for the wallet prompt.
    #[arg(long, short = 'w', env = "WARP_WALLET")]
    pub wallet: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Transaction hash (hex).
    pub hash: String,

    /// Seconds to keep polling before reporting a timeout.
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        WarpCli::command().debug_assert();
    }

    #[test]
    fn parses_proposal() {
        let cli = WarpCli::try_parse_from([
            "warp-cli",
            "propose",
            "Increase user limits",
            "--contract",
            "erd1qqqqqqqqqqqqqpgqkr2ygjp0luge4jfjqv8z873qreuyms4xldvs42uf9f",
            "--wallet",
            "alice.json",
            "--network",
            "testnet",
        ])
        .unwrap();
        assert_eq!(cli.network, Some(Network::Testnet));
        match cli.command {
            Commands::Propose(args) => {
                assert_eq!(args.description, "Increase user limits");
                assert!(args.contract.is_smart_contract());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn alias_requires_registry() {
        let res = WarpCli::try_parse_from([
            "warp-cli",
            "publish",
            "warp.json",
            "--alias",
            "demo",
            "--wallet",
            "w.json",
        ]);
        // WARP_REGISTRY is not expected to be set in the test environment.
        if std::env::var_os("WARP_REGISTRY").is_none() {
            assert!(res.is_err());
        }
    }

    #[test]
    fn repeated_recipients() {
        let cli = WarpCli::try_parse_from([
            "warp-cli",
            "publish",
            "warp.json",
            "--recipient",
            "erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th",
            "--recipient",
            "erd1qqqqqqqqqqqqqpgqkr2ygjp0luge4jfjqv8z873qreuyms4xldvs42uf9f",
            "--wallet",
            "w.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Publish(args) => assert_eq!(args.recipients.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_address() {
        assert!(WarpCli::try_parse_from([
            "warp-cli",
            "propose",
            "d",
            "--contract",
            "erd1nope",
            "--wallet",
            "w.json",
        ])
        .is_err());
    }
}
