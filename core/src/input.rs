//! Interactive prompts without a global console.
//!
//! Flows that ask the operator questions take a [`UserInputSource`]. The CLI
//! passes [`StdinInput`]; tests pass [`ScriptedInput`] with the answers
//! queued up front.

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::Network;
use crate::crypto::address::Address;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Invalid(String),
}

/// A source of operator answers.
pub trait UserInputSource {
    /// Shows `prompt` and returns the answer without the line terminator.
    fn ask(&mut self, prompt: &str) -> Result<String, InputError>;

    /// Like [`Self::ask`], for answers that must not be echoed or logged.
    fn ask_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>, InputError> {
        self.ask(prompt).map(Zeroizing::new)
    }

    /// Informational output (summaries, confirmations).
    fn say(&mut self, message: &str) -> Result<(), InputError>;
}

// ---------------------------------------------------------------------------
// StdinInput
// ---------------------------------------------------------------------------

/// Reads answers from stdin and writes prompts to stderr. Secrets are read
/// from the terminal with echo off; piped input is read as plain lines.
#[derive(Debug, Default)]
pub struct StdinInput;

/// How a secret answer is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SecretMode {
    /// From the controlling terminal, not echoed.
    Hidden,
    /// A line from stdin, for scripts that pipe the password in.
    Line,
}

impl SecretMode {
    fn for_stdin(stdin_is_terminal: bool) -> Self {
        if stdin_is_terminal {
            SecretMode::Hidden
        } else {
            SecretMode::Line
        }
    }
}

impl UserInputSource for StdinInput {
    fn ask_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>, InputError> {
        match SecretMode::for_stdin(io::stdin().is_terminal()) {
            SecretMode::Hidden => {
                let secret = rpassword::read_password_from_tty(Some(prompt))?;
                Ok(Zeroizing::new(secret))
            }
            SecretMode::Line => self.ask(prompt).map(Zeroizing::new),
        }
    }

    fn ask(&mut self, prompt: &str) -> Result<String, InputError> {
        let mut err = io::stderr().lock();
        write!(err, "{prompt}")?;
        err.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(InputError::Closed);
        }
        Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
    }

    fn say(&mut self, message: &str) -> Result<(), InputError> {
        writeln!(io::stderr().lock(), "{message}")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedInput
// ---------------------------------------------------------------------------

/// Answers from a queue. Records every prompt and message it was shown.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    pub transcript: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }
}

impl UserInputSource for ScriptedInput {
    fn ask(&mut self, prompt: &str) -> Result<String, InputError> {
        self.transcript.push(prompt.to_string());
        self.answers.pop_front().ok_or(InputError::Closed)
    }

    fn say(&mut self, message: &str) -> Result<(), InputError> {
        self.transcript.push(message.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Proposal prompt flow
// ---------------------------------------------------------------------------

/// Defaults offered in brackets; an empty answer accepts them.
#[derive(Debug, Clone, Default)]
pub struct ProposalDefaults {
    pub contract: Option<Address>,
    pub wallet: Option<PathBuf>,
    pub network: Network,
}

/// Everything needed to submit one proposal.
pub struct ProposalRequest {
    pub description: String,
    pub contract: Address,
    pub wallet: PathBuf,
    pub password: Zeroizing<String>,
    pub network: Network,
}

impl std::fmt::Debug for ProposalRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProposalRequest")
            .field("description", &self.description)
            .field("contract", &self.contract)
            .field("wallet", &self.wallet)
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

/// Asks for description, contract, wallet, password and network, shows a
/// summary and asks for confirmation. `Ok(None)` means the operator said no.
pub fn prompt_proposal(
    input: &mut dyn UserInputSource,
    defaults: &ProposalDefaults,
) -> Result<Option<ProposalRequest>, InputError> {
    let description = input.ask("Enter proposal description: ")?;
    if description.trim().is_empty() {
        return Err(InputError::Invalid("description cannot be empty".into()));
    }

    let contract = match &defaults.contract {
        Some(default) => {
            let answer = input.ask(&format!("Enter contract address [{default}]: "))?;
            if answer.trim().is_empty() {
                *default
            } else {
                parse_address(&answer)?
            }
        }
        None => parse_address(&input.ask("Enter contract address: ")?)?,
    };

    let wallet = match &defaults.wallet {
        Some(default) => {
            let answer = input.ask(&format!("Enter wallet file path [{}]: ", default.display()))?;
            if answer.trim().is_empty() {
                default.clone()
            } else {
                PathBuf::from(answer.trim())
            }
        }
        None => {
            let answer = input.ask("Enter wallet file path: ")?;
            if answer.trim().is_empty() {
                return Err(InputError::Invalid("wallet path cannot be empty".into()));
            }
            PathBuf::from(answer.trim())
        }
    };

    let password = input.ask_secret("Enter wallet password: ")?;

    let answer = input.ask(&format!(
        "Enter network (devnet, testnet, mainnet) [{}]: ",
        defaults.network
    ))?;
    let network = if answer.trim().is_empty() {
        defaults.network
    } else {
        answer
            .parse()
            .map_err(|e: crate::config::UnknownNetwork| InputError::Invalid(e.to_string()))?
    };

    input.say("")?;
    input.say("Proposal details:")?;
    input.say(&format!("- Description: {description}"))?;
    input.say(&format!("- Contract: {contract}"))?;
    input.say(&format!("- Wallet: {}", wallet.display()))?;
    input.say(&format!("- Network: {network}"))?;

    let confirm = input.ask("Confirm submission? (y/n): ")?;
    if !matches!(confirm.trim().to_lowercase().as_str(), "y" | "yes") {
        input.say("Operation cancelled.")?;
        return Ok(None);
    }

    Ok(Some(ProposalRequest {
        description,
        contract,
        wallet,
        password,
        network,
    }))
}

fn parse_address(s: &str) -> Result<Address, InputError> {
    s.trim()
        .parse()
        .map_err(|e| InputError::Invalid(format!("invalid contract address: {e}")))
}
