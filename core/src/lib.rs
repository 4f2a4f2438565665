//! # warp-core
//!
//! Unlocks a MultiversX keystore and turns intents into signed, broadcast
//! and confirmed transactions: DAO proposals, contract calls, deployments
//! and warp inscriptions.
//!
//! ## Modules
//!
//! - **config** — Protocol constants, network presets and pipeline tunables.
//! - **crypto** — Ed25519 keys and bech32 addresses.
//! - **keystore** — Parsing and decrypting password-protected key files.
//! - **transaction** — Payload encoding, canonical serialization and signing.
//! - **network** — The provider trait, its REST and in-memory implementations,
//!   nonce tracking and broadcast.
//! - **pipeline** — The end-to-end session tying the above together.
//! - **input** — Operator prompts behind a trait.
//!
//! Key material never leaves the process and is never logged. Secrets are
//! wiped from memory when the values holding them are dropped.

pub mod config;
pub mod crypto;
pub mod input;
pub mod keystore;
pub mod network;
pub mod pipeline;
pub mod transaction;
