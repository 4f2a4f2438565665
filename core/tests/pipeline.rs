//! End-to-end tests for the signing pipeline.
//!
//! Each test writes the Alice keystore to a temporary directory, unlocks it
//! and drives a `TransactionPipeline` against a `MockProvider`. Time is
//! paused so propagation and batch delays cost nothing.

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::Instant;
use zeroize::Zeroizing;

use warp_core::config::{Network, PipelineConfig};
use warp_core::crypto::address::Address;
use warp_core::network::types::{EventOnNetwork, LogsOnNetwork};
use warp_core::network::{
    MockProvider, NetworkStatus, OutcomeStatus, ScriptedOutcome, TransactionOnNetwork,
};
use warp_core::pipeline::{
    parse_batch_lines, AliasRequest, Phase, PipelineError, TransactionPipeline,
};
use warp_core::transaction::CodeMetadata;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const ALICE_KEYSTORE: &str = include_str!("fixtures/alice.json");
const ALICE: &str = "erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th";
const DAO: &str = "erd1qqqqqqqqqqqqqpgqkr2ygjp0luge4jfjqv8z873qreuyms4xldvs42uf9f";
const PROPOSAL_DATA_B64: &str =
    "Y3JlYXRlUHJvcG9zYWxANDk2ZTYzNzI2NTYxNzM2NTIwNzU3MzY1NzIyMDZjNjk2ZDY5NzQ3Mw==";

fn alice() -> Address {
    ALICE.parse().unwrap()
}

fn dao() -> Address {
    DAO.parse().unwrap()
}

fn write_keystore() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("alice.json");
    std::fs::write(&path, ALICE_KEYSTORE).expect("write keystore");
    (dir, path)
}

fn config() -> PipelineConfig {
    PipelineConfig {
        poll_interval: Duration::from_secs(1),
        confirmation_timeout: Duration::from_secs(30),
        ..PipelineConfig::for_network(Network::Devnet)
    }
}

async fn open(
    mock: &MockProvider,
    config: PipelineConfig,
) -> (TempDir, TransactionPipeline<MockProvider>) {
    let (dir, path) = write_keystore();
    let pipeline = TransactionPipeline::open(
        &path,
        Zeroizing::new("password".to_string()),
        mock.clone(),
        config,
    )
    .await
    .expect("keystore unlocks");
    (dir, pipeline)
}

fn failed_result() -> TransactionOnNetwork {
    TransactionOnNetwork {
        hash: String::new(),
        status: NetworkStatus::Fail,
        logs: None,
        results: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Single-call operations
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn proposal_end_to_end() {
    let mock = MockProvider::new().with_account(alice(), 7);
    let (_dir, mut pipeline) = open(&mock, config()).await;
    assert_eq!(pipeline.address(), alice());

    let submission = pipeline
        .create_proposal(dao(), "Increase user limits")
        .await
        .unwrap();

    assert_eq!(submission.nonce, 7);
    assert!(submission
        .explorer_url
        .starts_with("https://devnet-explorer.multiversx.com/transactions/"));
    assert_eq!(submission.outcome.as_ref().unwrap().status, OutcomeStatus::Success);

    let sent = mock.sent();
    assert_eq!(sent.len(), 1);
    let tx = sent[0].transaction();
    assert_eq!(tx.sender, alice());
    assert_eq!(tx.receiver, dao());
    assert_eq!(tx.gas_limit, 10_000_000);
    assert_eq!(tx.chain_id, "D");
    assert_eq!(tx.data_base64().as_deref(), Some(PROPOSAL_DATA_B64));
    assert_eq!(
        sent[0].signature().to_hex(),
        "209fc0afca235443248e94a98ab0abf3a98906747b03b9cc30bff8060c9e58f4\
         7a747973822bc4f278df16172cddd81f6a57f9071b869937b269a7ee20eedd04"
    );
    assert_eq!(pipeline.next_nonce(), Some(8));
}

#[tokio::test]
async fn wrong_password_fails_before_any_request() {
    let mock = MockProvider::new();
    let (_dir, path) = write_keystore();

    let err = TransactionPipeline::open(
        &path,
        Zeroizing::new("not the password".to_string()),
        mock.clone(),
        config(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.phase(), Phase::Decrypt);
    assert!(err.to_string().contains("incorrect password"));
    assert_eq!(mock.account_queries(), 0);
    assert!(mock.sent().is_empty());
}

#[tokio::test]
async fn missing_keystore_is_a_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let err = TransactionPipeline::open(
        dir.path().join("nope.json"),
        Zeroizing::new("password".to_string()),
        MockProvider::new(),
        config(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.phase(), Phase::Load);
}

#[tokio::test(start_paused = true)]
async fn rejection_names_broadcast_and_keeps_the_spent_nonce() {
    let mock = MockProvider::new().with_account(alice(), 7);
    let (_dir, mut pipeline) = open(&mock, config()).await;

    mock.reject_next("insufficient funds");
    let err = pipeline
        .create_proposal(dao(), "Increase user limits")
        .await
        .unwrap_err();
    assert_eq!(err.phase(), Phase::Broadcast);
    assert!(matches!(err, PipelineError::Broadcast(_)));
    // The tracker does not hand 7 back.
    assert_eq!(pipeline.next_nonce(), Some(8));

    // The next single call re-reads the nonce and lands on 7.
    let submission = pipeline
        .create_proposal(dao(), "Increase user limits")
        .await
        .unwrap();
    assert_eq!(submission.nonce, 7);
}

#[tokio::test(start_paused = true)]
async fn confirmation_timeout_is_an_outcome() {
    let mock = MockProvider::new().with_account(alice(), 0);
    mock.push_outcome(ScriptedOutcome::never_final());
    let (_dir, mut pipeline) = open(&mock, config()).await;

    let started = Instant::now();
    let submission = pipeline
        .create_proposal(dao(), "slow one")
        .await
        .unwrap();
    assert_eq!(submission.outcome.unwrap().status, OutcomeStatus::Timeout);
    assert!(started.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn fire_and_forget_skips_polling() {
    let mock = MockProvider::new();
    let cfg = PipelineConfig {
        await_outcome: false,
        ..config()
    };
    let (_dir, mut pipeline) = open(&mock, cfg).await;

    let submission = pipeline.create_proposal(dao(), "quick").await.unwrap();
    assert!(submission.outcome.is_none());
    assert!(submission.succeeded());
    assert_eq!(mock.transaction_queries(), 0);
}

#[tokio::test(start_paused = true)]
async fn deploy_reports_contract_address() {
    let mock = MockProvider::new().with_account(alice(), 3);
    let mut deployed = TransactionOnNetwork {
        logs: Some(LogsOnNetwork {
            events: vec![EventOnNetwork {
                address: DAO.into(),
                identifier: "SCDeploy".into(),
                topics: vec!["AAAAAAAAAAAFALDUREgv/xGayTIDDiP6IB54TcKm+1k=".into()],
                data: None,
            }],
        }),
        ..failed_result()
    };
    deployed.status = NetworkStatus::Success;
    mock.push_outcome(ScriptedOutcome::with_result(deployed).after_polls(2));
    let (_dir, mut pipeline) = open(&mock, config()).await;

    let deployment = pipeline
        .deploy_contract(b"\0asm", CodeMetadata::all(), &[])
        .await
        .unwrap();

    assert_eq!(deployment.contract, Some(dao()));
    assert_eq!(deployment.submission.nonce, 3);
    let tx = mock.sent()[0].transaction().clone();
    assert_eq!(tx.receiver, Address::zero());
    assert_eq!(tx.gas_limit, 50_000_000);
    assert_eq!(tx.data_str(), Some("0061736d@0500@0506"));
}

#[tokio::test(start_paused = true)]
async fn failed_deploy_has_no_contract() {
    let mock = MockProvider::new();
    mock.push_outcome(ScriptedOutcome::with_result(failed_result()));
    let (_dir, mut pipeline) = open(&mock, config()).await;

    let deployment = pipeline
        .deploy_contract(b"\0asm", CodeMetadata::default(), &[])
        .await
        .unwrap();
    assert_eq!(deployment.contract, None);
    assert!(!deployment.submission.succeeded());
}

// ---------------------------------------------------------------------------
// Multi-transaction operations
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn publish_then_alias_uses_consecutive_nonces() {
    let mock = MockProvider::new().with_account(alice(), 11);
    let registry = Address::from_bytes([0xaa; 32]);
    let (_dir, mut pipeline) = open(&mock, config()).await;

    let warp = r#"{"protocol":"warp:0.5.0","name":"demo","actions":[]}"#;
    let request = AliasRequest {
        alias: "my-warp".into(),
        registry,
        fee: 0,
    };
    let started = Instant::now();
    let publication = pipeline
        .publish_with_alias(warp, Some(&request), &[])
        .await
        .unwrap();

    assert!(started.elapsed() >= pipeline.config().propagation_delay);
    // One sync for the whole operation.
    assert_eq!(mock.account_queries(), 1);

    let sent = mock.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].nonce(), 11);
    assert_eq!(sent[1].nonce(), 12);

    let inscription = sent[0].transaction();
    assert_eq!(inscription.receiver, alice());
    assert_eq!(inscription.data, warp.as_bytes());
    assert_eq!(inscription.gas_limit, 50_000 + 1_500 * warp.len() as u64);

    let hash = &publication.inscription.hash;
    assert_eq!(publication.warp_url, format!("https://devnet.warps.tools/warp/{hash}"));
    assert_eq!(
        sent[1].transaction().data_str().unwrap(),
        format!("registerAlias@{hash}@6d792d77617270")
    );
    assert_eq!(sent[1].transaction().receiver, registry);

    let alias = publication.alias.unwrap();
    assert_eq!(alias.alias_url, "https://devnet.warps.tools/warp/alias/my-warp");
    assert!(alias.error.is_none());
    assert_eq!(alias.submission.unwrap().nonce, 12);
}

#[tokio::test(start_paused = true)]
async fn alias_failure_does_not_fail_publish() {
    let mock = MockProvider::new();
    mock.push_outcome(ScriptedOutcome::success());
    mock.push_outcome(ScriptedOutcome::with_result(failed_result()));
    let (_dir, mut pipeline) = open(&mock, config()).await;

    let request = AliasRequest {
        alias: "taken".into(),
        registry: Address::from_bytes([0xbb; 32]),
        fee: 0,
    };
    let publication = pipeline
        .publish_with_alias("{}", Some(&request), &[])
        .await
        .unwrap();

    assert!(publication.inscription.succeeded());
    let alias = publication.alias.unwrap();
    assert_eq!(alias.error.as_deref(), Some("transaction failed"));
}

#[tokio::test(start_paused = true)]
async fn publish_without_alias_sends_once() {
    let mock = MockProvider::new();
    let (_dir, mut pipeline) = open(&mock, config()).await;

    let started = Instant::now();
    let publication = pipeline.publish_with_alias("{}", None, &[]).await.unwrap();
    assert!(publication.alias.is_none());
    assert!(publication.recipient_links.is_empty());
    assert_eq!(mock.sent().len(), 1);
    assert!(started.elapsed() < pipeline.config().propagation_delay);

    let json = serde_json::to_value(&publication).unwrap();
    assert!(json.get("recipient_links").is_none());
}

#[tokio::test(start_paused = true)]
async fn publish_links_each_recipient() {
    let mock = MockProvider::new();
    let cfg = PipelineConfig {
        network: Network::Testnet,
        ..config()
    };
    let (_dir, mut pipeline) = open(&mock, cfg).await;

    let publication = pipeline
        .publish_with_alias("{}", None, &[alice(), dao()])
        .await
        .unwrap();

    let hash = &publication.inscription.hash;
    assert_eq!(publication.warp_url, format!("https://testnet.warps.tools/warp/{hash}"));
    assert_eq!(publication.recipient_links.len(), 2);
    assert_eq!(
        publication.recipient_links[ALICE],
        format!("https://testnet.warps.tools/warp/{hash}?to={ALICE}")
    );
    assert_eq!(
        publication.recipient_links[DAO],
        format!("https://testnet.warps.tools/warp/{hash}?to={DAO}")
    );
    // Links are derived locally; only the inscription is sent.
    assert_eq!(mock.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn inscription_gas_includes_execution_allowance() {
    let mock = MockProvider::new();
    let cfg = PipelineConfig {
        inscription_execution_gas: 250_000,
        ..config()
    };
    let (_dir, mut pipeline) = open(&mock, cfg).await;

    let warp = r#"{"name":"demo"}"#;
    pipeline.publish_with_alias(warp, None, &[]).await.unwrap();

    let sent = mock.sent();
    assert_eq!(
        sent[0].transaction().gas_limit,
        50_000 + 1_500 * warp.len() as u64 + 250_000
    );
}

#[tokio::test(start_paused = true)]
async fn batch_is_sequential_and_reports_each_entry() {
    let mock = MockProvider::new().with_account(alice(), 7);
    let (_dir, mut pipeline) = open(&mock, config()).await;

    let lines = parse_batch_lines("# proposals\nfirst\n\n  second  \nthird\n");
    assert_eq!(lines, vec!["first", "second", "third"]);

    mock.reject_next("insufficient funds");
    mock.push_outcome(ScriptedOutcome::success());
    mock.push_outcome(ScriptedOutcome::with_result(failed_result()));

    let started = Instant::now();
    let report = pipeline.create_proposals(dao(), &lines).await.unwrap();
    assert!(started.elapsed() >= pipeline.config().batch_delay * 2);

    assert_eq!(report.total, 3);
    assert_eq!(report.successful, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.network, Network::Devnet);

    assert_eq!(report.results[0].phase, Some(Phase::Broadcast));
    assert!(report.results[0].hash.is_none());
    assert!(report.results[1].success);
    assert!(!report.results[2].success);
    assert!(report.results[2].hash.is_some());

    // The rejected entry's nonce is re-read, so nothing is skipped.
    let nonces: Vec<u64> = mock.sent().iter().map(|tx| tx.nonce()).collect();
    assert_eq!(nonces, vec![7, 8]);
    assert_eq!(mock.account_queries(), 2);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["contract"], DAO);
    assert_eq!(json["network"], "devnet");
    assert_eq!(json["results"][0]["phase"], "broadcast");
    assert!(json["timestamp"].is_string());
}

#[tokio::test(start_paused = true)]
async fn batch_without_resync_keeps_the_gap() {
    let mock = MockProvider::new().with_account(alice(), 7);
    let cfg = PipelineConfig {
        resync_after_failure: false,
        ..config()
    };
    let (_dir, mut pipeline) = open(&mock, cfg).await;

    mock.reject_next("insufficient funds");
    let lines = vec!["first".to_string(), "second".to_string()];
    let report = pipeline.create_proposals(dao(), &lines).await.unwrap();

    // Nonce 7 was reserved by the rejected entry; the network still expects
    // it, so the second entry (nonce 8) is refused too.
    assert_eq!(report.failed, 2);
    assert_eq!(report.results[1].phase, Some(Phase::Broadcast));
    assert!(report.results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("higherNonceInTx"));
    assert!(mock.sent().is_empty());
    assert_eq!(mock.account_queries(), 1);
    assert_eq!(pipeline.next_nonce(), Some(9));
}

#[tokio::test(start_paused = true)]
async fn unbuildable_entry_does_not_spend_a_nonce() {
    let mock = MockProvider::new().with_account(alice(), 7);
    let (_dir, mut pipeline) = open(&mock, config()).await;

    // 7000 bytes of description need far more than the proposal gas limit.
    let lines = vec!["first".to_string(), "x".repeat(7000), "third".to_string()];
    let report = pipeline.create_proposals(dao(), &lines).await.unwrap();

    assert_eq!(report.successful, 2);
    assert_eq!(report.results[1].phase, Some(Phase::Build));
    assert!(report.results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("gas limit"));
    assert!(report.results[2].success);

    let nonces: Vec<u64> = mock.sent().iter().map(|tx| tx.nonce()).collect();
    assert_eq!(nonces, vec![7, 8]);
    // No resync was needed to close a gap.
    assert_eq!(mock.account_queries(), 1);
    assert_eq!(pipeline.next_nonce(), Some(9));
}

#[tokio::test(start_paused = true)]
async fn batch_fails_whole_only_when_first_sync_fails() {
    let mock = MockProvider::new();
    let (_dir, mut pipeline) = open(&mock, config()).await;
    mock.set_offline(true);

    let err = pipeline
        .create_proposals(dao(), &["one".to_string()])
        .await
        .unwrap_err();
    assert_eq!(err.phase(), Phase::Sync);
}
