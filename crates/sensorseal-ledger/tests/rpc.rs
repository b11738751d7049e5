//! JSON-RPC ledger client against a mock node.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sensorseal_canonical::{ContentIdentifier, Hash32};
use sensorseal_ledger::{
    discriminator, find_commitment, Blockhash, CheckpointCommitter, CheckpointRefs,
    DeviceAccounts, FetchedTransaction, Ledger, LedgerError, Pubkey, RpcConfig, RpcLedger, Signer,
    ThresholdConfig, Transaction, TxSignature, INITIALIZE_DEVICE,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SIGNATURE: TxSignature = TxSignature::new([7u8; 64]);

fn ledger_for(server: &MockServer) -> RpcLedger {
    let mut config = RpcConfig::new(server.uri().parse().unwrap());
    config.confirm_timeout = Duration::from_millis(200);
    config.poll_interval = Duration::from_millis(10);
    RpcLedger::new(config)
}

fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result}))
}

fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": {"code": code, "message": message}
    }))
}

async fn mount(server: &MockServer, rpc_method: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": rpc_method})))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_blockhash(server: &MockServer) {
    mount(
        server,
        "getLatestBlockhash",
        rpc_result(json!({
            "context": {"slot": 10},
            "value": {"blockhash": Blockhash::new([1; 32]).to_string(), "lastValidBlockHeight": 300}
        })),
    )
    .await;
}

fn status(confirmation: &str, err: Value) -> ResponseTemplate {
    rpc_result(json!({
        "context": {"slot": 11},
        "value": [{"slot": 11, "confirmations": null, "err": err, "confirmationStatus": confirmation}]
    }))
}

fn fixture() -> (CheckpointCommitter, CheckpointRefs, Signer, Hash32, ContentIdentifier) {
    (
        CheckpointCommitter::new(Pubkey::new([9; 32])),
        CheckpointRefs {
            device: Pubkey::new([2; 32]),
            checkpoint: Pubkey::new([3; 32]),
        },
        Signer::from_seed([11; 32]),
        Hash32::new([0x5a; 32]),
        ContentIdentifier::parse("bafkreiroot").unwrap(),
    )
}

#[tokio::test]
async fn commit_sends_signed_transaction_and_waits_for_confirmation() {
    let server = MockServer::start().await;
    mount_blockhash(&server).await;
    mount(&server, "sendTransaction", rpc_result(json!(SIGNATURE.to_string()))).await;
    mount(&server, "getSignatureStatuses", status("confirmed", Value::Null)).await;

    let (committer, refs, signer, root, cid) = fixture();
    let signature = committer
        .commit(&ledger_for(&server), &root, &cid, &refs, &signer)
        .await
        .unwrap();
    assert_eq!(signature, SIGNATURE);

    let requests = server.received_requests().await.unwrap();
    let sent = requests
        .iter()
        .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap())
        .find(|body| body["method"] == "sendTransaction")
        .unwrap();
    assert_eq!(sent["params"][1]["encoding"], "base64");

    let wire = STANDARD.decode(sent["params"][0].as_str().unwrap()).unwrap();
    let tx = Transaction::from_wire(&wire).unwrap();
    assert!(tx.verify());
    assert_eq!(tx.message().recent_blockhash, Blockhash::new([1; 32]));

    let found = find_commitment(&FetchedTransaction::from_transaction(&tx, 0), committer.program_id())
        .unwrap();
    assert_eq!(found.merkle_root, root);
    assert_eq!(found.content_identifier, Some(cid));
}

#[tokio::test]
async fn initialize_device_registers_derived_accounts() {
    let server = MockServer::start().await;
    mount_blockhash(&server).await;
    mount(&server, "sendTransaction", rpc_result(json!(SIGNATURE.to_string()))).await;
    mount(&server, "getSignatureStatuses", status("confirmed", Value::Null)).await;

    let (committer, _, signer, _, _) = fixture();
    let cfg = ThresholdConfig {
        max_co2_ppm: 1200,
        ..ThresholdConfig::default()
    };
    let (accounts, signature) = committer
        .initialize_device(&ledger_for(&server), &signer, &cfg)
        .await
        .unwrap();
    assert_eq!(signature, SIGNATURE);
    assert_eq!(
        accounts,
        DeviceAccounts::derive(committer.program_id(), &signer.pubkey()).unwrap()
    );

    let requests = server.received_requests().await.unwrap();
    let sent = requests
        .iter()
        .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap())
        .find(|body| body["method"] == "sendTransaction")
        .unwrap();
    let wire = STANDARD.decode(sent["params"][0].as_str().unwrap()).unwrap();
    let tx = Transaction::from_wire(&wire).unwrap();
    assert!(tx.verify());

    let data = &tx.message().instructions[0].data;
    assert_eq!(data[..8], discriminator(INITIALIZE_DEVICE));
    assert_eq!(data[8..12], 1200u32.to_le_bytes());
}

#[tokio::test]
async fn preflight_rejection_is_commit_rejected() {
    let server = MockServer::start().await;
    mount_blockhash(&server).await;
    mount(
        &server,
        "sendTransaction",
        rpc_error(-32002, "Transaction simulation failed: insufficient funds"),
    )
    .await;

    let (committer, refs, signer, root, cid) = fixture();
    let err = committer
        .commit(&ledger_for(&server), &root, &cid, &refs, &signer)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CommitRejected(msg) if msg.contains("insufficient funds")));
}

#[tokio::test]
async fn execution_error_in_status_is_commit_rejected() {
    let server = MockServer::start().await;
    mount(&server, "sendTransaction", rpc_result(json!(SIGNATURE.to_string()))).await;
    mount(
        &server,
        "getSignatureStatuses",
        status("processed", json!({"InstructionError": [1, {"Custom": 6000}]})),
    )
    .await;

    let err = ledger_for(&server)
        .submit_transaction(vec![0u8; 8])
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CommitRejected(msg) if msg.contains("6000")));
}

#[tokio::test]
async fn unconfirmed_transaction_times_out() {
    let server = MockServer::start().await;
    mount(&server, "sendTransaction", rpc_result(json!(SIGNATURE.to_string()))).await;
    mount(&server, "getSignatureStatuses", status("processed", Value::Null)).await;

    let err = ledger_for(&server)
        .submit_transaction(vec![0u8; 8])
        .await
        .unwrap_err();
    match err {
        LedgerError::CommitTimeout { signature, waited } => {
            assert_eq!(signature, SIGNATURE);
            assert_eq!(waited, Duration::from_millis(200));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unknown_signature_status_keeps_polling_until_confirmed() {
    let server = MockServer::start().await;
    mount(&server, "sendTransaction", rpc_result(json!(SIGNATURE.to_string()))).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "getSignatureStatuses"})))
        .respond_with(rpc_result(json!({"context": {"slot": 1}, "value": [null]})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount(&server, "getSignatureStatuses", status("finalized", Value::Null)).await;

    let signature = ledger_for(&server)
        .submit_transaction(vec![0u8; 8])
        .await
        .unwrap();
    assert_eq!(signature, SIGNATURE);
}

#[tokio::test]
async fn failed_status_poll_after_send_keeps_waiting() {
    let server = MockServer::start().await;
    mount(&server, "sendTransaction", rpc_result(json!(SIGNATURE.to_string()))).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "getSignatureStatuses"})))
        .respond_with(ResponseTemplate::new(503).set_body_string("node busy"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount(&server, "getSignatureStatuses", status("confirmed", Value::Null)).await;

    let signature = ledger_for(&server)
        .submit_transaction(vec![0u8; 8])
        .await
        .unwrap();
    assert_eq!(signature, SIGNATURE);
}

#[tokio::test]
async fn status_polls_failing_until_deadline_time_out() {
    let server = MockServer::start().await;
    mount(&server, "sendTransaction", rpc_result(json!(SIGNATURE.to_string()))).await;
    mount(
        &server,
        "getSignatureStatuses",
        ResponseTemplate::new(503).set_body_string("node busy"),
    )
    .await;

    let err = ledger_for(&server)
        .submit_transaction(vec![0u8; 8])
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CommitTimeout { signature, .. } if signature == SIGNATURE));
}

#[tokio::test]
async fn unreachable_node_is_transport_error() {
    let ledger = RpcLedger::new(RpcConfig::new("http://127.0.0.1:9/".parse().unwrap()));
    assert!(matches!(
        ledger.latest_blockhash().await,
        Err(LedgerError::Transport(_))
    ));
}

#[tokio::test]
async fn fetch_transaction_decodes_json_encoding() {
    let server = MockServer::start().await;
    let (committer, refs, signer, root, cid) = fixture();
    let tx = committer
        .build_transaction(&root, &cid, &refs, &signer, Blockhash::new([1; 32]))
        .unwrap();

    let message = tx.message();
    let instructions: Vec<Value> = message
        .instructions
        .iter()
        .map(|ix| {
            json!({
                "programIdIndex": ix.program_id_index,
                "accounts": ix.accounts,
                "data": bs58::encode(&ix.data).into_string(),
            })
        })
        .collect();
    mount(
        &server,
        "getTransaction",
        rpc_result(json!({
            "slot": 4242,
            "blockTime": 1700000000,
            "meta": {"err": null, "fee": 5000},
            "transaction": {
                "signatures": tx.signatures(),
                "message": {
                    "accountKeys": message.account_keys,
                    "header": {
                        "numRequiredSignatures": 1,
                        "numReadonlySignedAccounts": 0,
                        "numReadonlyUnsignedAccounts": 3
                    },
                    "recentBlockhash": message.recent_blockhash,
                    "instructions": instructions,
                }
            }
        })),
    )
    .await;

    let fetched = ledger_for(&server)
        .fetch_transaction(&tx.signatures()[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched, FetchedTransaction::from_transaction(&tx, 4242));
}

#[tokio::test]
async fn fetch_transaction_returns_none_when_unknown() {
    let server = MockServer::start().await;
    mount(&server, "getTransaction", rpc_result(Value::Null)).await;

    let fetched = ledger_for(&server).fetch_transaction(&SIGNATURE).await.unwrap();
    assert!(fetched.is_none());
}

#[tokio::test]
async fn balance_reads_context_value() {
    let server = MockServer::start().await;
    mount(
        &server,
        "getBalance",
        rpc_result(json!({"context": {"slot": 5}, "value": 1_500_000_000u64})),
    )
    .await;

    let balance = ledger_for(&server)
        .get_balance(&Pubkey::new([1; 32]))
        .await
        .unwrap();
    assert_eq!(balance, 1_500_000_000);
}
