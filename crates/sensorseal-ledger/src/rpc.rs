//! JSON-RPC ledger client.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::LedgerError;
use crate::ledger::{Commitment, FetchedTransaction, Ledger};
use crate::pubkey::{Blockhash, Pubkey, TxSignature};
use crate::transaction::CompiledInstruction;

/// Default wait for a submitted transaction to confirm.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);
/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Endpoint and confirmation policy.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// JSON-RPC endpoint.
    pub url: Url,
    /// Level `submit_transaction` waits for.
    pub commitment: Commitment,
    /// Give up waiting for confirmation after this long.
    pub confirm_timeout: Duration,
    /// Delay between status polls.
    pub poll_interval: Duration,
}

impl RpcConfig {
    /// Config with default commitment and timing.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            commitment: Commitment::default(),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// [`Ledger`] over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcLedger {
    client: reqwest::Client,
    config: RpcConfig,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct BlockhashValue {
    blockhash: Blockhash,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    err: Option<Value>,
    confirmation_status: Option<String>,
}

#[derive(Deserialize)]
struct TransactionResponse {
    slot: u64,
    transaction: TransactionBody,
    meta: Option<TransactionMeta>,
}

#[derive(Deserialize)]
struct TransactionBody {
    signatures: Vec<TxSignature>,
    message: TransactionMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionMessage {
    account_keys: Vec<Pubkey>,
    instructions: Vec<UiInstruction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiInstruction {
    program_id_index: u8,
    accounts: Vec<u8>,
    data: String,
}

#[derive(Deserialize)]
struct TransactionMeta {
    err: Option<Value>,
}

enum RpcFailure {
    Transport(String),
    Rpc { code: i64, message: String },
    Decode(String),
}

impl From<RpcFailure> for LedgerError {
    fn from(failure: RpcFailure) -> Self {
        match failure {
            RpcFailure::Transport(reason) => LedgerError::Transport(reason),
            RpcFailure::Rpc { code, message } => {
                LedgerError::InvalidResponse(format!("rpc error {code}: {message}"))
            }
            RpcFailure::Decode(reason) => LedgerError::InvalidResponse(reason),
        }
    }
}

impl RpcLedger {
    /// Creates a client with a fresh connection pool.
    pub fn new(config: RpcConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Endpoint and policy in use.
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, RpcFailure> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self
            .client
            .post(self.config.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcFailure::Transport(format!("{method}: {status} {body}")));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| RpcFailure::Decode(format!("{method}: {e}")))?;
        if let Some(error) = parsed.error {
            return Err(RpcFailure::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        serde_json::from_value(parsed.result)
            .map_err(|e| RpcFailure::Decode(format!("{method}: {e}")))
    }

    async fn signature_status(
        &self,
        signature: &TxSignature,
    ) -> Result<Option<SignatureStatus>, LedgerError> {
        let statuses: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": false }]),
            )
            .await?;
        Ok(statuses.value.into_iter().next().flatten())
    }

    async fn await_confirmation(&self, signature: TxSignature) -> Result<TxSignature, LedgerError> {
        let started = Instant::now();
        let wanted = self.config.commitment;

        loop {
            // The transaction is already sent; a failed poll must not end the wait.
            let status = match self.signature_status(&signature).await {
                Ok(status) => status,
                Err(error) => {
                    warn!(%signature, %error, "status poll failed, retrying");
                    None
                }
            };
            if let Some(status) = status {
                if let Some(err) = status.err {
                    warn!(%signature, %err, "transaction failed on execution");
                    return Err(LedgerError::CommitRejected(format!(
                        "transaction {signature} failed: {err}"
                    )));
                }
                if status
                    .confirmation_status
                    .as_deref()
                    .is_some_and(|s| wanted.is_reached_by(s))
                {
                    info!(
                        %signature,
                        commitment = %wanted,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "transaction confirmed"
                    );
                    return Ok(signature);
                }
            }

            if started.elapsed() >= self.config.confirm_timeout {
                return Err(LedgerError::CommitTimeout {
                    signature,
                    waited: self.config.confirm_timeout,
                });
            }
            sleep(self.config.poll_interval).await;
        }
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn latest_blockhash(&self) -> Result<Blockhash, LedgerError> {
        let latest: WithContext<BlockhashValue> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.config.commitment.as_str() }]),
            )
            .await?;
        Ok(latest.value.blockhash)
    }

    async fn submit_transaction(&self, wire: Vec<u8>) -> Result<TxSignature, LedgerError> {
        debug!(size = wire.len(), "sending transaction");
        let encoded = STANDARD.encode(&wire);
        let signature: TxSignature = self
            .call(
                "sendTransaction",
                json!([encoded, {
                    "encoding": "base64",
                    "preflightCommitment": self.config.commitment.as_str(),
                }]),
            )
            .await
            .map_err(|failure| match failure {
                RpcFailure::Rpc { code, message } => {
                    LedgerError::CommitRejected(format!("rpc error {code}: {message}"))
                }
                other => other.into(),
            })?;

        debug!(%signature, "transaction sent, awaiting confirmation");
        self.await_confirmation(signature).await
    }

    async fn fetch_transaction(
        &self,
        signature: &TxSignature,
    ) -> Result<Option<FetchedTransaction>, LedgerError> {
        // getTransaction does not accept `processed`
        let commitment = self.config.commitment.max(Commitment::Confirmed);
        let response: Option<TransactionResponse> = self
            .call(
                "getTransaction",
                json!([signature.to_string(), {
                    "encoding": "json",
                    "commitment": commitment.as_str(),
                    "maxSupportedTransactionVersion": 0,
                }]),
            )
            .await?;

        let Some(response) = response else {
            return Ok(None);
        };

        let instructions = response
            .transaction
            .message
            .instructions
            .into_iter()
            .map(|ix| {
                let data = bs58::decode(&ix.data).into_vec().map_err(|e| {
                    LedgerError::InvalidResponse(format!("instruction data is not base58: {e}"))
                })?;
                Ok(CompiledInstruction {
                    program_id_index: ix.program_id_index,
                    accounts: ix.accounts,
                    data,
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        Ok(Some(FetchedTransaction {
            slot: response.slot,
            signatures: response.transaction.signatures,
            account_keys: response.transaction.message.account_keys,
            instructions,
            error: response
                .meta
                .and_then(|m| m.err)
                .map(|err| err.to_string()),
        }))
    }

    async fn get_balance(&self, account: &Pubkey) -> Result<u64, LedgerError> {
        let balance: WithContext<u64> = self
            .call(
                "getBalance",
                json!([account.to_string(), { "commitment": self.config.commitment.as_str() }]),
            )
            .await?;
        Ok(balance.value)
    }
}
