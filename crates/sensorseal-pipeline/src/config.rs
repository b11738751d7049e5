//! Process configuration, read once at startup.
//!
//! Values are kept as supplied and validated when a component asks for them,
//! so offline commands do not need ledger or store settings.

use std::fmt;
use std::time::Duration;

use sensorseal_envelope::{EnvelopeError, EnvelopeKey};
use sensorseal_ledger::{resolve_signer, Commitment, Pubkey, RpcConfig, Signer, SignerSources};
use sensorseal_store::{PinataConfig, DEFAULT_GATEWAY_URL, DEFAULT_PIN_URL};
use url::Url;

use crate::errors::PipelineError;

/// Default confirmation deadline, seconds.
pub const DEFAULT_COMMIT_TIMEOUT_SECS: u64 = 60;

/// Immutable configuration shared by every run in the process.
#[derive(Clone)]
pub struct Settings {
    data_key_b64: Option<String>,
    signer: SignerSources,
    pinata_jwt: Option<String>,
    pin_url: Url,
    gateway_url: Url,
    rpc_url: Option<Url>,
    program_id: Option<Pubkey>,
    commit_timeout: Duration,
    commitment: Commitment,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("data_key_b64", &self.data_key_b64.as_ref().map(|_| "<redacted>"))
            .field("signer", &self.signer)
            .field("pinata_jwt", &self.pinata_jwt.as_ref().map(|_| "<redacted>"))
            .field("pin_url", &self.pin_url.as_str())
            .field("gateway_url", &self.gateway_url.as_str())
            .field("rpc_url", &self.rpc_url.as_ref().map(Url::as_str))
            .field("program_id", &self.program_id)
            .field("commit_timeout", &self.commit_timeout)
            .field("commitment", &self.commitment)
            .finish()
    }
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads settings through `lookup`, which maps a variable name to its value.
    ///
    /// Blank values count as unset. Malformed URLs, program ids, timeouts and
    /// commitment levels are rejected here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let url = |name: &'static str, value: &str| {
            Url::parse(value).map_err(|e| PipelineError::Config(format!("{name}: {e}")))
        };

        let pin_url = match get("PINATA_API_URL") {
            Some(v) => url("PINATA_API_URL", &v)?,
            None => url("PINATA_API_URL", DEFAULT_PIN_URL)?,
        };
        let gateway_url = match get("PINATA_GATEWAY_URL") {
            Some(v) => url("PINATA_GATEWAY_URL", &v)?,
            None => url("PINATA_GATEWAY_URL", DEFAULT_GATEWAY_URL)?,
        };
        let rpc_url = match get("SOLANA_CLUSTER_URL") {
            Some(v) => Some(url("SOLANA_CLUSTER_URL", &v)?),
            None => get("MAGICBLOCK_ROUTER_URL")
                .map(|v| url("MAGICBLOCK_ROUTER_URL", &v))
                .transpose()?,
        };
        let program_id = get("PROGRAM_ID")
            .map(|v| {
                v.parse::<Pubkey>()
                    .map_err(|e| PipelineError::Config(format!("PROGRAM_ID: {e}")))
            })
            .transpose()?;
        let commit_timeout = match get("COMMIT_TIMEOUT_SECS") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    PipelineError::Config(format!(
                        "COMMIT_TIMEOUT_SECS must be a positive integer (got '{v}')"
                    ))
                })?,
            None => Duration::from_secs(DEFAULT_COMMIT_TIMEOUT_SECS),
        };
        let commitment = get("LEDGER_COMMITMENT")
            .map(|v| {
                v.parse::<Commitment>().map_err(|_| {
                    PipelineError::Config(format!("LEDGER_COMMITMENT: unknown level '{v}'"))
                })
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            data_key_b64: get("DATA_ENC_KEY_B64"),
            signer: SignerSources {
                secret_base58: get("SOLANA_SECRET_BASE58"),
                secret_key_json: get("SOLANA_SECRET_KEY"),
                secret_seed_json: get("SOLANA_SECRET_SEED"),
            },
            pinata_jwt: get("PINATA_JWT"),
            pin_url,
            gateway_url,
            rpc_url,
            program_id,
            commit_timeout,
            commitment,
        })
    }

    /// Symmetric key for batch envelopes.
    pub fn envelope_key(&self) -> Result<EnvelopeKey, PipelineError> {
        let encoded = self.data_key_b64.as_deref().ok_or_else(|| {
            EnvelopeError::InvalidKey("DATA_ENC_KEY_B64 is not set".to_owned())
        })?;
        Ok(EnvelopeKey::from_base64(encoded)?)
    }

    /// Resolves the configured signer credential.
    pub fn signer(&self) -> Result<Signer, PipelineError> {
        Ok(resolve_signer(&self.signer)?)
    }

    /// Content store connection settings.
    pub fn pinata(&self) -> Result<PinataConfig, PipelineError> {
        let jwt = self
            .pinata_jwt
            .clone()
            .ok_or_else(|| PipelineError::Config("PINATA_JWT is not set".to_owned()))?;
        Ok(PinataConfig {
            pin_url: self.pin_url.clone(),
            gateway_url: self.gateway_url.clone(),
            jwt,
        })
    }

    /// Store settings for fetching only. The token is empty when unset.
    pub fn gateway(&self) -> PinataConfig {
        PinataConfig {
            pin_url: self.pin_url.clone(),
            gateway_url: self.gateway_url.clone(),
            jwt: self.pinata_jwt.clone().unwrap_or_default(),
        }
    }

    /// Ledger RPC settings.
    pub fn rpc(&self) -> Result<RpcConfig, PipelineError> {
        let url = self.rpc_url.clone().ok_or_else(|| {
            PipelineError::Config(
                "SOLANA_CLUSTER_URL or MAGICBLOCK_ROUTER_URL is not set".to_owned(),
            )
        })?;
        let mut config = RpcConfig::new(url);
        config.commitment = self.commitment;
        config.confirm_timeout = self.commit_timeout;
        Ok(config)
    }

    /// Checkpoint program address.
    pub fn program_id(&self) -> Result<Pubkey, PipelineError> {
        self.program_id
            .ok_or_else(|| PipelineError::Config("PROGRAM_ID is not set".to_owned()))
    }
}
