//! The request a caller submits to start a run.

use sensorseal_canonical::{parse_readings, Reading};
use sensorseal_ledger::CheckpointRefs;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PipelineError;
use crate::orchestrator::DEFAULT_CHUNK_SIZE;

/// Device and checkpoint account references as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRefs {
    /// Device account, base58.
    #[serde(default, alias = "devicePubkey")]
    pub device_ref: String,
    /// Checkpoint account, base58.
    #[serde(default, alias = "checkpointPubkey")]
    pub checkpoint_ref: String,
}

impl BatchRefs {
    /// Creates references from base58 strings.
    pub fn new(device_ref: impl Into<String>, checkpoint_ref: impl Into<String>) -> Self {
        Self {
            device_ref: device_ref.into(),
            checkpoint_ref: checkpoint_ref.into(),
        }
    }

    /// Checks presence, then decodes both references.
    pub fn resolve(&self) -> Result<CheckpointRefs, PipelineError> {
        let device = required("deviceRef", &self.device_ref)?;
        let checkpoint = required("checkpointRef", &self.checkpoint_ref)?;
        Ok(CheckpointRefs {
            device: device
                .parse()
                .map_err(|source| PipelineError::InvalidReference {
                    field: "deviceRef",
                    source,
                })?,
            checkpoint: checkpoint
                .parse()
                .map_err(|source| PipelineError::InvalidReference {
                    field: "checkpointRef",
                    source,
                })?,
        })
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, PipelineError> {
    let value = value.trim();
    if value.is_empty() {
        Err(PipelineError::MissingReference(field))
    } else {
        Ok(value)
    }
}

/// `{deviceRef, checkpointRef, chunkSize?, readings[]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Target accounts.
    #[serde(flatten)]
    pub refs: BatchRefs,
    /// Batch size; defaults to [`DEFAULT_CHUNK_SIZE`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<i64>,
    /// Readings, in the order they are to be committed.
    #[serde(default)]
    pub readings: Value,
}

impl RunRequest {
    /// Parses a request body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PipelineError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Effective chunk size.
    pub fn chunk_size(&self) -> Result<usize, PipelineError> {
        match self.chunk_size {
            None => Ok(DEFAULT_CHUNK_SIZE),
            Some(n) => usize::try_from(n)
                .ok()
                .filter(|n| *n > 0)
                .ok_or(PipelineError::InvalidChunkSize),
        }
    }

    /// Validates and decodes the readings.
    ///
    /// A missing, null or empty list is [`PipelineError::EmptyInput`].
    pub fn readings(&self) -> Result<Vec<Reading>, PipelineError> {
        match &self.readings {
            Value::Null => Err(PipelineError::EmptyInput),
            Value::Array(items) if items.is_empty() => Err(PipelineError::EmptyInput),
            other => Ok(parse_readings(other)?),
        }
    }
}
