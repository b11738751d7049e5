//! Instruction builders for the checkpoint program and the memo program,
//! plus the program-derived addresses of a device's accounts.

use curve25519_dalek::edwards::CompressedEdwardsY;
use sensorseal_canonical::{ContentIdentifier, Hash32};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::LedgerError;
use crate::pubkey::Pubkey;

/// Memo program (`MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr`).
pub const MEMO_PROGRAM_ID: Pubkey = Pubkey::new([
    5, 74, 83, 90, 153, 41, 33, 6, 77, 36, 232, 113, 96, 218, 56, 124, 124, 53, 181, 221, 188,
    146, 187, 129, 228, 31, 168, 64, 65, 5, 68, 141,
]);

/// System program (`11111111111111111111111111111111`).
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new([0; 32]);

/// Method name of the checkpoint commit entry point.
pub const COMMIT_CHECKPOINT: &str = "commit_checkpoint";

/// Method name of the device registration entry point.
pub const INITIALIZE_DEVICE: &str = "initialize_device";

/// Most seeds one address may be derived from, bump included.
pub const MAX_SEEDS: usize = 16;
/// Longest single seed, bytes.
pub const MAX_SEED_LEN: usize = 32;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Seed prefix of the device account, followed by the authority.
pub const DEVICE_SEED: &[u8] = b"device";
/// Seed prefix of the feed account, followed by the device.
pub const FEED_SEED: &[u8] = b"feed";
/// Seed prefix of the score account, followed by the device.
pub const SCORE_SEED: &[u8] = b"score";
/// Seed prefix of the checkpoint account, followed by the device.
pub const CHECKPOINT_SEED: &[u8] = b"cp";

/// Prefix written in front of the content identifier in the memo.
pub const MEMO_PREFIX: &str = "CID:";

/// One account referenced by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    /// Account address.
    pub pubkey: Pubkey,
    /// Whether the account must sign.
    pub is_signer: bool,
    /// Whether the instruction may modify the account.
    pub is_writable: bool,
}

impl AccountMeta {
    /// Writable account.
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// Read-only account.
    pub fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// Program invocation before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Program to invoke.
    pub program_id: Pubkey,
    /// Accounts in the order the program expects.
    pub accounts: Vec<AccountMeta>,
    /// Opaque instruction data.
    pub data: Vec<u8>,
}

/// First 8 bytes of `sha256("global:" + name)`.
pub fn discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::new()
        .chain_update(b"global:")
        .chain_update(name.as_bytes())
        .finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

fn check_seeds(seeds: &[&[u8]], extra: usize) -> Result<(), LedgerError> {
    if seeds.len() + extra > MAX_SEEDS {
        return Err(LedgerError::InvalidSeeds(format!(
            "{} seeds exceed the limit of {MAX_SEEDS}",
            seeds.len() + extra
        )));
    }
    if let Some(seed) = seeds.iter().find(|seed| seed.len() > MAX_SEED_LEN) {
        return Err(LedgerError::InvalidSeeds(format!(
            "seed of {} bytes exceeds {MAX_SEED_LEN}",
            seed.len()
        )));
    }
    Ok(())
}

fn derive_address(seeds: &[&[u8]], bump: &[u8], program_id: &Pubkey) -> Option<Pubkey> {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);
    let bytes: [u8; 32] = hasher.finalize().into();

    // Valid addresses lie off the ed25519 curve.
    if CompressedEdwardsY(bytes).decompress().is_some() {
        None
    } else {
        Some(Pubkey::new(bytes))
    }
}

/// Address for exactly `seeds` under `program_id`.
///
/// Returns `Ok(None)` when the hash lands on the ed25519 curve.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<Option<Pubkey>, LedgerError> {
    check_seeds(seeds, 0)?;
    Ok(derive_address(seeds, &[], program_id))
}

/// First off-curve address for `seeds` plus a bump byte, trying 255 down to 0.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), LedgerError> {
    check_seeds(seeds, 1)?;
    (0..=u8::MAX)
        .rev()
        .find_map(|bump| derive_address(seeds, &[bump], program_id).map(|address| (address, bump)))
        .ok_or_else(|| {
            LedgerError::InvalidSeeds("no bump yields an off-curve address".to_owned())
        })
}

/// Alert thresholds stored with a device registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThresholdConfig {
    /// Highest acceptable CO2 concentration, ppm.
    pub max_co2_ppm: u32,
    /// Lowest acceptable temperature, centi-degrees Celsius.
    pub t_min_c_x100: i32,
    /// Highest acceptable temperature, centi-degrees Celsius.
    pub t_max_c_x100: i32,
    /// Highest acceptable relative humidity, centi-percent.
    pub rh_max_x100: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            max_co2_ppm: 1000,
            t_min_c_x100: 0,
            t_max_c_x100: 3700,
            rh_max_x100: 8500,
        }
    }
}

impl ThresholdConfig {
    /// Little-endian field encoding, in declaration order.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..4].copy_from_slice(&self.max_co2_ppm.to_le_bytes());
        out[4..8].copy_from_slice(&self.t_min_c_x100.to_le_bytes());
        out[8..12].copy_from_slice(&self.t_max_c_x100.to_le_bytes());
        out[12..].copy_from_slice(&self.rh_max_x100.to_le_bytes());
        out
    }
}

/// Program-derived accounts of one device, with their bump seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAccounts {
    /// Registering authority.
    pub authority: Pubkey,
    /// `["device", authority]`.
    pub device: Pubkey,
    /// `["feed", device]`.
    pub feed: Pubkey,
    /// `["score", device]`.
    pub score: Pubkey,
    /// `["cp", device]`; the account commits are written to.
    pub checkpoint: Pubkey,
    /// Bumps in the order device, feed, score, checkpoint.
    pub bumps: [u8; 4],
}

impl DeviceAccounts {
    /// Derives every account of `authority`'s device under `program_id`.
    pub fn derive(program_id: &Pubkey, authority: &Pubkey) -> Result<Self, LedgerError> {
        let derive = |prefix: &[u8], base: &Pubkey| {
            find_program_address(&[prefix, base.as_bytes().as_slice()], program_id)
        };
        let (device, device_bump) = derive(DEVICE_SEED, authority)?;
        let (feed, feed_bump) = derive(FEED_SEED, &device)?;
        let (score, score_bump) = derive(SCORE_SEED, &device)?;
        let (checkpoint, checkpoint_bump) = derive(CHECKPOINT_SEED, &device)?;

        Ok(Self {
            authority: *authority,
            device,
            feed,
            score,
            checkpoint,
            bumps: [device_bump, feed_bump, score_bump, checkpoint_bump],
        })
    }
}

/// `initialize_device(cfg)` creating every account in `accounts`.
pub fn initialize_device(
    program_id: Pubkey,
    accounts: &DeviceAccounts,
    cfg: &ThresholdConfig,
) -> Instruction {
    let mut data = Vec::with_capacity(8 + 16);
    data.extend_from_slice(&discriminator(INITIALIZE_DEVICE));
    data.extend_from_slice(&cfg.to_bytes());

    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::writable(accounts.authority, true),
            AccountMeta::writable(accounts.device, false),
            AccountMeta::writable(accounts.feed, false),
            AccountMeta::writable(accounts.score, false),
            AccountMeta::writable(accounts.checkpoint, false),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data,
    }
}

/// Memo carrying `CID:<identifier>`, with no accounts.
pub fn memo(cid: &ContentIdentifier) -> Instruction {
    Instruction {
        program_id: MEMO_PROGRAM_ID,
        accounts: Vec::new(),
        data: format!("{MEMO_PREFIX}{cid}").into_bytes(),
    }
}

/// `commit_checkpoint(root)` against the given device and checkpoint accounts.
pub fn commit_checkpoint(
    program_id: Pubkey,
    device: Pubkey,
    checkpoint: Pubkey,
    authority: Pubkey,
    root: &Hash32,
) -> Instruction {
    let mut data = Vec::with_capacity(8 + Hash32::LEN);
    data.extend_from_slice(&discriminator(COMMIT_CHECKPOINT));
    data.extend_from_slice(root.as_bytes());

    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::readonly(device, false),
            AccountMeta::writable(checkpoint, false),
            AccountMeta::readonly(authority, true),
        ],
        data,
    }
}
