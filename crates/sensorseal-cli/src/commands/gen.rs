//! Generate command implementation.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sensorseal_canonical::reading::DELIMITER;
use sensorseal_canonical::Reading;
use std::path::Path;

use crate::output::format_json;

/// One synthetic sample in the ranges of an indoor environmental sensor.
fn build_reading<R: Rng>(rng: &mut R, device_id: Option<&str>, ts: u64) -> Reading {
    Reading {
        device_id: device_id.map(str::to_owned),
        ts,
        t_c_x100: 3400 + rng.gen_range(0..250),
        rh_x100: 4500 + rng.gen_range(0..1500),
        p_pa: 100_000 + rng.gen_range(0..500),
        gas: 150 + rng.gen_range(0..30),
    }
}

/// Parses unix seconds or an RFC3339 timestamp.
fn parse_start_ts(value: &str) -> Result<u64, String> {
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(secs);
    }
    let parsed = DateTime::parse_from_rfc3339(value)
        .map_err(|e| format!("Invalid start timestamp: {}", e))?;
    u64::try_from(parsed.timestamp())
        .map_err(|_| format!("Invalid start timestamp: {} is before 1970", value))
}

/// Timestamp of the last of `count` readings, if it fits in `u64`.
fn last_timestamp(start_ts: u64, count: u32) -> Result<u64, String> {
    start_ts
        .checked_add(u64::from(count.saturating_sub(1)))
        .ok_or_else(|| {
            format!(
                "--start-ts {} plus --count {} overflows the timestamp range",
                start_ts, count
            )
        })
}

/// Generates `count` readings one second apart.
///
/// `start_ts + count - 1` must not overflow.
pub fn generate(count: u32, device_id: Option<&str>, start_ts: u64, seed: u64) -> Vec<Reading> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..u64::from(count))
        .map(|i| build_reading(&mut rng, device_id, start_ts + i))
        .collect()
}

pub fn run(
    count: u32,
    device_id: Option<String>,
    start_ts: Option<String>,
    seed: Option<u64>,
    output: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if count == 0 {
        return Err("--count must be at least 1".into());
    }
    if let Some(device_id) = &device_id {
        if device_id.contains(DELIMITER) {
            return Err(format!("Device id must not contain '{}'", DELIMITER).into());
        }
    }
    if let Some(path) = &output {
        if Path::new(path).exists() && !force {
            return Err(format!("File {} already exists. Use --force to overwrite", path).into());
        }
    }

    let start_ts = match start_ts {
        Some(value) => parse_start_ts(&value)?,
        None => u64::try_from(Utc::now().timestamp()).unwrap_or_default(),
    };
    last_timestamp(start_ts, count)?;
    let seed = seed.unwrap_or_else(rand::random);

    let readings = generate(count, device_id.as_deref(), start_ts, seed);
    let rendered = format_json(&readings);

    match output {
        Some(path) => {
            std::fs::write(&path, format!("{}\n", rendered))
                .map_err(|e| format!("Failed to write {}: {}", path, e))?;
            eprintln!("Generated {} readings to {} (seed {})", count, path, seed);
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
