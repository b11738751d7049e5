//! Integration tests for CLI commands.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const ZERO_KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";
const OTHER_KEY: &str = "AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=";
const DEVICE: &str = "4uQeVj5tqViQh7yWWGStvkEG1Zmhx6uasJtWCJziofM";
const CHECKPOINT: &str = "8qbHbw2BbbTHBW1sbeqakYXVKRQM8Ne7pLK7m6CVfeR";

fn golden_readings() -> Value {
    json!([
        {"deviceId": "m5-core2-01", "ts": 1700000000, "t_c_x100": 2512, "rh_x100": 4830, "p_pa": 100325, "gas": 162},
        {"ts": 1700000001, "t_c_x100": -150, "rh_x100": 5010, "p_pa": 100311, "gas": 158},
        {"deviceId": "m5-core2-01", "ts": 1700000002, "t_c_x100": 2520, "rh_x100": 4825, "p_pa": 100330, "gas": 170}
    ])
}

fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, value.to_string()).unwrap();
    path
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Runs the binary with an empty environment plus `env`.
fn run_cli(args: &[&str], env: &[(&str, &str)]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_sensorseal"))
        .env_clear()
        .envs(env.iter().copied())
        .args(args)
        .output()
        .expect("Failed to execute CLI");

    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();
    (output.status.success(), stdout, stderr)
}

#[test]
fn test_gen_is_deterministic_with_seed() {
    let args = [
        "gen",
        "--count",
        "5",
        "--seed",
        "42",
        "--start-ts",
        "2023-11-14T22:13:20Z",
        "--device-id",
        "m5-core2-01",
    ];
    let (success, first, _) = run_cli(&args, &[]);
    assert!(success);
    let (_, second, _) = run_cli(&args, &[]);
    assert_eq!(first, second);

    let readings: Vec<Value> = serde_json::from_str(&first).unwrap();
    assert_eq!(readings.len(), 5);
    assert_eq!(readings[0]["ts"], 1_700_000_000u64);
    assert_eq!(readings[4]["ts"], 1_700_000_004u64);
    assert_eq!(readings[0]["deviceId"], "m5-core2-01");
}

#[test]
fn test_gen_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("readings.json");
    std::fs::write(&path, "[]").unwrap();

    let (success, _, stderr) = run_cli(
        &["gen", "--count", "3", "--seed", "1", "--output", path_str(&path)],
        &[],
    );
    assert!(!success);
    assert!(stderr.contains("already exists"));

    let (success, _, _) = run_cli(
        &["gen", "--count", "3", "--seed", "1", "--output", path_str(&path), "--force"],
        &[],
    );
    assert!(success);
    let written: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.len(), 3);
}

#[test]
fn test_root_matches_golden_vectors() {
    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "golden.json", &golden_readings());

    let (success, stdout, _) = run_cli(&["root", path_str(&input), "--json"], &[]);
    assert!(success);
    let batches: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        batches,
        json!([{
            "batch": 1,
            "count": 3,
            "merkleRoot": "48ca2c02d903a72ec18bb6a352239e6e7eef4f3320b3653dfb65d44a975c1598"
        }])
    );
}

#[test]
fn test_root_splits_by_chunk_size() {
    let dir = TempDir::new().unwrap();
    let request = json!({"chunkSize": 2, "readings": golden_readings()});
    let input = write_json(&dir, "request.json", &request);

    let (success, stdout, _) = run_cli(&["root", path_str(&input)], &[]);
    assert!(success);
    assert!(stdout.contains("MERKLE_ROOT"));
    assert!(stdout.contains("8f0c7f3d506ddeb7982cfa52289fc937c5630728976d5e6ae0feb6a40313f813"));
    assert!(stdout.contains("b3693bc6fd66ef9a0750de54ea8932afaf9ea4ded4701d7951054c2ecafd8c19"));
}

#[test]
fn test_root_rejects_invalid_reading() {
    let dir = TempDir::new().unwrap();
    let input = write_json(
        &dir,
        "bad.json",
        &json!([{"ts": 1, "t_c_x100": 1, "rh_x100": 1, "p_pa": 1}]),
    );

    let (success, _, stderr) = run_cli(&["root", path_str(&input)], &[]);
    assert!(!success);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("gas"));
}

#[test]
fn test_seal_then_open_round_trips() {
    let dir = TempDir::new().unwrap();
    let document = json!({"batchIndex": 0, "count": 3, "readings": golden_readings()});
    let input = write_json(&dir, "plain.json", &document);
    let env = [("DATA_ENC_KEY_B64", ZERO_KEY)];

    let (success, sealed, _) = run_cli(&["seal", path_str(&input)], &env);
    assert!(success);
    let envelope: Value = serde_json::from_str(&sealed).unwrap();
    assert_eq!(envelope["__type"], "enc+json");
    assert_eq!(envelope["alg"], "AES-256-GCM");
    assert!(!sealed.contains("m5-core2-01"));

    let sealed_path = write_json(&dir, "sealed.json", &envelope);
    let (success, opened, _) = run_cli(&["open", path_str(&sealed_path)], &env);
    assert!(success);
    let opened: Value = serde_json::from_str(&opened).unwrap();
    assert_eq!(opened, document);

    let (success, _, stderr) = run_cli(
        &["open", path_str(&sealed_path)],
        &[("DATA_ENC_KEY_B64", OTHER_KEY)],
    );
    assert!(!success);
    assert!(stderr.contains("authentication failed"));
}

#[test]
fn test_seal_requires_key() {
    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "plain.json", &json!({"a": 1}));

    let (success, _, stderr) = run_cli(&["seal", path_str(&input)], &[]);
    assert!(!success);
    assert!(stderr.contains("DATA_ENC_KEY_B64"));
}

#[test]
fn test_run_rejects_empty_readings_before_config() {
    let dir = TempDir::new().unwrap();
    let request = json!({"deviceRef": DEVICE, "checkpointRef": CHECKPOINT, "readings": []});
    let input = write_json(&dir, "empty.json", &request);

    let (success, stdout, stderr) = run_cli(&["run", path_str(&input)], &[]);
    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("non-empty"));
}

#[test]
fn test_run_requires_references() {
    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "readings.json", &golden_readings());

    let (success, _, stderr) = run_cli(&["run", path_str(&input)], &[]);
    assert!(!success);
    assert!(stderr.contains("deviceRef is required"));
}

#[test]
fn test_run_fails_without_configuration() {
    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "readings.json", &golden_readings());

    let (success, stdout, stderr) = run_cli(
        &[
            "run",
            path_str(&input),
            "--device-ref",
            DEVICE,
            "--checkpoint-ref",
            CHECKPOINT,
        ],
        &[],
    );
    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_verify_rejects_malformed_signature() {
    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "readings.json", &golden_readings());

    let (success, _, stderr) = run_cli(
        &["verify", path_str(&input), "--signature", "not-a-signature"],
        &[],
    );
    assert!(!success);
    assert!(stderr.contains("Invalid signature"));
}

#[test]
fn test_init_derives_device_accounts_offline() {
    // program [9; 32], authority [2; 32]
    let program = "cGfHiC6Kgg3FpFZvgwGcswsCRtp4aBP2fzuXRQPizuN";
    let authority = "8qbHbw2BbbTHBW1sbeqakYXVKRQM8Ne7pLK7m6CVfeR";
    let (success, stdout, stderr) = run_cli(
        &["init", "--authority", authority, "--max-co2-ppm", "1200"],
        &[("PROGRAM_ID", program)],
    );
    assert!(success, "{stderr}");

    let value: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["authority"], authority);
    assert_eq!(value["devicePda"], "HcLhZjNCjmwX7LisAJsidwsUp5vY6VN5LeQBprzTyWNc");
    assert_eq!(value["checkpointPda"], "feX1FqiRmD1yEb1tttXhFqrHzUs9ZiN598AZGRPrakx");
    assert_eq!(value["bumps"]["deviceBump"], 255);
    assert_eq!(value["cfg"]["max_co2_ppm"], 1200);
    assert!(value["signature"].is_null());
}

#[test]
fn test_init_requires_program_id() {
    let (success, _, stderr) = run_cli(
        &["init", "--authority", "8qbHbw2BbbTHBW1sbeqakYXVKRQM8Ne7pLK7m6CVfeR"],
        &[],
    );
    assert!(!success);
    assert!(stderr.contains("PROGRAM_ID"));
}

#[test]
fn test_gen_rejects_timestamps_past_the_range() {
    let (success, stdout, stderr) = run_cli(
        &["gen", "--count", "2", "--seed", "1", "--start-ts", "18446744073709551615"],
        &[],
    );
    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("overflows"));
}
