//! CLI integration tests for the stint command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Policy checks, encoding and decoding work end to end
//! - Invalid inputs are rejected with appropriate messages
//!
//! Every test passes an explicit `--config` or points `STINT_CONFIG_DIR` at
//! a temp dir, so the user's own config files are never read.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the stint binary.
fn stint() -> Command {
    let mut cmd = Command::cargo_bin("stint").unwrap();
    cmd.env_remove("STINT_CONFIG");
    cmd
}

const SESSION: &str = r#"{
  "id": "s-1",
  "creation_time": "2024-01-01T00:00:00Z",
  "last_accessed_time": "2024-01-01T00:00:00Z",
  "max_inactive_interval_secs": 1800,
  "attributes": { "cart": ["book"] }
}"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn setup(config: &str) -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "stint.toml", config);
    let session = write(dir.path(), "session.json", SESSION);
    (dir, config, session)
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    stint()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("session expiration"));
}

#[test]
fn test_version_displays() {
    stint()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stint"));
}

#[test]
fn test_help_lists_subcommands() {
    stint()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("encode"))
        .stdout(predicate::str::contains("decode"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_unknown_subcommand_fails() {
    stint().arg("frobnicate").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Check Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_check_idle_expires_in() {
    let (_dir, config, session) = setup("[expiration]\nidle_timeout_secs = 60\n");

    stint()
        .arg("--json")
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&session)
        .args(["--at", "2024-01-01T00:00:30Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""decision": "expires-in""#))
        .stdout(predicate::str::contains(r#""remaining_secs": 30"#))
        .stdout(predicate::str::contains(r#""timeout_secs": 30"#))
        .stdout(predicate::str::contains(r#""action": "invalidate""#));
}

#[test]
fn test_check_idle_expired_clamps_timeout() {
    let (_dir, config, session) = setup("[expiration]\nidle_timeout_secs = 60\n");

    stint()
        .arg("--json")
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&session)
        .args(["--at", "2024-01-01T00:01:01Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""decision": "expired""#))
        .stdout(predicate::str::contains(r#""remaining_secs": -1"#))
        .stdout(predicate::str::contains(r#""timeout_secs": 1"#));
}

#[test]
fn test_check_no_idle_defers() {
    let (_dir, config, session) = setup("[expiration]\nidle_timeout_secs = 0\n");

    stint()
        .arg("--json")
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&session)
        .args(["--at", "2024-06-01T00:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""decision": "defer""#))
        .stdout(predicate::str::contains(r#""timeout_secs": null"#));
}

#[test]
fn test_check_fixed_duration_reports_lazy_eviction() {
    let (_dir, config, session) = setup(
        "[expiration]\nidle_timeout_secs = 0\nfixed_duration_secs = 10\naction = \"destroy\"\n",
    );

    stint()
        .arg("--json")
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&session)
        .args(["--at", "2024-01-01T00:00:20Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""decision": "expired""#))
        .stdout(predicate::str::contains(r#""action": "destroy""#))
        .stdout(predicate::str::contains(r#""evicted_on_read": true"#));
}

#[test]
fn test_check_human_output() {
    let (_dir, config, session) = setup("[expiration]\nidle_timeout_secs = 60\n");

    stint()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&session)
        .args(["--at", "2024-01-01T00:00:30Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session s-1"))
        .stdout(predicate::str::contains("expires in 30s"));
}

#[test]
fn test_check_rejects_invalid_session() {
    let (dir, config, _session) = setup("");
    let bad = write(dir.path(), "bad.json", "{ not json");

    stint()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid session JSON"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_dir, config, session) = setup("[region]\nmax_entries = 0\n");

    stint()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&session)
        .assert()
        .failure()
        .stderr(predicate::str::contains("region.max_entries"));
}

#[test]
fn test_skipped_config_layer_is_reported() {
    let project = TempDir::new().unwrap();
    let user_dir = TempDir::new().unwrap();
    write(project.path(), "stint.toml", "not valid toml {{{{");
    let session = write(project.path(), "session.json", SESSION);

    stint()
        .current_dir(project.path())
        .env("STINT_CONFIG_DIR", user_dir.path())
        .arg("check")
        .arg(&session)
        .args(["--at", "2024-01-01T00:00:30Z"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Failed to load"))
        .stderr(predicate::str::contains("stint.toml"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Encode / Decode Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_encode_data_frame_starts_with_serializer_id() {
    let (_dir, config, session) = setup("");

    stint()
        .arg("--config")
        .arg(&config)
        .arg("encode")
        .arg(&session)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0bac2bac"));
}

#[test]
fn test_encode_decode_data_round_trip() {
    let (dir, config, session) = setup("");

    let output = stint()
        .arg("--config")
        .arg(&config)
        .arg("encode")
        .arg(&session)
        .output()
        .unwrap();
    assert!(output.status.success());
    let frame = write(dir.path(), "frame.hex", &String::from_utf8(output.stdout).unwrap());

    stint()
        .arg("--json")
        .arg("--config")
        .arg(&config)
        .arg("decode")
        .arg(&frame)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id":"s-1""#))
        .stdout(predicate::str::contains(r#""cart":["book"]"#));
}

#[test]
fn test_encode_decode_structured_round_trip() {
    let (dir, config, session) = setup("");

    let output = stint()
        .arg("--config")
        .arg(&config)
        .args(["encode", "--format", "structured"])
        .arg(&session)
        .output()
        .unwrap();
    assert!(output.status.success());
    let instance = String::from_utf8(output.stdout).unwrap();
    assert!(instance.contains("stint.session.Session"));
    let instance = write(dir.path(), "instance.json", &instance);

    stint()
        .arg("--json")
        .arg("--config")
        .arg(&config)
        .args(["decode", "--format", "structured"])
        .arg(&instance)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id":"s-1""#));
}

#[test]
fn test_encode_without_data_codec_fails() {
    let (_dir, config, session) = setup("[serialization]\ncodecs = [\"session-structured\"]\n");

    stint()
        .arg("--config")
        .arg(&config)
        .arg("encode")
        .arg(&session)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no data serializer"));
}

#[test]
fn test_decode_rejects_bad_hex() {
    let (dir, config, _session) = setup("");
    let bad = write(dir.path(), "bad.hex", "zz-not-hex");

    stint()
        .arg("--config")
        .arg(&config)
        .arg("decode")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid hex"));
}

#[test]
fn test_decode_reads_stdin() {
    let (_dir, config, session) = setup("");

    let output = stint()
        .arg("--config")
        .arg(&config)
        .arg("encode")
        .arg(&session)
        .output()
        .unwrap();

    stint()
        .arg("--json")
        .arg("--config")
        .arg(&config)
        .args(["decode", "-"])
        .write_stdin(output.stdout)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id":"s-1""#));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_includes_defaults() {
    let (_dir, config, _session) = setup("[expiration]\nidle_timeout_secs = 90\n");

    stint()
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("idle_timeout_secs = 90"))
        .stdout(predicate::str::contains("max_entries = 10000"));
}

#[test]
fn test_config_which_json() {
    let (_dir, config, _session) = setup("");

    stint()
        .arg("--json")
        .arg("--config")
        .arg(&config)
        .args(["config", "which"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""loaded": true"#));
}

#[test]
fn test_config_init_creates_and_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    stint()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("[expiration]"));
    assert!(contents.contains("session-data"));

    stint()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}
