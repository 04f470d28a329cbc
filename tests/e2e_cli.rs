//! CLI end-to-end tests
//!
//! Tests for the soundforged command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the soundforged binary
#[allow(deprecated)]
fn soundforged_cmd() -> Command {
    Command::cargo_bin("soundforged").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = soundforged_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = soundforged_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("soundforged"))
        .stdout(predicate::str::contains("convert"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = soundforged_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_check_tools_with_missing_transcoder() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        "[transcoder]\nffmpeg_path = \"/nonexistent/ffmpeg_12345\"\n",
    )
    .unwrap();

    let mut cmd = soundforged_cmd();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("✗"))
        .stdout(predicate::str::contains("missing"));
}

#[test]
fn test_cli_validate_valid_config() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[server]\nport = 5050\n").unwrap();

    let mut cmd = soundforged_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("5050"));
}

#[test]
fn test_cli_validate_invalid_config() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[server]\nport = 0\n").unwrap();

    let mut cmd = soundforged_cmd();
    cmd.arg("validate").arg(&config_path).assert().failure();
}

#[test]
fn test_cli_convert_missing_input() {
    let dir = tempdir().unwrap();

    let mut cmd = soundforged_cmd();
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg("does-not-exist.webm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_convert_rejects_unknown_format() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.webm");
    fs::write(&input, b"audio").unwrap();

    let mut cmd = soundforged_cmd();
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg(&input)
        .args(["--format", "ogg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ogg"));
}

#[cfg(unix)]
#[test]
fn test_cli_convert_with_fake_transcoder() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let script = dir.path().join("ffmpeg");
    fs::write(
        &script,
        "#!/bin/sh\nif [ \"$1\" = \"-version\" ]; then echo 'ffmpeg version fake'; exit 0; fi\nfor last; do :; done\ncp \"$2\" \"$last\"\n",
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!("[transcoder]\nffmpeg_path = {:?}\n", script.to_str().unwrap()),
    )
    .unwrap();

    let input = dir.path().join("take.webm");
    fs::write(&input, b"not really audio").unwrap();

    let mut cmd = soundforged_cmd();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("convert")
        .arg(&input)
        .args(["--format", "wav"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uncompressed"));

    assert!(dir.path().join("take.wav").exists());
}
