//! Exit statuses of the `corral` binary.
//!
//! The failures below are all detected before any namespace is created,
//! so they run unprivileged. The full launch needs root and a real image.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;
use std::process::{Command, Output};

fn corral(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_corral"))
        .current_dir(dir)
        .env_remove("CORRAL_IMAGES")
        .env_remove("CORRAL_CONTAINERS")
        .env_remove("CORRAL_CONFIG")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn missing_command_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = corral(dir.path(), &["alpine"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn malformed_memory_limit_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = corral(dir.path(), &["--mem", "12x", "alpine", "/bin/true"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!dir.path().join("containers").exists());
}

#[test]
fn malformed_address_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = corral(
        dir.path(),
        &["--container-addr", "10.10.10.2", "alpine", "/bin/true"],
    );
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_image_is_a_setup_failure() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("images")).unwrap();

    let output = corral(dir.path(), &["alpine", "/bin/true"]);

    assert_eq!(output.status.code(), Some(125));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("alpine"), "stderr: {stderr}");
    assert!(!dir.path().join("containers").exists());
    assert!(!dir.path().join("images/alpine").exists());
}

#[test]
fn unreadable_config_is_a_setup_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = corral(
        dir.path(),
        &["--config", "missing.json", "alpine", "/bin/true"],
    );
    assert_eq!(output.status.code(), Some(125));
}

/// Runs a real container. Needs root, cgroup v1 and an image directory
/// named by `CORRAL_TEST_IMAGES` holding `alpine.tar.gz`.
#[test]
#[ignore = "requires root and CORRAL_TEST_IMAGES"]
fn command_status_is_propagated() {
    let images = std::env::var("CORRAL_TEST_IMAGES").unwrap();
    let dir = tempfile::tempdir().unwrap();

    let output = corral(
        dir.path(),
        &["-i", &images, "alpine", "/bin/sh", "-c", "test \"$(hostname)\" = \"$HOSTNAME\" && exit 7"],
    );

    assert_eq!(output.status.code(), Some(7));
    assert!(Path::new(&images).join("alpine/bin").is_dir());
}

#[test]
#[ignore = "requires root and CORRAL_TEST_IMAGES"]
fn unknown_program_is_a_setup_failure() {
    let images = std::env::var("CORRAL_TEST_IMAGES").unwrap();
    let dir = tempfile::tempdir().unwrap();

    let output = corral(dir.path(), &["-i", &images, "alpine", "no-such-program"]);

    assert_eq!(output.status.code(), Some(125));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no-such-program"));
}
