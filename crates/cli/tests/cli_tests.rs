//! CLI integration tests

use std::process::Command;

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "dpc-cli", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("diamond price serving"),
        "Should show app description"
    );
    assert!(stdout.contains("models"), "Should show models command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("batch"), "Should show batch command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = Command::new("cargo")
        .args(["run", "-p", "dpc-cli", "--", "--version"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("dpc"), "Should show binary name");
}

/// Test that listing models in an empty directory succeeds
#[test]
fn test_models_empty_directory() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = Command::new("cargo")
        .args(["run", "-p", "dpc-cli", "--", "--models-dir"])
        .arg(dir.path())
        .args(["models"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Listing should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No items found"), "Should report no models");
}
