//! Corruption recovery tests for pep.
//!
//! These tests verify the system can handle:
//! - Corrupted store blobs
//! - Partial blobs missing fields
//! - Empty files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("pep"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_corrupted_store_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let store_path = data_dir.join("biohack_tools_v1.json");
    fs::write(&store_path, "{ invalid json }}}}").expect("Failed to write corrupted store");

    cli()
        .arg("--data-dir")
        .arg(&data_dir)
        .args(["order", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reconstitution syringes"));

    // The next write replaces the corrupt blob with a valid one
    cli()
        .arg("--data-dir")
        .arg(&data_dir)
        .args(["order", "add-peptide", "BPC-157"])
        .assert()
        .success();

    let contents = fs::read_to_string(&store_path).unwrap();
    let parsed: Result<serde_json::Value, _> = serde_json::from_str(&contents);
    assert!(parsed.is_ok(), "Store should be valid JSON after rewrite");
}

#[test]
fn test_empty_store_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::write(data_dir.join("biohack_tools_v1.json"), "").unwrap();

    cli()
        .arg("--data-dir")
        .arg(&data_dir)
        .args(["order", "show"])
        .assert()
        .success();
}

#[test]
fn test_partial_store_keeps_known_fields() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let blob = r#"{"purchase_draft": {"vendor_name": "Acme"}}"#;
    fs::write(data_dir.join("biohack_tools_v1.json"), blob).unwrap();

    cli()
        .arg("--data-dir")
        .arg(&data_dir)
        .args(["order", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vendor: Acme"))
        .stdout(predicate::str::contains("Bacteriostatic water"));
}

#[test]
fn test_missing_data_dir_is_created() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("does/not/exist");

    cli()
        .arg("--data-dir")
        .arg(&data_dir)
        .args(["order", "add-supply", "Sharps container"])
        .assert()
        .success();

    assert!(data_dir.join("biohack_tools_v1.json").exists());
}
