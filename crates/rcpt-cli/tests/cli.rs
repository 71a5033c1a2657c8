use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const RECEIPT: &str = "BAR SPORT\nCAFFE 1,20\nTOTALE\n1,20\n";

fn rcpt() -> Command {
    Command::cargo_bin("rcpt").unwrap()
}

/// Temp dir with an empty (all defaults) config file.
fn workspace() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, "{}").unwrap();
    let config = config.display().to_string();
    (dir, config)
}

fn write(dir: &Path, name: &str, content: &[u8]) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.display().to_string()
}

#[test]
fn check_recognizes_receipt_text() {
    let (dir, config) = workspace();
    let receipt = write(dir.path(), "receipt.txt", b"TOTALE 12.50 EUR cash");

    rcpt()
        .args(["--config", &config, "check", &receipt])
        .assert()
        .success()
        .stdout(predicate::str::contains("Looks like a receipt"))
        .stdout(predicate::str::contains("Total: 12.50"));
}

#[test]
fn check_rejects_plain_text() {
    let (dir, config) = workspace();
    let note = write(dir.path(), "note.txt", b"hello world");

    rcpt()
        .args(["--config", &config, "check", &note])
        .assert()
        .success()
        .stdout(predicate::str::contains("Does not look like a receipt"));
}

#[test]
fn check_missing_file_fails() {
    let (_dir, config) = workspace();

    rcpt()
        .args(["--config", &config, "check", "does-not-exist.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn process_heuristic_json() {
    let (dir, config) = workspace();
    let receipt = write(dir.path(), "receipt.txt", RECEIPT.as_bytes());

    rcpt()
        .args(["--config", &config, "process", &receipt, "--strategy", "heuristic"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""description": "BAR SPORT""#))
        .stdout(predicate::str::contains(r#""amount": "1.20""#))
        .stdout(predicate::str::contains(r#""currency": "EUR""#));
}

#[test]
fn process_blank_transcript() {
    let (dir, config) = workspace();
    let blank = write(dir.path(), "blank.txt", b"   \n");

    rcpt()
        .args(["--config", &config, "process", &blank, "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Description: No text found in image"))
        .stdout(predicate::str::contains("Amount: -"));
}

#[test]
fn process_appends_expense_row() {
    let (dir, config) = workspace();
    let receipt = write(dir.path(), "receipt.txt", RECEIPT.as_bytes());
    let sheet = dir.path().join("expenses.csv");
    let sheet_arg = sheet.display().to_string();

    for _ in 0..2 {
        rcpt()
            .args([
                "--config",
                &config,
                "process",
                &receipt,
                "--strategy",
                "heuristic",
                "--append",
                &sheet_arg,
                "--category",
                "Food",
                "--date",
                "2024-05-01",
            ])
            .assert()
            .success();
    }

    let content = fs::read_to_string(&sheet).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "date,description,amount,currency,category,method");
    assert_eq!(lines[1], "2024-05-01,BAR SPORT,1.20,EUR,Food,card");
    assert_eq!(lines[2], lines[1]);
}

#[test]
fn process_missing_model_fails() {
    let (dir, config) = workspace();
    let receipt = write(dir.path(), "receipt.txt", RECEIPT.as_bytes());
    let model = dir.path().join("missing.onnx").display().to_string();

    rcpt()
        .args(["--config", &config, "process", &receipt, "--model", &model])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load model"));
}

#[test]
fn batch_reports_failed_items_and_continues() {
    let (dir, config) = workspace();
    write(dir.path(), "a.txt", RECEIPT.as_bytes());
    write(dir.path(), "b.txt", &[0xff, 0xfe, 0x00, 0xc3]);
    write(dir.path(), "c.txt", b"EDICOLA\nTOTALE\n3,00");
    let pattern = dir.path().join("*.txt").display().to_string();
    let summary = dir.path().join("summary.csv");
    let summary_arg = summary.display().to_string();

    rcpt()
        .args([
            "--config",
            &config,
            "batch",
            &pattern,
            "--strategy",
            "heuristic",
            "--summary",
            &summary_arg,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Error processing image"))
        .stdout(predicate::str::contains(r#""amount": "3.00""#))
        .stderr(predicate::str::contains("2 succeeded, 1 failed"));

    let content = fs::read_to_string(&summary).unwrap();
    assert_eq!(content.lines().count(), 4);
    assert!(content.lines().nth(1).unwrap().ends_with("BAR SPORT,1.20,"));
}

#[test]
fn batch_without_matches_fails() {
    let (dir, config) = workspace();
    let pattern = dir.path().join("*.jpg").display().to_string();

    rcpt()
        .args(["--config", &config, "batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn config_init_get_set() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nested").join("config.json");
    let config_arg = config.display().to_string();

    rcpt()
        .args(["--config", &config_arg, "config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    rcpt()
        .args(["--config", &config_arg, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    rcpt()
        .args(["--config", &config_arg, "config", "get", "extraction.description_window"])
        .assert()
        .success()
        .stdout(predicate::str::diff("20\n"));

    rcpt()
        .args(["--config", &config_arg, "config", "set", "sheet.currency", "USD"])
        .assert()
        .success();

    rcpt()
        .args(["--config", &config_arg, "config", "get", "sheet.currency"])
        .assert()
        .success()
        .stdout(predicate::str::diff("\"USD\"\n"));
}

#[test]
fn config_rejects_unknown_keys_and_bad_values() {
    let (_dir, config) = workspace();

    rcpt()
        .args(["--config", &config, "config", "get", "extraction.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));

    rcpt()
        .args(["--config", &config, "config", "set", "extraction.strategy", "magic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value"));
}

#[test]
fn config_path_reports_status() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json").display().to_string();

    rcpt()
        .args(["--config", &config, "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not created"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(
        dir.path(),
        "config.json",
        br#"{"extraction": {"description_window": 0}}"#,
    );
    let receipt = write(dir.path(), "receipt.txt", RECEIPT.as_bytes());

    rcpt()
        .args(["--config", &config, "check", &receipt])
        .assert()
        .failure()
        .stderr(predicate::str::contains("description_window must be positive"));
}
