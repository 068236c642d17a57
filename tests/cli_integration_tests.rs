//! CLI Integration Tests
//!
//! Runs the `sav2xlsx` binary with assert_cmd against fixture files.
//!
//! Skipped during coverage builds, where the binaries are not instrumented.

#![cfg(not(coverage))]
#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

mod common;

use assert_cmd::Command;
use calamine::Data;
use common::{read_headers, read_sheet, scenario, Cell, SavBuilder};
use predicates::prelude::*;
use tempfile::TempDir;

fn sav2xlsx() -> Command {
    let mut cmd = Command::cargo_bin("sav2xlsx").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    sav2xlsx()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sav2xlsx"))
        .stdout(predicate::str::contains("batch"));
}

#[test]
fn test_cli_version() {
    sav2xlsx()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sav2xlsx"));
}

#[test]
fn test_cli_requires_input_and_output() {
    sav2xlsx().assert().failure();
    sav2xlsx().arg("only-input.sav").assert().failure();
}

// ═══════════════════════════════════════════════════════════════════════════
// SINGLE FILE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_convert_single_file() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("scenario.sav");
    let output = temp.path().join("scenario.xlsx");
    scenario().write_to(&input);

    sav2xlsx()
        .arg(&input)
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully converted"));

    assert_eq!(read_headers(&output), vec!["Gender", "Date of Birth"]);
}

#[test]
fn test_convert_into_existing_directory() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("wave1.sav");
    let out_dir = temp.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();
    scenario().write_to(&input);

    sav2xlsx().arg(&input).arg(&out_dir).assert().success();

    assert!(out_dir.join("wave1.xlsx").exists());
}

#[test]
fn test_convert_creates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("s.sav");
    let output = temp.path().join("a/b/c/s.xlsx");
    scenario().write_to(&input);

    sav2xlsx().arg(&input).arg(&output).assert().success();
    assert!(output.exists());
}

#[test]
fn test_convert_missing_input_fails() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out.xlsx");

    sav2xlsx()
        .arg(temp.path().join("nope.sav"))
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));

    assert!(!output.exists());
}

#[test]
fn test_convert_flags() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("flags.sav");
    let output = temp.path().join("flags.xlsx");
    SavBuilder::new()
        .numeric("sex", Some("Gender"))
        .numeric("seen", Some("Seen on"))
        .value_labels(&["sex"], vec![(common::Code::Num(1.0), "Male")])
        .row(vec![Cell::Num(1.0), Cell::Num(86_400.0)])
        .write_to(&input);

    sav2xlsx()
        .arg(&input)
        .arg(&output)
        .args(["--raw-values", "--date-column", "seen", "--sheet-name", "Export"])
        .assert()
        .success();

    assert_eq!(
        read_sheet(&output, "Export")[1],
        vec![Data::Float(1.0), Data::String("1582-10-15".to_string())]
    );
}

#[test]
fn test_convert_reports_warnings() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("warn.sav");
    let output = temp.path().join("warn.xlsx");
    SavBuilder::new()
        .date("when", None)
        .row(vec![Cell::Num(1.0e15)])
        .write_to(&input);

    sav2xlsx()
        .arg(&input)
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 warning(s)"))
        .stdout(predicate::str::contains("row 0, column 'when'"));
}

// ═══════════════════════════════════════════════════════════════════════════
// BATCH
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_batch_directory() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    std::fs::create_dir_all(data.join("nested")).unwrap();
    scenario().write_to(&data.join("one.sav"));
    scenario().compressed(true).write_to(&data.join("nested/TWO.SAV"));
    std::fs::write(data.join("readme.txt"), "ignored").unwrap();
    let out = temp.path().join("Converted");

    sav2xlsx()
        .arg("batch")
        .arg(&data)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total files: 2"))
        .stdout(predicate::str::contains("Failed:"));

    assert!(out.join("one.xlsx").exists());
    assert!(out.join("TWO.xlsx").exists());
}

#[test]
fn test_batch_default_output_dir() {
    let temp = TempDir::new().unwrap();
    scenario().write_to(&temp.path().join("in.sav"));

    sav2xlsx()
        .current_dir(temp.path())
        .args(["batch", "in.sav"])
        .assert()
        .success();

    assert!(temp.path().join("Converted/in.xlsx").exists());
}

#[test]
fn test_batch_partial_failure_exits_non_zero() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    std::fs::create_dir(&data).unwrap();
    scenario().write_to(&data.join("good.sav"));
    std::fs::write(data.join("bad.sav"), b"garbage").unwrap();
    let out = temp.path().join("out");

    sav2xlsx()
        .arg("batch")
        .arg(&data)
        .arg("-o")
        .arg(&out)
        .assert()
        .failure()
        .stdout(predicate::str::contains("bad.sav"));

    assert!(out.join("good.xlsx").exists());
    assert!(!out.join("bad.xlsx").exists());
}

#[test]
fn test_batch_nothing_found() {
    let temp = TempDir::new().unwrap();

    sav2xlsx()
        .arg("batch")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No .sav files found"));
}
