// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI integration tests.
//!
//! These tests run the actual rbmarshal binary against temp files.

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use common::Stream;
use tempfile::TempDir;

/// Run rbmarshal with arguments
fn run(args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_rbmarshal");
    Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|_| panic!("Failed to run {bin:?}"))
}

/// Run rbmarshal and assert success
fn run_ok(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        output.status.success(),
        "Command failed: {:?}\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run rbmarshal and assert failure
fn run_err(args: &[&str]) -> Output {
    let output = run(args);
    assert!(
        !output.status.success(),
        "Command should have failed but succeeded: {:?}",
        args
    );
    assert_eq!(output.status.code(), Some(1));
    output
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn actors() -> Vec<u8> {
    Stream::new()
        .array(2)
        .nil()
        .object("RPG::Actor", 2)
        .symbol("@id")
        .fixnum(1)
        .symbol("@name")
        .utf8_string("Eric")
        .build()
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_cli_help() {
    let output = run_ok(&["--help"]);
    assert!(output.contains("json"));
    assert!(output.contains("inspect"));
    assert!(output.contains("scan"));
}

#[test]
fn test_cli_version() {
    let output = run_ok(&["--version"]);
    assert!(output.contains("rbmarshal"));
}

#[test]
fn test_cli_invalid_subcommand() {
    let output = run(&["nonexistent"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized") || stderr.contains("unknown"));
}

// ============================================================================
// Json
// ============================================================================

#[test]
fn test_json_stdout() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "Actors.rvdata2", &actors());

    let stdout = run_ok(&["json", &path_str(&file), "--collapse-encoding"]);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([null, {"class": "RPG::Actor", "@id": 1, "@name": "Eric"}])
    );
}

#[test]
fn test_json_output_file_pretty() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "Actors.rvdata2", &actors());
    let out = dir.path().join("actors.json");

    run_ok(&["json", &path_str(&file), "--pretty", "--output", &path_str(&out)]);
    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains('\n'));
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json[1]["class"], "RPG::Actor");
}

#[test]
fn test_json_cycle_policy() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "cycle.rvdata2", &Stream::new().array(1).link(0).build());

    let output = run_err(&["json", &path_str(&file)]);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));

    let stdout = run_ok(&["json", &path_str(&file), "--refs"]);
    assert_eq!(stdout.trim(), r#"[{"$ref":0}]"#);
}

#[test]
fn test_json_shared_refs() {
    let dir = TempDir::new().unwrap();
    let bytes = Stream::new().array(2).string("x").link(1).build();
    let file = write_file(dir.path(), "shared.rvdata2", &bytes);

    let stdout = run_ok(&["json", &path_str(&file)]);
    assert_eq!(stdout.trim(), r#"["x","x"]"#);

    let stdout = run_ok(&["json", &path_str(&file), "--shared-refs"]);
    assert_eq!(stdout.trim(), r#"["x",{"$ref":1}]"#);
}

#[test]
fn test_json_config_file() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "cycle.rvdata2", &Stream::new().array(1).link(0).build());
    let config = write_file(
        dir.path(),
        "rbmarshal.toml",
        b"[projection]\ncycle_policy = \"reference\"\n",
    );

    let stdout = run_ok(&["json", &path_str(&file), "--config", &path_str(&config)]);
    assert_eq!(stdout.trim(), r#"[{"$ref":0}]"#);
}

#[test]
fn test_json_decode_failure() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "bad.rvdata2", &[4, 9, b'0']);

    let output = run_err(&["json", &path_str(&file)]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad.rvdata2"));
    assert!(stderr.contains("04 09"));
}

#[test]
fn test_json_nonexistent_file() {
    run_err(&["json", "/nonexistent/file.rvdata2"]);
}

// ============================================================================
// Inspect
// ============================================================================

#[test]
fn test_inspect() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "Actors.rvdata2", &actors());

    let stdout = run_ok(&["inspect", &path_str(&file)]);
    assert!(stdout.contains("Root: array"));
    assert!(stdout.contains("Symbols: 4"));
    assert!(stdout.contains("Objects: 3"));
    assert!(stdout.contains("[0] RPG::Actor"));
    assert!(stdout.contains("[3] E"));
}

// ============================================================================
// Scan
// ============================================================================

#[test]
fn test_scan_all_ok() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "Actors.rvdata2", &actors());
    write_file(dir.path(), "System.rvdata2", &Stream::new().hash(0).build());
    write_file(dir.path(), "readme.txt", b"not marshal");

    let stdout = run_ok(&["scan", &path_str(dir.path())]);
    assert!(stdout.contains("2 files: 2 ok, 0 failed"));
    assert!(!stdout.contains("readme.txt"));
}

#[test]
fn test_scan_reports_failures() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "Actors.rvdata2", &actors());
    write_file(dir.path(), "Broken.rvdata2", &[4, 8, b'[', 0x07, b'0']);

    let output = run_err(&["scan", &path_str(dir.path())]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FAIL"));
    assert!(stdout.contains("Broken.rvdata2"));
    assert!(stdout.contains("1 failed"));
}

#[test]
fn test_scan_pattern_and_json() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "Map001.rvdata2", &Stream::new().array(1).link(0).build());
    write_file(dir.path(), "Actors.rvdata2", &actors());

    let stdout = run_ok(&["scan", &path_str(dir.path()), "--pattern", "^Actors"]);
    assert!(stdout.contains("1 files: 1 ok"));

    // The cyclic map decodes but fails projection with the default policy
    let output = run_err(&["scan", &path_str(dir.path()), "--json"]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Map001.rvdata2"));
}

#[test]
fn test_scan_empty_directory() {
    let dir = TempDir::new().unwrap();
    let stdout = run_ok(&["scan", &path_str(dir.path())]);
    assert!(stdout.contains("No matching files"));
}
