use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::{NamedTempFile, TempDir};

fn cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_bzldoc")));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

// -- stdin mode --

#[test]
fn stdin_mode_produces_markdown() {
    let input = std::fs::read_to_string(fixture_path("rule_multi_line.bzl")).unwrap();

    let assert = cmd().write_stdin(input).assert().success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(output.starts_with("<h1>stdin Rules</h1>"), "got: {output}");
    assert!(output.contains("<h2 id=\"multiline\">multiline</h2>"));
    assert!(output.contains("Boolean; Optional"));
}

#[test]
fn stdin_proto_format() {
    let input = std::fs::read_to_string(fixture_path("rule_all_types.bzl")).unwrap();
    let expected = std::fs::read_to_string(fixture_path("rule_all_types.pb")).unwrap();

    let assert = cmd().args(["-f", "proto"]).write_stdin(input).assert().success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(output, expected);
}

#[test]
fn stdin_syntax_error_fails() {
    cmd()
        .write_stdin("r = rule(\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<stdin>:").and(predicate::str::contains("syntax error")));
}

// -- file mode --

#[test]
fn file_mode_creates_output() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .args(["-f", "proto"])
        .arg(fixture_path("rule_all_types.bzl"))
        .assert()
        .success();

    let output = std::fs::read_to_string(dir.path().join("rule_all_types.pb")).unwrap();
    let expected = std::fs::read_to_string(fixture_path("rule_all_types.pb")).unwrap();
    assert_eq!(output, expected);
}

#[test]
fn file_mode_multiple_files() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .arg(fixture_path("rule_private.bzl"))
        .arg(fixture_path("macro_private.bzl"))
        .assert()
        .success();

    assert!(dir.path().join("rule_private.md").exists());
    assert!(dir.path().join("macro_private.md").exists());
}

#[test]
fn file_mode_creates_output_dir() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("docs/rules");

    cmd()
        .args(["-o", nested.to_str().unwrap()])
        .arg(fixture_path("rule_undocumented.bzl"))
        .assert()
        .success();

    assert!(nested.join("rule_undocumented.md").exists());
}

#[test]
fn failing_file_does_not_stop_others() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .arg(fixture_path("syntax_error.bzl"))
        .arg(fixture_path("rule_private.bzl"))
        .arg(fixture_path("eval_error.bzl"))
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("syntax error")
                .and(predicate::str::contains("spaceship"))
                .and(predicate::str::contains("2 of 3 files failed")),
        );

    assert!(dir.path().join("rule_private.md").exists());
    assert!(!dir.path().join("syntax_error.md").exists());
    assert!(!dir.path().join("eval_error.md").exists());
}

#[test]
fn unwritable_output_does_not_stop_others() {
    let dir = TempDir::new().unwrap();
    // A directory in the way of one output file
    std::fs::create_dir(dir.path().join("rule_private.md")).unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .arg(fixture_path("rule_private.bzl"))
        .arg(fixture_path("rule_undocumented.bzl"))
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("failed to write")
                .and(predicate::str::contains("1 of 2 files failed")),
        );

    assert!(dir.path().join("rule_undocumented.md").is_file());
}

#[test]
fn unknown_condition_warns() {
    let dir = TempDir::new().unwrap();
    let mut input = NamedTempFile::with_suffix(".bzl").unwrap();
    input
        .write_all(
            b"load(\"//x:defs.bzl\", \"FLAG\")\n\nif FLAG:\n    r = rule()\nelse:\n    r = rule()\n",
        )
        .unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .arg(input.path().to_str().unwrap())
        .assert()
        .success()
        .stderr(
            predicate::str::contains("WARN")
                .and(predicate::str::contains("condition cannot be determined"))
                .and(predicate::str::contains("line=3")),
        );
}

#[test]
fn unmatched_pattern_is_a_warning() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .arg(fixture_path("rule_private.bzl"))
        .arg("/nonexistent/defs.bzl")
        .assert()
        .success()
        .stderr(predicate::str::contains("no files matched: /nonexistent/defs.bzl"));

    assert!(dir.path().join("rule_private.md").exists());
}

#[test]
fn opaque_attrs_warn_but_succeed() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .arg(fixture_path("shared_attrs.bzl"))
        .assert()
        .success()
        .stderr(predicate::str::contains("WARN"));

    let output = std::fs::read_to_string(dir.path().join("shared_attrs.md")).unwrap();
    assert!(output.contains("<h2 id=\"toolchain\">toolchain</h2>"));
}

// -- output formats --

#[test]
fn file_mode_html_format() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .args(["-f", "html"])
        .arg(fixture_path("rule_macro_mix.bzl"))
        .assert()
        .success();

    let output_path = dir.path().join("rule_macro_mix.html");
    assert!(output_path.exists(), "Should create .html file");
    let output = std::fs::read_to_string(output_path).unwrap();
    assert!(output.contains("<!DOCTYPE html>"));
    assert!(output.contains("example_macro"));
    assert!(output.contains("example_rule"));
}

#[test]
fn file_mode_json_format() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .args(["-f", "json"])
        .arg(fixture_path("rule_macro_mix.bzl"))
        .assert()
        .success();

    let output_path = dir.path().join("rule_macro_mix.json");
    assert!(output_path.exists(), "Should create .json file");
    let output = std::fs::read_to_string(output_path).unwrap();
    assert!(output.contains("\"rule\""));
    assert!(output.contains("\"example_macro\""));
}

#[test]
fn json_input_is_rerendered() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .args(["-f", "proto"])
        .arg(fixture_path("stored.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("SPACESHIP"));

    let output = std::fs::read_to_string(dir.path().join("stored.pb")).unwrap();
    assert!(output.contains("name: \"stored\""));
    assert!(output.contains("type: UNKNOWN"));
}

#[test]
fn directory_input_is_scanned() {
    let input_dir = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    std::fs::copy(
        fixture_path("rule_undocumented.bzl"),
        input_dir.path().join("defs.bzl"),
    )
    .unwrap();
    std::fs::write(input_dir.path().join("BUILD"), "").unwrap();

    cmd()
        .args(["-o", out_dir.path().to_str().unwrap()])
        .arg(input_dir.path().to_str().unwrap())
        .assert()
        .success();

    let entries: Vec<_> = std::fs::read_dir(out_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(out_dir.path().join("defs.md").exists());
}

#[test]
fn temp_file_input() {
    let dir = TempDir::new().unwrap();
    let mut input = NamedTempFile::with_suffix(".bzl").unwrap();
    input
        .write_all(b"def quick(name, size = 1):\n    \"\"\"Quick macro.\"\"\"\n    pass\n")
        .unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .args(["-f", "json"])
        .arg(input.path().to_str().unwrap())
        .assert()
        .success();

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert!(!entries.is_empty(), "Should create output file");
    let output = std::fs::read_to_string(entries[0].path()).unwrap();
    assert!(output.contains("\"Quick macro.\""));
    assert!(output.contains("\"UNKNOWN\""));
}

#[test]
fn invalid_format_fails() {
    let dir = TempDir::new().unwrap();

    cmd()
        .args(["-o", dir.path().to_str().unwrap()])
        .args(["-f", "xml"])
        .arg(fixture_path("rule_private.bzl"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}

#[test]
fn verbose_logs_decisions() {
    cmd()
        .arg("-v")
        .write_stdin(std::fs::read_to_string(fixture_path("rule_private.bzl")).unwrap())
        .assert()
        .success()
        .stderr(predicate::str::contains("skipping private rule"));
}
