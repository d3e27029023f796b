//! Integration tests for the command-line interface.
//!
//! These cover argument validation, stdin/file processing, the `--in-place`
//! flag, and configuration loading.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn ppflow() -> Command {
    Command::cargo_bin("ppflow").expect("failed to create cargo command for ppflow")
}

#[test]
fn in_place_requires_a_file() {
    ppflow().arg("--in-place").assert().failure();
}

#[test]
fn header_requires_html() {
    ppflow().args(["--header", "extra.css"]).assert().failure();
}

#[test]
fn version_flag_prints_crate_version() {
    ppflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(format!("ppflow {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn stdin_is_rewrapped_by_default() {
    ppflow()
        .write_stdin("/#\nfoo\n#/\n")
        .assert()
        .success()
        .stdout("/#\n    foo\n#/\n");
}

#[test]
fn html_flag_converts_stdin_to_a_document() {
    ppflow()
        .arg("--html")
        .write_stdin("Hello world.\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<!DOCTYPE html>"))
        .stdout(predicate::str::contains("<p>Hello world.</p>"));
}

#[test]
fn config_file_changes_margins() {
    let dir = tempdir().expect("failed to create temporary directory");
    let config_path = dir.path().join("margins.toml");
    fs::write(&config_path, "blockquote_indent = 2\n").expect("failed to write config");
    ppflow()
        .args(["--config", config_path.to_str().expect("path not UTF-8")])
        .write_stdin("/#\nfoo\n#/\n")
        .assert()
        .success()
        .stdout("/#\n  foo\n#/\n");
}

#[test]
fn in_place_rewrites_file_and_is_idempotent() {
    let dir = tempdir().expect("failed to create temporary directory");
    let file_path = dir.path().join("book.txt");
    fs::write(&file_path, "/#\nfoo\n#/\n").expect("failed to write test file");

    ppflow()
        .arg("--in-place")
        .arg(&file_path)
        .assert()
        .success()
        .stdout("");
    let out = fs::read_to_string(&file_path).expect("failed to read output file");
    assert_eq!(out, "/#\n    foo\n#/\n");

    ppflow()
        .arg("--in-place")
        .arg(&file_path)
        .assert()
        .success();
    let out2 = fs::read_to_string(&file_path).expect("failed to read output file");
    assert_eq!(out2, out);
}

#[test]
fn header_file_is_spliced_into_html_output() {
    let dir = tempdir().expect("failed to create temporary directory");
    let header_path = dir.path().join("extra.css");
    fs::write(&header_path, ".extra {color: red;}").expect("failed to write header");
    ppflow()
        .args(["--html", "--header", header_path.to_str().expect("path not UTF-8")])
        .write_stdin("body text\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(".extra {color: red;}"));
}

#[test]
fn structural_errors_fail_the_run() {
    ppflow()
        .arg("--html")
        .write_stdin("#/\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("#/"));
}
