//! CLI guardrails that fire before any database access.
//!
//! GREEN when:
//! - `session set` refuses without `--yes` and rejects odd lengths;
//! - `run` refuses to start without a score source;
//! - `config-hash` prints a hash and refuses literal secrets.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn ltk() -> Command {
    let mut cmd = Command::cargo_bin("ltk").unwrap();
    // Make sure nothing below can reach a real database.
    cmd.env_remove("LTK_DATABASE_URL");
    cmd
}

fn yaml_file(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    f.write_all(body.as_bytes()).unwrap();
    f
}

#[test]
fn session_set_requires_yes() {
    ltk()
        .args(["session", "set", "--length", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("REFUSING SESSION SET"));
}

#[test]
fn session_set_rejects_odd_length() {
    ltk()
        .args(["session", "set", "--length", "5", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is odd"));
}

#[test]
fn run_without_source_is_refused() {
    let cfg = yaml_file("reconciler:\n  min_lane: 1\n  max_lane: 20\n");
    ltk()
        .args(["run", "--once", "--config"])
        .arg(cfg.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no score source configured"));
}

#[test]
fn run_rejects_half_a_lane_range() {
    ltk()
        .args(["run", "--min-lane", "3", "--source-url", "http://127.0.0.1:9/feed.json"])
        .assert()
        .failure();
}

#[test]
fn config_hash_prints_hash_and_canonical_json() {
    let cfg = yaml_file("source:\n  url: https://scores.example.test/feed.json\nreconciler:\n  max_lane: 20\n  min_lane: 1\n");
    ltk()
        .arg("config-hash")
        .arg(cfg.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("config_hash="))
        .stdout(predicate::str::contains(r#"{"reconciler":{"max_lane":20,"min_lane":1}"#));
}

#[test]
fn config_hash_refuses_literal_secrets() {
    let cfg = yaml_file("db:\n  url: postgres://league:hunter2@db/league\n");
    ltk()
        .arg("config-hash")
        .arg(cfg.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"));
}
