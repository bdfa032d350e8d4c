use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("entropic").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("entropic 0.1.0"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("entropic").unwrap();
    cmd.arg("--help").assert().success().stdout(predicate::str::contains(
        "Disrupts cluster nodes and workloads on a schedule",
    ));
}

#[test]
fn test_cli_requires_subcommand() {
    let mut cmd = Command::cargo_bin("entropic").unwrap();
    cmd.assert().failure();
}

#[test]
fn test_verify_missing_plan_is_fatal() {
    let mut cmd = Command::cargo_bin("entropic").unwrap();
    cmd.args(["verify", "--plan", "/nonexistent/testplan.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("testplan.yaml"));
}

#[test]
fn test_verify_empty_plan_succeeds() {
    let mut plan = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        plan,
        r#"
disruption:
  nodes:
    enabled: false
    interval: 10m
  pods:
    enabled: false
    interval: 5m
monitoring:
  enabled: false
  interval: 1m
"#
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("entropic").unwrap();
    cmd.args(["verify", "--plan"])
        .arg(plan.path())
        .assert()
        .success();
}

#[test]
fn test_verify_invalid_plan_is_fatal() {
    let mut plan = tempfile::NamedTempFile::new().unwrap();
    writeln!(plan, "monitoring: [this is not a mapping").unwrap();

    let mut cmd = Command::cargo_bin("entropic").unwrap();
    cmd.args(["verify", "--plan"])
        .arg(plan.path())
        .assert()
        .failure();
}

#[test]
fn test_verify_unreachable_endpoint_exits_nonzero() {
    let mut plan = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        plan,
        r#"
monitoring:
  enabled: true
  interval: 1m
  routes:
    - name: ghost
      namespace: test
      endpoints:
        - url: http://127.0.0.1:9/
          method: GET
          code: 200
"#
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("entropic").unwrap();
    cmd.args(["verify", "--plan"])
        .arg(plan.path())
        .assert()
        .failure();
}
