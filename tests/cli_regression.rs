// Regression tests for the `verdict` binary: exit codes, output and
// miette-rendered diagnostics.

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

fn verdict() -> Command {
    let mut cmd = Command::cargo_bin("verdict").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn run_meets_every_expectation_and_prints_a_summary() {
    verdict()
        .args(["run", "--seed", "42", "--no-color"])
        .assert()
        .success()
        .stdout(contains("Test summary: total"))
        .stdout(contains("NUnitTestDemo.SimpleTests.TestSucceeds"))
        .stdout(contains("all").and(contains("checks matched")));
}

#[test]
fn run_in_parallel_also_succeeds() {
    verdict()
        .args(["run", "--seed", "42", "--workers", "4", "--no-color"])
        .assert()
        .success()
        .stdout(contains("Seed: 42"));
}

#[test]
fn json_output_is_a_run_report() {
    let output = verdict()
        .args(["run", "--seed", "3", "--json", "--filter", "Category=Slow"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["seed"], 3);
    assert_eq!(report["fixtures"][0]["tests"].as_array().map(Vec::len), Some(2));
}

#[test]
fn list_prints_test_names_and_states() {
    verdict()
        .args(["list", "--filter", "FullyQualifiedName~SimpleTests"])
        .assert()
        .success()
        .stdout(contains("NUnitTestDemo.SimpleTests.TestIsExplicit [explicit]"))
        .stdout(contains("NUnitTestDemo.SimpleTests.TestFails"))
        .stdout(contains("Theory").not());
}

#[test]
fn list_shows_discovery_errors() {
    verdict()
        .arg("list")
        .assert()
        .success()
        .stdout(contains("Discovery errors:"))
        .stdout(contains("TestCaseWithWrongArgumentCount"));
}

#[test]
fn malformed_filter_is_reported_as_a_diagnostic() {
    verdict()
        .args(["run", "--filter", "Category=Slow & (Name=A"])
        .assert()
        .failure()
        .stderr(contains("verdict::filter::unbalanced").or(contains("unterminated parenthesis")));
}

#[test]
fn zero_workers_are_rejected() {
    verdict()
        .args(["run", "--workers", "0"])
        .assert()
        .failure()
        .stderr(contains("workers must be at least 1"));
}

#[test]
fn malformed_parameter_is_rejected() {
    verdict()
        .args(["run", "--param", "novalue"])
        .assert()
        .failure()
        .stderr(contains("KEY=VALUE"));
}
