mod common;

use common::{run_with, settings};
use verdict::acceptance;
use verdict::demo;
use verdict::reconcile::{GroupOutcome, Verdict};

fn assert_accepted(workers: usize) {
    let (discovery, report) = run_with(&demo::registry(), settings(workers));
    let acceptance = acceptance::verify(&discovery, &report);
    let listed: Vec<String> = acceptance.mismatches.iter().map(ToString::to_string).collect();
    assert!(acceptance.is_success(), "workers {workers}: {listed:#?}");
    assert!(acceptance.checked > 50);
}

#[test]
fn demo_suite_meets_every_expectation_sequentially() {
    assert_accepted(1);
}

#[test]
fn demo_suite_meets_every_expectation_in_parallel() {
    assert_accepted(4);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let (_, sequential) = run_with(&demo::registry(), settings(1));
    let (_, parallel) = run_with(&demo::registry(), settings(4));
    let verdicts = |report: &verdict::report::RunReport| -> Vec<(String, Verdict)> {
        report
            .all_results()
            .iter()
            .map(|r| (r.full_name.clone(), r.verdict))
            .collect()
    };
    assert_eq!(verdicts(&sequential), verdicts(&parallel));
}

#[test]
fn failing_one_time_setup_fixture_is_all_errors() {
    let (_, report) = run_with(&demo::registry(), settings(1));
    let fixture = report
        .find_fixture("NUnitTestDemo.OneTimeSetUpFails")
        .expect("fixture ran");
    assert_eq!(fixture.outcome(), GroupOutcome::Uniform(Verdict::Error));
    assert_eq!(fixture.all_results().len(), 2);
}

#[test]
fn a_wrong_expectation_is_reported_as_a_mismatch() {
    let (discovery, mut report) = run_with(&demo::registry(), settings(1));
    let target = "NUnitTestDemo.SimpleTests.TestSucceeds";
    let flipped = report
        .fixtures
        .iter_mut()
        .flat_map(|f| f.tests.iter_mut())
        .find(|r| r.full_name == target)
        .expect("result present");
    flipped.verdict = Verdict::Failed;

    let acceptance = acceptance::verify(&discovery, &report);
    assert_eq!(acceptance.mismatches.len(), 1);
    assert_eq!(
        acceptance.mismatches[0].to_string(),
        format!("{target}: expected Pass but was Failed")
    );
}

#[test]
fn run_parameters_reach_the_tests() {
    let mut with_params = settings(1).with_filter("Name=DisplayTestParameters");
    with_params.parameter("Environment=staging").unwrap();
    let (_, report) = run_with(&demo::registry(), with_params);
    let result = &report.all_results()[0];
    assert_eq!(result.verdict, Verdict::Passed);
    assert_eq!(result.output.out, "Parameter: Environment = staging\n");
}

#[test]
fn report_serializes_to_json() {
    let (_, report) = run_with(&demo::registry(), settings(1).with_filter("Category=Slow"));
    let json = serde_json::to_value(&report).unwrap();
    let tests = &json["fixtures"][0]["tests"];
    assert_eq!(tests.as_array().map(Vec::len), Some(2));
    assert_eq!(tests[0]["verdict"], "Passed");
    assert!(tests[0]["elapsed_ms"].is_number());
    assert_eq!(json["seed"], common::SEED);
}
