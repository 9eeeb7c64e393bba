mod common;

use common::{result, run};
use verdict::demo;
use verdict::reconcile::{GroupOutcome, Verdict};
use verdict::registry::{FixtureDef, Registry, TestDef};
use verdict::signal::Signal;
use verdict::value::ArgKind;

fn simple(name: &str) -> String {
    format!("NUnitTestDemo.SimpleTests.{name}")
}

fn failures(signals: &[Signal]) -> usize {
    signals
        .iter()
        .filter(|s| matches!(s, Signal::Failure(_)))
        .count()
}

#[test]
fn multiple_assertions_record_every_failure() {
    let (_, report) = run(&demo::registry());
    let three = result(&report, &simple("TestWithThreeFailures"));
    assert_eq!(three.verdict, Verdict::Failed);
    assert_eq!(failures(&three.signals), 3);
    assert_eq!(three.message.as_deref(), Some("Failure 1"));

    let errored = result(&report, &simple("TestWithTwoFailuresAndAnError"));
    assert_eq!(errored.verdict, Verdict::Error);
    assert_eq!(failures(&errored.signals), 2);
    assert_eq!(errored.message.as_deref(), Some("Throwing after two failures"));
}

#[test]
fn warnings_and_exits() {
    let (_, report) = run(&demo::registry());

    let warns = result(&report, &simple("TestWarnsThreeTimes"));
    assert_eq!(warns.verdict, Verdict::Warning);
    assert_eq!(warns.signals.len(), 3);
    assert_eq!(warns.message.as_deref(), Some("Warning 1"));

    let failed = result(&report, &simple("TestWithFailureAndWarning"));
    assert_eq!(failed.verdict, Verdict::Failed);
    assert_eq!(failed.message.as_deref(), Some("FAILING!"));

    let passed = result(&report, &simple("TestSucceeds_Message"));
    assert_eq!(passed.verdict, Verdict::Passed);
    assert_eq!(passed.message.as_deref(), Some("Simple arithmetic!"));

    assert_eq!(
        result(&report, &simple("TestIsInconclusive")).verdict,
        Verdict::Inconclusive
    );
    assert_eq!(
        result(&report, &simple("TestIsIgnored_Assert")).verdict,
        Verdict::Ignored
    );
}

#[test]
fn failure_messages_show_expected_and_actual() {
    let (_, report) = run(&demo::registry());
    let message = result(&report, &simple("TestFails_StringEquality"))
        .message
        .clone()
        .unwrap();
    assert!(message.contains("Hello World!"), "{message}");
    assert!(message.contains("HelloWorld!"), "{message}");
}

#[test]
fn theory_rollups() {
    let (_, report) = run(&demo::registry());
    assert_eq!(
        report.method_outcome("NUnitTestDemo.Theories.Theory_AllCasesSucceed"),
        GroupOutcome::Uniform(Verdict::Passed)
    );
    assert_eq!(
        report.method_outcome("NUnitTestDemo.Theories.Theory_SomeCasesFail"),
        GroupOutcome::Mixed
    );
    assert_eq!(
        report.method_outcome("NUnitTestDemo.Theories.Theory_SomeCasesAreInconclusive"),
        GroupOutcome::Mixed
    );
}

#[test]
fn a_theory_with_only_inconclusive_cases_fails() {
    let fixture = FixtureDef::new("T", |_| ()).datapoints([1, 2]).test(TestDef::theory(
        "NeverApplies",
        &[ArgKind::Int],
        |_, ctx, _| ctx.assume(false, "never"),
    ));
    let (_, report) = run(&Registry::new().register(fixture));
    assert_eq!(report.summary().inconclusive, 2);
    assert_eq!(
        report.method_outcome("T.NeverApplies"),
        GroupOutcome::Uniform(Verdict::Failed)
    );
}

#[test]
fn summary_counts_the_demo_run() {
    let (discovery, report) = run(&demo::registry());
    let summary = report.summary();
    assert_eq!(summary.total_tests(), discovery.test_count());
    assert!(summary.has_failures());
    assert!(summary.passed > 0 && summary.warnings > 0 && summary.skipped > 0);
    assert!(summary.success_rate() > 0.0 && summary.success_rate() < 100.0);
}
