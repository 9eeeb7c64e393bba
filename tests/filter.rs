mod common;

use common::{run_with, settings};
use miette::Diagnostic;
use verdict::args;
use verdict::demo;
use verdict::errors::{FilterError, VerdictError};
use verdict::filter::Filter;
use verdict::reconcile::Verdict;
use verdict::registry::{CaseDef, FixtureDef, Registry, TestDef};
use verdict::Scheduler;

/// Names of every test a filtered demo run executed.
fn selected(filter: &str) -> Vec<String> {
    let (_, report) = run_with(&demo::registry(), settings(1).with_filter(filter));
    report.all_results().iter().map(|r| r.name.clone()).collect()
}

#[test]
fn category_selects_tagged_tests() {
    assert_eq!(
        selected("TestCategory=Slow"),
        ["TestWithCategory", "TestWithTwoCategories"]
    );
    assert_eq!(
        selected("Category=Slow & Category=Data"),
        ["TestWithTwoCategories"]
    );
}

#[test]
fn property_and_name_conditions() {
    assert_eq!(selected("Priority=High"), ["TestWithProperty"]);
    assert_eq!(
        selected("Priority=High | Action=Ignore"),
        ["TestWithProperty", "TestWithTwoProperties"]
    );
    assert_eq!(selected("Name=TestFails"), ["TestFails"]);
}

#[test]
fn negation_excludes_a_whole_fixture() {
    let names = selected("!(FullyQualifiedName~SimpleTests) & Name~Write");
    assert_eq!(names, ["WriteToConsole", "WriteToError", "WriteToProgress"]);
}

#[test]
fn a_matching_filter_runs_explicit_tests() {
    let (_, report) = run_with(
        &demo::registry(),
        settings(1).with_filter("Name=TestIsExplicit"),
    );
    let results = report.all_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].verdict, Verdict::Passed);
}

#[test]
fn full_name_values_keep_case_arguments() {
    assert_eq!(
        selected("FullyQualifiedName=NUnitTestDemo.ParameterizedTests.TestCaseSucceeds(2,2,4)"),
        ["TestCaseSucceeds(2,2,4)"]
    );
    assert_eq!(
        selected("FullyQualifiedName~TestCaseSucceeds_Result & Name!~31"),
        ["TestCaseSucceeds_Result(2,2)", "TestCaseSucceeds_Result(0,5)"]
    );
}

#[test]
fn full_name_values_match_escaped_string_arguments() {
    let fixture = FixtureDef::new("Quotes", |_| ()).test(
        TestDef::cases("Echo", 1, |_, _, _| Ok(()))
            .case(CaseDef::new(args!["a\"b"]))
            .case(CaseDef::new(args!["ab"])),
    );
    let registry = Registry::new().register(fixture);
    let (_, report) = run_with(
        &registry,
        settings(1).with_filter(r#"FullyQualifiedName=Quotes.Echo("a\"b")"#),
    );
    let names: Vec<&str> = report.all_results().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, [r#"Echo("a\"b")"#]);
}

#[test]
fn scheduler_rejects_malformed_filters_with_a_labelled_span() {
    let err = match Scheduler::new(settings(1).with_filter("Category=Slow & (Name=A")) {
        Err(err) => err,
        Ok(_) => panic!("malformed filter accepted"),
    };
    assert!(matches!(
        err,
        VerdictError::Filter(FilterError::Unbalanced { .. })
    ));
    let labels: Vec<_> = err.labels().map(|l| l.collect()).unwrap_or_default();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].offset(), 16);
    assert!(err.source_code().is_some());
}

#[test]
fn filters_display_in_canonical_form() {
    let filter = Filter::parse("Category=Slow&(Name=A|Name=B)").unwrap();
    assert_eq!(filter.to_string(), "(TestCategory=Slow & (Name=A | Name=B))");
    assert_eq!(Filter::parse(&filter.to_string()).unwrap(), filter);
}
