//! Verification of verdicts against declared expected-outcome tags.
//!
//! A test's tag is its case-level tag, else its method's, else the nearest
//! enclosing fixture's. A `Mixed` method tag is checked once against the
//! rollup of all the method's cases; a `Mixed` fixture tag against the
//! rollup of the fixture's subtree. Untagged tests are not checked.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::descriptor::{ExpectedOutcome, FixtureDescriptor, TestDescriptor};
use crate::reconcile::GroupOutcome;
use crate::registry::Discovery;
use crate::report::RunReport;

/// One verdict that disagrees with its tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Full name of the test, method or fixture.
    pub target: String,
    pub expected: ExpectedOutcome,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {} but was {}",
            self.target, self.expected, self.actual
        )
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AcceptanceReport {
    /// Number of tests, methods and fixtures checked.
    pub checked: usize,
    pub mismatches: Vec<Mismatch>,
}

impl AcceptanceReport {
    pub fn is_success(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Checks every executed test of `report` against the tags in `discovery`.
pub fn verify(discovery: &Discovery, report: &RunReport) -> AcceptanceReport {
    let mut verifier = Verifier {
        report,
        checked_methods: BTreeSet::new(),
        out: AcceptanceReport::default(),
    };
    for fixture in &discovery.fixtures {
        verifier.fixture(fixture, None);
    }
    verifier.out
}

struct Verifier<'r> {
    report: &'r RunReport,
    checked_methods: BTreeSet<String>,
    out: AcceptanceReport,
}

impl Verifier<'_> {
    fn fixture(&mut self, fixture: &FixtureDescriptor, inherited: Option<ExpectedOutcome>) {
        let Some(fixture_report) = self.report.find_fixture(&fixture.full_name) else {
            return;
        };
        if fixture.expect == Some(ExpectedOutcome::Mixed) {
            let outcome = fixture_report.outcome();
            self.group(&fixture.full_name, outcome);
        }
        let tag = match fixture.expect {
            Some(ExpectedOutcome::Mixed) => None,
            Some(tag) => Some(tag),
            None => inherited,
        };
        for test in &fixture.tests {
            self.test(test, tag);
        }
        for child in &fixture.children {
            self.fixture(child, tag);
        }
    }

    fn test(&mut self, test: &TestDescriptor, fixture_tag: Option<ExpectedOutcome>) {
        let Some(result) = self.report.find(&test.full_name) else {
            return;
        };
        let mixed = Some(ExpectedOutcome::Mixed);
        if test.method_expect == mixed || test.expect == mixed {
            if self.checked_methods.insert(test.method_full_name.clone()) {
                let outcome = self.report.method_outcome(&test.method_full_name);
                self.group(&test.method_full_name, outcome);
            }
            return;
        }
        let Some(tag) = test.expect.or(fixture_tag) else {
            return;
        };
        self.out.checked += 1;
        if tag.verdict() != Some(result.verdict) {
            self.out.mismatches.push(Mismatch {
                target: test.full_name.clone(),
                expected: tag,
                actual: result.verdict.to_string(),
            });
        }
    }

    fn group(&mut self, target: &str, outcome: GroupOutcome) {
        self.out.checked += 1;
        if outcome != GroupOutcome::Mixed {
            self.out.mismatches.push(Mismatch {
                target: target.to_string(),
                expected: ExpectedOutcome::Mixed,
                actual: outcome.to_string(),
            });
        }
    }
}
