//! The result tree a run produces.
//!
//! Reports mirror the descriptor tree: one [`FixtureReport`] per executed
//! fixture, in declaration order, each holding its tests' results and its
//! children's reports.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::context::CapturedOutput;
use crate::descriptor::{Apartment, FixtureId, TestId, TestKind};
use crate::reconcile::{reconcile, rollup, theory_rollup, GroupOutcome, Verdict};
use crate::signal::Signal;

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// The outcome of one test invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub id: TestId,
    pub name: String,
    pub full_name: String,
    pub method: String,
    pub method_full_name: String,
    pub kind: TestKind,
    pub verdict: Verdict,
    /// Every recorded signal, in order.
    pub signals: Vec<Signal>,
    /// The message explaining the verdict, if any.
    pub message: Option<String>,
    pub output: CapturedOutput,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    pub apartment: Apartment,
    pub thread: String,
}

/// A one-time hook's recorded signals and reduced verdict.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HookReport {
    pub ran: bool,
    pub signals: Vec<Signal>,
}

impl HookReport {
    pub fn verdict(&self) -> Verdict {
        reconcile(&self.signals)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FixtureReport {
    pub id: FixtureId,
    pub name: String,
    pub full_name: String,
    pub setup: HookReport,
    pub teardown: HookReport,
    pub tests: Vec<ExecutionResult>,
    pub children: Vec<FixtureReport>,
    /// Text written by the one-time hooks.
    pub output: CapturedOutput,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl FixtureReport {
    /// Every result in this fixture and its children, depth first.
    pub fn all_results(&self) -> Vec<&ExecutionResult> {
        let mut out: Vec<&ExecutionResult> = self.tests.iter().collect();
        for child in &self.children {
            out.extend(child.all_results());
        }
        out
    }

    /// The rollup over every test in the subtree.
    pub fn outcome(&self) -> GroupOutcome {
        rollup(self.all_results().into_iter().map(|r| r.verdict))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub fixtures: Vec<FixtureReport>,
    pub discovery_errors: Vec<String>,
    pub seed: u64,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl RunReport {
    pub fn all_results(&self) -> Vec<&ExecutionResult> {
        self.fixtures.iter().flat_map(|f| f.all_results()).collect()
    }

    pub fn find(&self, full_name: &str) -> Option<&ExecutionResult> {
        self.all_results()
            .into_iter()
            .find(|r| r.full_name == full_name)
    }

    pub fn find_fixture(&self, full_name: &str) -> Option<&FixtureReport> {
        fn walk<'a>(reports: &'a [FixtureReport], full_name: &str) -> Option<&'a FixtureReport> {
            reports.iter().find_map(|r| {
                if r.full_name == full_name {
                    Some(r)
                } else {
                    walk(&r.children, full_name)
                }
            })
        }
        walk(&self.fixtures, full_name)
    }

    /// The rollup of every case of one method. Theories fail when every case
    /// was inconclusive.
    pub fn method_outcome(&self, method_full_name: &str) -> GroupOutcome {
        let cases: Vec<&ExecutionResult> = self
            .all_results()
            .into_iter()
            .filter(|r| r.method_full_name == method_full_name)
            .collect();
        let verdicts = cases.iter().map(|r| r.verdict);
        if cases.iter().any(|r| r.kind == TestKind::Theory) {
            theory_rollup(verdicts)
        } else {
            rollup(verdicts)
        }
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for result in self.all_results() {
            summary.add(result.verdict);
        }
        summary
    }
}

// =====================
// Summary
// =====================

/// Counts per verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub inconclusive: usize,
    pub ignored: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl Summary {
    pub fn add(&mut self, verdict: Verdict) {
        let slot = match verdict {
            Verdict::Passed => &mut self.passed,
            Verdict::Failed => &mut self.failed,
            Verdict::Warning => &mut self.warnings,
            Verdict::Inconclusive => &mut self.inconclusive,
            Verdict::Ignored => &mut self.ignored,
            Verdict::Skipped => &mut self.skipped,
            Verdict::Error => &mut self.errors,
        };
        *slot += 1;
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        match verdict {
            Verdict::Passed => self.passed,
            Verdict::Failed => self.failed,
            Verdict::Warning => self.warnings,
            Verdict::Inconclusive => self.inconclusive,
            Verdict::Ignored => self.ignored,
            Verdict::Skipped => self.skipped,
            Verdict::Error => self.errors,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed + self.errors > 0
    }

    pub fn total_tests(&self) -> usize {
        Verdict::ALL.iter().map(|v| self.count(*v)).sum()
    }

    /// Passed tests as a percentage of all tests.
    pub fn success_rate(&self) -> f64 {
        if self.total_tests() == 0 {
            return 0.0;
        }
        (self.passed as f64 / self.total_tests() as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_each_verdict() {
        let mut summary = Summary::default();
        for verdict in [Verdict::Passed, Verdict::Passed, Verdict::Error, Verdict::Skipped] {
            summary.add(verdict);
        }
        assert_eq!(summary.total_tests(), 4);
        assert_eq!(summary.count(Verdict::Passed), 2);
        assert!(summary.has_failures());
        assert_eq!(summary.success_rate(), 50.0);
        assert_eq!(Summary::default().success_rate(), 0.0);
    }
}
