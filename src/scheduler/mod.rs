//! The execution scheduler.
//!
//! Walks a [`Discovery`] and produces a [`RunReport`]:
//!
//! - a fixture is instantiated, its one-time setup runs once, then each
//!   selected test runs wrapped in the per-test setup and teardown, then the
//!   child fixtures run with this fixture's instance as ancestor scope state,
//!   and finally the one-time teardown runs once;
//! - a one-time setup that fails or errors marks every contained test
//!   `Error`; one that ignores, skips or is inconclusive cascades as such;
//! - ignored, explicit, platform-excluded and not-runnable tests never run
//!   any hook and reach the reconciler with a preset signal;
//! - work requiring an apartment the current thread lacks is marshalled to
//!   a dedicated thread;
//! - parallelizable sibling fixtures, and the tests of per-test-instance
//!   fixtures, run on worker pools that draw from one budget, so nested
//!   pools never exceed `workers` concurrent items.
//!
//! Report order always equals declaration order.

mod apartment;
mod pool;

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::context::{CapturedOutput, Scopes, TestContext};
use crate::descriptor::{
    Apartment, Condition, FixtureDescriptor, Hook, Instance, LifeCycle, RunState, TestDescriptor,
};
use crate::errors::VerdictError;
use crate::filter::Filter;
use crate::reconcile::{headline, reconcile, Verdict};
use crate::registry::Discovery;
use crate::report::{ExecutionResult, FixtureReport, HookReport, RunReport};
use crate::settings::RunSettings;
use crate::signal::{Abort, Fault, Signal};

/// Observes a run as it happens. Every method defaults to doing nothing.
///
/// Calls may come from several worker threads at once.
pub trait RunListener: Sync {
    fn fixture_started(&self, _fixture: &FixtureDescriptor) {}
    fn test_finished(&self, _result: &ExecutionResult) {}
    fn fixture_finished(&self, _report: &FixtureReport) {}
}

/// A listener that ignores every event.
pub struct Silent;

impl RunListener for Silent {}

static SILENT: Silent = Silent;

/// The message of the preset signal explicit tests get in unfiltered runs.
pub const EXPLICIT: &str = "Explicit";

pub struct Scheduler<'l> {
    settings: RunSettings,
    filter: Option<Filter>,
    listener: &'l dyn RunListener,
    budget: pool::Budget,
}

impl Scheduler<'static> {
    /// Validates `settings` and parses its filter.
    pub fn new(settings: RunSettings) -> Result<Self, VerdictError> {
        settings.validate()?;
        let filter = settings.filter.as_deref().map(Filter::parse).transpose()?;
        let budget = pool::Budget::new(settings.workers);
        Ok(Self {
            settings,
            filter,
            listener: &SILENT,
            budget,
        })
    }
}

impl<'l> Scheduler<'l> {
    pub fn with_listener<'m>(self, listener: &'m dyn RunListener) -> Scheduler<'m> {
        Scheduler {
            settings: self.settings,
            filter: self.filter,
            listener,
            budget: self.budget,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Returns true if a test takes part in this run.
    pub fn selects(&self, test: &TestDescriptor) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(test))
    }

    fn selects_any(&self, fixture: &FixtureDescriptor) -> bool {
        fixture.tests.iter().any(|t| self.selects(t))
            || fixture.children.iter().any(|c| self.selects_any(c))
    }

    /// Runs every selected test of `discovery`.
    pub fn run(&self, discovery: &Discovery) -> RunReport {
        let started = Instant::now();
        tracing::info!(
            tests = discovery.test_count(),
            workers = self.settings.workers,
            seed = discovery.seed,
            filtered = self.filter.is_some(),
            "run started"
        );
        let fixtures = self.run_fixtures(&discovery.fixtures, Scopes::root(), Apartment::Mta);
        let report = RunReport {
            fixtures,
            discovery_errors: discovery.errors.iter().map(ToString::to_string).collect(),
            seed: discovery.seed,
            elapsed: started.elapsed(),
        };
        let summary = report.summary();
        tracing::info!(
            total = summary.total_tests(),
            passed = summary.passed,
            failed = summary.failed,
            errors = summary.errors,
            "run finished"
        );
        report
    }

    // =====================
    // Fixtures
    // =====================

    /// Runs sibling fixtures: parallelizable ones on the pool first, the
    /// rest sequentially, reported in declaration order.
    fn run_fixtures(
        &self,
        fixtures: &[FixtureDescriptor],
        scopes: Scopes<'_>,
        current: Apartment,
    ) -> Vec<FixtureReport> {
        let selected: Vec<&FixtureDescriptor> =
            fixtures.iter().filter(|f| self.selects_any(f)).collect();
        let mut reports: Vec<Option<FixtureReport>> = selected.iter().map(|_| None).collect();

        let parallel: Vec<usize> = if self.settings.workers > 1 && current != Apartment::Sta {
            (0..selected.len())
                .filter(|i| selected[*i].parallelizable)
                .collect()
        } else {
            Vec::new()
        };
        if parallel.len() > 1 {
            let results = pool::run_bounded(&parallel, &self.budget, |i| {
                self.run_fixture(selected[*i], scopes, Apartment::Mta)
            });
            for (i, result) in parallel.iter().zip(results) {
                reports[*i] = Some(result.unwrap_or_else(|fault| {
                    self.preset_fixture(selected[*i], &Signal::Error(fault.message), current)
                }));
            }
        }

        selected
            .iter()
            .zip(reports)
            .map(|(fixture, report)| {
                report.unwrap_or_else(|| self.run_fixture(fixture, scopes, current))
            })
            .collect()
    }

    fn run_fixture(
        &self,
        fixture: &FixtureDescriptor,
        scopes: Scopes<'_>,
        current: Apartment,
    ) -> FixtureReport {
        if let Some(signal) = self.preset_signal(&fixture.run_state, &fixture.conditions) {
            tracing::debug!(fixture = %fixture.full_name, %signal, "fixture not entered");
            return self.preset_fixture(fixture, &signal, current);
        }
        if apartment::needs_thread(fixture.apartment, current) {
            let required = fixture.apartment;
            return apartment::run_on(required, || self.enter_fixture(fixture, scopes, required))
                .unwrap_or_else(|fault| {
                    self.preset_fixture(fixture, &Signal::Error(fault.message), current)
                });
        }
        let here = apartment::effective(fixture.apartment, current);
        self.enter_fixture(fixture, scopes, here)
    }

    fn enter_fixture(
        &self,
        fixture: &FixtureDescriptor,
        scopes: Scopes<'_>,
        current: Apartment,
    ) -> FixtureReport {
        let started = Instant::now();
        self.listener.fixture_started(fixture);
        tracing::debug!(fixture = %fixture.full_name, apartment = %current, "fixture started");

        let mut output = CapturedOutput::default();
        let mut setup = HookReport::default();
        let mut teardown = HookReport::default();
        let tests;
        let children;

        match instantiate(fixture) {
            Err(abort) => {
                setup.ran = true;
                setup.signals = abort.into_signal().into_iter().collect();
                let cascade = cascade_from(&setup.signals).unwrap_or_else(|| {
                    Signal::Error("OneTimeSetUp: fixture could not be constructed".to_string())
                });
                tracing::warn!(fixture = %fixture.full_name, %cascade, "fixture could not be constructed");
                tests = self.preset_tests(fixture, &cascade, current);
                children = self.preset_children(fixture, &cascade, current);
            }
            Ok(mut instance) => {
                let cascade = match &fixture.hooks.one_time_setup {
                    Some(hook) => {
                        setup = self.run_one_time(
                            fixture,
                            hook,
                            &mut instance,
                            scopes,
                            current,
                            &mut output,
                        );
                        cascade_from(&setup.signals)
                    }
                    None => None,
                };

                if let Some(signal) = cascade {
                    tracing::warn!(fixture = %fixture.full_name, %signal, "one-time setup did not succeed");
                    tests = self.preset_tests(fixture, &signal, current);
                    children = self.preset_children(fixture, &signal, current);
                } else {
                    tests = self.run_tests(fixture, &mut instance, scopes, current);
                    let inner = scopes.push(instance.as_ref());
                    children = self.run_fixtures(&fixture.children, inner, current);
                }

                if let Some(hook) = &fixture.hooks.one_time_teardown {
                    teardown = self.run_one_time(
                        fixture,
                        hook,
                        &mut instance,
                        scopes,
                        current,
                        &mut output,
                    );
                    if teardown.verdict().is_failure() {
                        tracing::warn!(fixture = %fixture.full_name, "one-time teardown failed");
                    }
                }
            }
        }

        let report = FixtureReport {
            id: fixture.id.clone(),
            name: fixture.name.clone(),
            full_name: fixture.full_name.clone(),
            setup,
            teardown,
            tests,
            children,
            output,
            elapsed: started.elapsed(),
        };
        tracing::debug!(fixture = %fixture.full_name, outcome = %report.outcome(), "fixture finished");
        self.listener.fixture_finished(&report);
        report
    }

    fn run_one_time(
        &self,
        fixture: &FixtureDescriptor,
        hook: &Hook,
        instance: &mut Instance,
        scopes: Scopes<'_>,
        current: Apartment,
        output: &mut CapturedOutput,
    ) -> HookReport {
        let mut ctx = TestContext::new(
            &fixture.full_name,
            &fixture.name,
            current,
            &self.settings.parameters,
            scopes,
        );
        invoke_hook(hook, instance, &mut ctx);
        let (signals, captured) = ctx.into_parts();
        append_output(output, captured);
        HookReport { ran: true, signals }
    }

    // =====================
    // Tests
    // =====================

    fn run_tests(
        &self,
        fixture: &FixtureDescriptor,
        instance: &mut Instance,
        scopes: Scopes<'_>,
        current: Apartment,
    ) -> Vec<ExecutionResult> {
        let selected: Vec<&TestDescriptor> =
            fixture.tests.iter().filter(|t| self.selects(t)).collect();

        if fixture.lifecycle == LifeCycle::SingleInstance {
            return selected
                .into_iter()
                .map(|test| self.run_test(fixture, test, instance, scopes, current))
                .collect();
        }

        // Per-test instances: the fixture instance stays readable as scope.
        let shared = scopes.push(&**instance);
        let fresh = |test: &TestDescriptor, current: Apartment| match instantiate(fixture) {
            Ok(mut own) => self.run_test(fixture, test, &mut own, shared, current),
            Err(abort) => {
                let signal = abort.into_signal().unwrap_or(Signal::Error(String::new()));
                self.preset_test(test, &signal, current)
            }
        };
        if self.settings.workers > 1 && current != Apartment::Sta && selected.len() > 1 {
            pool::run_bounded(&selected, &self.budget, |test| {
                fresh(test, Apartment::Mta)
            })
            .into_iter()
            .zip(&selected)
            .map(|(result, test)| {
                result.unwrap_or_else(|fault| {
                    self.preset_test(test, &Signal::Error(fault.message), current)
                })
            })
            .collect()
        } else {
            selected.into_iter().map(|test| fresh(test, current)).collect()
        }
    }

    fn run_test(
        &self,
        fixture: &FixtureDescriptor,
        test: &TestDescriptor,
        instance: &mut Instance,
        scopes: Scopes<'_>,
        current: Apartment,
    ) -> ExecutionResult {
        if let Some(signal) = self.preset_signal(&test.run_state, &test.conditions) {
            return self.preset_test(test, &signal, current);
        }
        if apartment::needs_thread(test.apartment, current) {
            let required = test.apartment;
            let marshalled = apartment::run_on(required, || {
                self.execute(fixture, test, instance, scopes, required)
            });
            return marshalled.unwrap_or_else(|fault| {
                self.preset_test(test, &Signal::Error(fault.message), current)
            });
        }
        let here = apartment::effective(test.apartment, current);
        self.execute(fixture, test, instance, scopes, here)
    }

    /// Setup, body and teardown of one test on the current thread.
    fn execute(
        &self,
        fixture: &FixtureDescriptor,
        test: &TestDescriptor,
        instance: &mut Instance,
        scopes: Scopes<'_>,
        current: Apartment,
    ) -> ExecutionResult {
        let started = Instant::now();
        tracing::trace!(test = %test.full_name, apartment = %current, "test started");
        let mut ctx = TestContext::new(
            &test.full_name,
            &test.name,
            current,
            &self.settings.parameters,
            scopes,
        );

        let mark = ctx.mark();
        if let Some(hook) = &fixture.hooks.setup {
            invoke_hook(hook, instance, &mut ctx);
            ctx.prefix_since(mark, "SetUp");
        }
        let setup_clean = ctx.clean_since(mark);

        if setup_clean {
            let body = &test.body;
            let state = instance.as_mut();
            let ran = panic::catch_unwind(AssertUnwindSafe(|| body(state, &mut ctx, &test.args)));
            match ran {
                Ok(Ok(Some(actual))) => {
                    if let Some(expected) = &test.expected_result {
                        if *expected != actual {
                            ctx.record(Signal::Failure(format!(
                                "Expected: {expected} But was: {actual}"
                            )));
                        }
                    }
                }
                Ok(Ok(None)) => {}
                Ok(Err(abort)) => ctx.record_abort(abort),
                Err(payload) => ctx.record(Signal::Error(Fault::from_panic(payload).message)),
            }
        } else {
            tracing::warn!(test = %test.full_name, "setup did not complete, body skipped");
        }

        if setup_clean || self.settings.teardown_after_failed_setup {
            if let Some(hook) = &fixture.hooks.teardown {
                let mark = ctx.mark();
                invoke_hook(hook, instance, &mut ctx);
                ctx.prefix_since(mark, "TearDown");
            }
        }

        let (signals, output) = ctx.into_parts();
        let result = self.finish(test, signals, output, started.elapsed(), current);
        tracing::trace!(test = %test.full_name, verdict = %result.verdict, "test finished");
        result
    }

    // =====================
    // Preset outcomes
    // =====================

    /// The signal a test or fixture gets without running, if any.
    fn preset_signal(&self, run_state: &RunState, conditions: &[Condition]) -> Option<Signal> {
        match run_state {
            RunState::NotRunnable(message) => return Some(Signal::Error(message.clone())),
            RunState::Ignored(reason) => return Some(Signal::Ignored(reason.clone())),
            RunState::Explicit if self.filter.is_none() => {
                return Some(Signal::Skipped(EXPLICIT.to_string()))
            }
            RunState::Explicit | RunState::Runnable => {}
        }
        conditions
            .iter()
            .find_map(|c| c.excludes(&self.settings.platforms))
            .map(Signal::Skipped)
    }

    fn preset_test(
        &self,
        test: &TestDescriptor,
        signal: &Signal,
        current: Apartment,
    ) -> ExecutionResult {
        let here = apartment::effective(test.apartment, current);
        self.finish(
            test,
            vec![signal.clone()],
            CapturedOutput::default(),
            Duration::ZERO,
            here,
        )
    }

    fn preset_tests(
        &self,
        fixture: &FixtureDescriptor,
        signal: &Signal,
        current: Apartment,
    ) -> Vec<ExecutionResult> {
        fixture
            .tests
            .iter()
            .filter(|t| self.selects(t))
            .map(|t| self.preset_test(t, signal, current))
            .collect()
    }

    fn preset_children(
        &self,
        fixture: &FixtureDescriptor,
        signal: &Signal,
        current: Apartment,
    ) -> Vec<FixtureReport> {
        fixture
            .children
            .iter()
            .filter(|c| self.selects_any(c))
            .map(|c| self.preset_fixture(c, signal, current))
            .collect()
    }

    /// A report for a fixture that is not entered: no hooks run and every
    /// selected test in the subtree gets `signal`.
    fn preset_fixture(
        &self,
        fixture: &FixtureDescriptor,
        signal: &Signal,
        current: Apartment,
    ) -> FixtureReport {
        self.listener.fixture_started(fixture);
        let report = FixtureReport {
            id: fixture.id.clone(),
            name: fixture.name.clone(),
            full_name: fixture.full_name.clone(),
            setup: HookReport::default(),
            teardown: HookReport::default(),
            tests: self.preset_tests(fixture, signal, current),
            children: self.preset_children(fixture, signal, current),
            output: CapturedOutput::default(),
            elapsed: Duration::ZERO,
        };
        self.listener.fixture_finished(&report);
        report
    }

    fn finish(
        &self,
        test: &TestDescriptor,
        signals: Vec<Signal>,
        output: CapturedOutput,
        elapsed: Duration,
        apartment: Apartment,
    ) -> ExecutionResult {
        let verdict = reconcile(&signals);
        let result = ExecutionResult {
            id: test.id.clone(),
            name: test.name.clone(),
            full_name: test.full_name.clone(),
            method: test.method.clone(),
            method_full_name: test.method_full_name.clone(),
            kind: test.kind,
            verdict,
            message: headline(&signals, verdict).map(str::to_string),
            signals,
            output,
            elapsed,
            apartment,
            thread: std::thread::current()
                .name()
                .unwrap_or("unnamed")
                .to_string(),
        };
        self.listener.test_finished(&result);
        result
    }
}

// =====================
// Helpers
// =====================

fn instantiate(fixture: &FixtureDescriptor) -> Result<Instance, Abort> {
    panic::catch_unwind(AssertUnwindSafe(|| fixture.instantiate()))
        .unwrap_or_else(|payload| Err(Abort::Fault(Fault::from_panic(payload))))
}

/// Runs a hook, recording whatever it returns or the panic it raises.
fn invoke_hook(hook: &Hook, instance: &mut Instance, ctx: &mut TestContext<'_>) {
    let state = instance.as_mut();
    match panic::catch_unwind(AssertUnwindSafe(|| hook(state, &mut *ctx))) {
        Ok(Ok(())) => {}
        Ok(Err(abort)) => ctx.record_abort(abort),
        Err(payload) => ctx.record(Signal::Error(Fault::from_panic(payload).message)),
    }
}

/// What the contained tests report when a one-time setup, or the fixture
/// constructor, did not succeed.
fn cascade_from(signals: &[Signal]) -> Option<Signal> {
    let verdict = reconcile(signals);
    let message = headline(signals, verdict)
        .unwrap_or_default()
        .to_string();
    match verdict {
        Verdict::Failed | Verdict::Error => Some(Signal::Error(format!("OneTimeSetUp: {message}"))),
        Verdict::Ignored => Some(Signal::Ignored(message)),
        Verdict::Inconclusive => Some(Signal::Inconclusive(message)),
        Verdict::Skipped => Some(Signal::Skipped(message)),
        Verdict::Passed | Verdict::Warning => None,
    }
}

fn append_output(into: &mut CapturedOutput, more: CapturedOutput) {
    into.out.push_str(&more.out);
    into.error.push_str(&more.error);
    into.progress.push_str(&more.progress);
}
