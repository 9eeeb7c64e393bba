//! Handles all user-facing output for the CLI.
//!
//! Per-test lines are printed live by [`LiveReporter`] as the scheduler
//! finishes each test; the failure details, acceptance mismatches and the
//! summary line follow once the run is complete.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::acceptance::AcceptanceReport;
use crate::descriptor::{FixtureDescriptor, RunState};
use crate::reconcile::Verdict;
use crate::registry::Discovery;
use crate::report::{ExecutionResult, FixtureReport, RunReport};
use crate::scheduler::{RunListener, Scheduler};

pub fn color_choice(use_colors: bool) -> ColorChoice {
    if use_colors {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn verdict_color(verdict: Verdict) -> Option<Color> {
    match verdict {
        Verdict::Passed => Some(Color::Green),
        Verdict::Failed | Verdict::Error => Some(Color::Red),
        Verdict::Warning | Verdict::Inconclusive => Some(Color::Yellow),
        Verdict::Ignored | Verdict::Skipped => Some(Color::Cyan),
    }
}

fn write_verdict(out: &mut impl WriteColor, verdict: Verdict) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(verdict_color(verdict)).set_bold(true))?;
    write!(out, "{:<12}", verdict.as_str())?;
    out.reset()
}

fn write_heading(out: &mut impl WriteColor, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    writeln!(out, "{text}")?;
    out.reset()
}

// ============================================================================
// LIVE PROGRESS
// ============================================================================

/// Prints one line per finished test. Shared across worker threads.
pub struct LiveReporter {
    stdout: Mutex<StandardStream>,
}

impl LiveReporter {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: Mutex::new(StandardStream::stdout(choice)),
        }
    }

    fn print_result(&self, result: &ExecutionResult) -> io::Result<()> {
        let mut stdout = self.stdout.lock().unwrap_or_else(PoisonError::into_inner);
        write_verdict(&mut *stdout, result.verdict)?;
        writeln!(stdout, " {}", result.full_name)
    }
}

impl RunListener for LiveReporter {
    fn fixture_started(&self, fixture: &FixtureDescriptor) {
        tracing::debug!(fixture = %fixture.full_name, "fixture started");
    }

    fn test_finished(&self, result: &ExecutionResult) {
        if let Err(e) = self.print_result(result) {
            tracing::warn!(error = %e, "could not print test result");
        }
    }

    fn fixture_finished(&self, report: &FixtureReport) {
        tracing::debug!(
            fixture = %report.full_name,
            outcome = %report.outcome(),
            "fixture finished"
        );
    }
}

// ============================================================================
// RUN SUMMARY
// ============================================================================

/// Prints failure details, fixture hook failures, acceptance mismatches and
/// the summary line.
pub fn print_run_summary(
    report: &RunReport,
    acceptance: &AcceptanceReport,
    choice: ColorChoice,
) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(choice);

    let noteworthy: Vec<&ExecutionResult> = report
        .all_results()
        .into_iter()
        .filter(|r| r.verdict != Verdict::Passed && r.message.is_some())
        .collect();
    if !noteworthy.is_empty() {
        writeln!(stdout)?;
        write_heading(&mut stdout, "Messages:")?;
        for result in noteworthy {
            write_verdict(&mut stdout, result.verdict)?;
            writeln!(stdout, " {}", result.full_name)?;
            for line in result.message.iter().flat_map(|m| m.lines()) {
                writeln!(stdout, "    {line}")?;
            }
        }
    }

    let mut hook_failures = Vec::new();
    collect_hook_failures(&report.fixtures, &mut hook_failures);
    if !hook_failures.is_empty() {
        writeln!(stdout)?;
        write_heading(&mut stdout, "One-time teardown failures:")?;
        for (fixture, message) in hook_failures {
            writeln!(stdout, "  {fixture}: {message}")?;
        }
    }

    if !report.discovery_errors.is_empty() {
        writeln!(stdout)?;
        write_heading(&mut stdout, "Discovery errors:")?;
        for error in &report.discovery_errors {
            writeln!(stdout, "  {error}")?;
        }
    }

    if !acceptance.mismatches.is_empty() {
        writeln!(stdout)?;
        write_heading(&mut stdout, "Unexpected outcomes:")?;
        for mismatch in &acceptance.mismatches {
            writeln!(stdout, "  {mismatch}")?;
        }
    }

    let summary = report.summary();
    writeln!(stdout)?;
    writeln!(
        stdout,
        "Test summary: total {}, passed {}, failed {}, errors {}, warnings {}, inconclusive {}, ignored {}, skipped {}",
        summary.total_tests(),
        summary.passed,
        summary.failed,
        summary.errors,
        summary.warnings,
        summary.inconclusive,
        summary.ignored,
        summary.skipped,
    )?;
    writeln!(
        stdout,
        "Seed: {}, elapsed {:.2?}",
        report.seed, report.elapsed
    )?;

    let (color, text) = if acceptance.is_success() {
        (
            Color::Green,
            format!(
                "Expected outcomes: all {} checks matched",
                acceptance.checked
            ),
        )
    } else {
        (
            Color::Red,
            format!(
                "Expected outcomes: {} of {} checks did not match",
                acceptance.mismatches.len(),
                acceptance.checked
            ),
        )
    };
    stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    writeln!(stdout, "{text}")?;
    stdout.reset()
}

fn collect_hook_failures(reports: &[FixtureReport], out: &mut Vec<(String, String)>) {
    for report in reports {
        if report.teardown.verdict().is_failure() {
            let message = report
                .teardown
                .signals
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            out.push((report.full_name.clone(), message));
        }
        collect_hook_failures(&report.children, out);
    }
}

// ============================================================================
// LISTING
// ============================================================================

/// Prints every selected test with its run state, then the discovery errors.
pub fn print_listing(
    discovery: &Discovery,
    scheduler: &Scheduler<'_>,
    choice: ColorChoice,
) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(choice);
    let mut listed = 0;
    for test in discovery.all_tests() {
        if !scheduler.selects(test) {
            continue;
        }
        listed += 1;
        match &test.run_state {
            RunState::Runnable => writeln!(stdout, "{}", test.full_name)?,
            state => {
                write!(stdout, "{}", test.full_name)?;
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
                writeln!(stdout, " [{}]", run_state_label(state))?;
                stdout.reset()?;
            }
        }
    }
    if !discovery.errors.is_empty() {
        writeln!(stdout)?;
        write_heading(&mut stdout, "Discovery errors:")?;
        for error in &discovery.errors {
            writeln!(stdout, "  {error}")?;
        }
    }
    writeln!(stdout)?;
    writeln!(stdout, "{listed} of {} tests listed", discovery.test_count())
}

fn run_state_label(state: &RunState) -> &'static str {
    match state {
        RunState::Runnable => "runnable",
        RunState::Explicit => "explicit",
        RunState::Ignored(_) => "ignored",
        RunState::NotRunnable(_) => "not runnable",
    }
}
