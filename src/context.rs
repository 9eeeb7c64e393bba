//! The per-invocation context handed to hooks and test bodies.
//!
//! Assertions record signals here. Outside a multiple-assertion block a failed
//! assertion returns `Err(Abort::Failure)`, which the body propagates with `?`
//! and the scheduler records; inside a block the failure is recorded at once
//! and execution continues.
//!
//! ```rust
//! use verdict::context::TestContext;
//! use verdict::signal::{Abort, Signal};
//!
//! let mut ctx = TestContext::detached("Demo.TestWithThreeFailures");
//! let result = ctx.multiple(|ctx| {
//!     ctx.fail("Failure 1")?;
//!     ctx.assert_eq(2 + 2, 5, "Failure 2")?;
//!     ctx.assert_greater(42, 99, "Failure 3")
//! });
//! assert!(matches!(result, Err(Abort::MultipleFailures(3))));
//! assert_eq!(ctx.signals()[1], Signal::Failure("Failure 2: 4 != 5".into()));
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Write as _};

use serde::{Deserialize, Serialize};

use crate::descriptor::Apartment;
use crate::signal::{Abort, Outcome, Signal};

// ============================================================================
// ANCESTOR SCOPE STATE
// ============================================================================

/// The chain of enclosing fixture instances, innermost first.
///
/// Descendants read ancestor state through [`TestContext::scope`]; the
/// scheduler keeps ancestors alive and unmodified while descendants run.
#[derive(Clone, Copy, Default)]
pub struct Scopes<'a> {
    state: Option<&'a (dyn Any + Send + Sync)>,
    parent: Option<&'a Scopes<'a>>,
}

impl<'a> Scopes<'a> {
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a chain with `state` as the innermost scope.
    pub fn push(&'a self, state: &'a (dyn Any + Send + Sync)) -> Scopes<'a> {
        Scopes {
            state: Some(state),
            parent: Some(self),
        }
    }

    /// Finds the innermost ancestor of type `T`.
    pub fn find<T: Any>(&self) -> Option<&'a T> {
        let mut cursor = Some(*self);
        while let Some(scope) = cursor {
            if let Some(found) = scope.state.and_then(|s| s.downcast_ref::<T>()) {
                return Some(found);
            }
            cursor = scope.parent.copied();
        }
        None
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = Some(*self);
        while let Some(scope) = cursor {
            if scope.state.is_some() {
                depth += 1;
            }
            cursor = scope.parent.copied();
        }
        depth
    }
}

// ============================================================================
// CAPTURED OUTPUT
// ============================================================================

/// Text written by a test through its context, attached to the result at
/// completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub out: String,
    pub error: String,
    pub progress: String,
}

impl CapturedOutput {
    pub fn is_empty(&self) -> bool {
        self.out.is_empty() && self.error.is_empty() && self.progress.is_empty()
    }
}

// ============================================================================
// TEST CONTEXT
// ============================================================================

static NO_PARAMETERS: BTreeMap<String, String> = BTreeMap::new();

/// Everything a running hook or body can see and record.
pub struct TestContext<'a> {
    test_name: String,
    full_name: String,
    apartment: Apartment,
    thread_name: String,
    parameters: &'a BTreeMap<String, String>,
    scopes: Scopes<'a>,
    signals: Vec<Signal>,
    output: CapturedOutput,
    multiple_depth: usize,
}

impl<'a> TestContext<'a> {
    pub(crate) fn new(
        full_name: &str,
        test_name: &str,
        apartment: Apartment,
        parameters: &'a BTreeMap<String, String>,
        scopes: Scopes<'a>,
    ) -> Self {
        let thread = std::thread::current();
        Self {
            test_name: test_name.to_string(),
            full_name: full_name.to_string(),
            apartment,
            thread_name: thread.name().unwrap_or("unnamed").to_string(),
            parameters,
            scopes,
            signals: Vec::new(),
            output: CapturedOutput::default(),
            multiple_depth: 0,
        }
    }

    /// A context outside any run: no ancestors, no parameters.
    pub fn detached(full_name: &str) -> TestContext<'static> {
        let name = full_name.rsplit('.').next().unwrap_or(full_name);
        TestContext::new(full_name, name, Apartment::Any, &NO_PARAMETERS, Scopes::root())
    }

    // =====================
    // Identity and environment
    // =====================

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The apartment the current thread provides.
    pub fn apartment(&self) -> Apartment {
        self.apartment
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Run parameters (`--param KEY=VALUE`).
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        self.parameters
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// The innermost enclosing fixture instance of type `T`.
    pub fn scope<T: Any>(&self) -> Option<&'a T> {
        self.scopes.find::<T>()
    }

    /// Like [`TestContext::scope`], but a missing scope is a fault.
    pub fn require_scope<T: Any>(&self) -> Result<&'a T, Abort> {
        self.scope::<T>().ok_or_else(|| {
            Abort::fault(format!(
                "no enclosing fixture of type {}",
                std::any::type_name::<T>()
            ))
        })
    }

    // =====================
    // Assertions
    // =====================

    /// Asserts `condition`. The message is the failure text.
    pub fn assert_that(&mut self, condition: bool, message: impl Into<String>) -> Outcome {
        if condition {
            Ok(())
        } else {
            self.fail(message)
        }
    }

    /// Asserts equality; the failure reads `message: actual != expected`.
    pub fn assert_eq<T>(&mut self, actual: T, expected: T, message: &str) -> Outcome
    where
        T: PartialEq + Debug,
    {
        if actual == expected {
            return Ok(());
        }
        let detail = format!("{actual:?} != {expected:?}");
        self.fail(prefix_message(message, &detail))
    }

    /// Asserts `actual > bound`.
    pub fn assert_greater<T>(&mut self, actual: T, bound: T, message: &str) -> Outcome
    where
        T: PartialOrd + Debug,
    {
        if actual > bound {
            return Ok(());
        }
        let detail = format!("expected greater than {bound:?} but was {actual:?}");
        self.fail(prefix_message(message, &detail))
    }

    /// Records a failure. Outside a multiple-assertion block this ends the body.
    pub fn fail(&mut self, message: impl Into<String>) -> Outcome {
        let message = message.into();
        if self.multiple_depth > 0 {
            self.signals.push(Signal::Failure(message));
            Ok(())
        } else {
            Err(Abort::Failure(message))
        }
    }

    /// Runs `block`, recording every failed assertion instead of stopping at
    /// the first. The outermost block reports `Abort::MultipleFailures` when
    /// any failure was recorded. Faults and explicit exits propagate.
    pub fn multiple<F>(&mut self, block: F) -> Outcome
    where
        F: FnOnce(&mut Self) -> Outcome,
    {
        let before = self.failure_count();
        self.multiple_depth += 1;
        let result = block(self);
        self.multiple_depth -= 1;

        match result {
            Ok(()) | Err(Abort::MultipleFailures(_)) => {}
            Err(Abort::Failure(message)) => self.signals.push(Signal::Failure(message)),
            Err(other) => return Err(other),
        }

        let failures = self.failure_count() - before;
        if failures > 0 && self.multiple_depth == 0 {
            Err(Abort::MultipleFailures(failures))
        } else {
            Ok(())
        }
    }

    // =====================
    // Warnings and exits
    // =====================

    /// Records a warning. Never ends the body.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.signals.push(Signal::Warning(message.into()));
    }

    pub fn warn_if(&mut self, condition: bool, message: impl Into<String>) {
        if condition {
            self.warn(message);
        }
    }

    pub fn warn_unless(&mut self, condition: bool, message: impl Into<String>) {
        self.warn_if(!condition, message);
    }

    /// An assumption: when it does not hold the test is inconclusive.
    pub fn assume(&mut self, condition: bool, message: impl Into<String>) -> Outcome {
        if condition {
            Ok(())
        } else {
            Err(Abort::Inconclusive(message.into()))
        }
    }

    pub fn ignore(&mut self, reason: impl Into<String>) -> Outcome {
        Err(Abort::Ignore(reason.into()))
    }

    pub fn inconclusive(&mut self, message: impl Into<String>) -> Outcome {
        Err(Abort::Inconclusive(message.into()))
    }

    pub fn pass(&mut self, message: impl Into<String>) -> Outcome {
        Err(Abort::Pass(message.into()))
    }

    // =====================
    // Captured text streams
    // =====================

    pub fn out(&mut self, text: impl Display) {
        let _ = write!(self.output.out, "{text}");
    }

    pub fn out_line(&mut self, text: impl Display) {
        let _ = writeln!(self.output.out, "{text}");
    }

    pub fn error(&mut self, text: impl Display) {
        let _ = write!(self.output.error, "{text}");
    }

    pub fn error_line(&mut self, text: impl Display) {
        let _ = writeln!(self.output.error, "{text}");
    }

    /// Progress text; the CLI echoes it live in verbose runs.
    pub fn progress(&mut self, text: impl Display) {
        let _ = writeln!(self.output.progress, "{text}");
        tracing::info!(test = %self.full_name, "{text}");
    }

    // =====================
    // Scheduler access
    // =====================

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn output(&self) -> &CapturedOutput {
        &self.output
    }

    pub(crate) fn record(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    /// Records whatever an `Err` result still has to say.
    pub(crate) fn record_abort(&mut self, abort: Abort) {
        if let Some(signal) = abort.into_signal() {
            self.signals.push(signal);
        }
    }

    /// Marks the number of signals recorded so far.
    pub(crate) fn mark(&self) -> usize {
        self.signals.len()
    }

    /// Prefixes every signal recorded since `mark` with a hook phase.
    pub(crate) fn prefix_since(&mut self, mark: usize, phase: &str) {
        let tail = self.signals.split_off(mark);
        self.signals
            .extend(tail.into_iter().map(|s| s.prefixed(phase)));
    }

    /// Returns true if nothing but warnings was recorded since `mark`.
    pub(crate) fn clean_since(&self, mark: usize) -> bool {
        self.signals[mark..]
            .iter()
            .all(|s| matches!(s, Signal::Warning(_)))
    }

    pub(crate) fn into_parts(self) -> (Vec<Signal>, CapturedOutput) {
        (self.signals, self.output)
    }

    fn failure_count(&self) -> usize {
        self.signals
            .iter()
            .filter(|s| matches!(s, Signal::Failure(_)))
            .count()
    }
}

fn prefix_message(message: &str, detail: &str) -> String {
    if message.is_empty() {
        detail.to_string()
    } else {
        format!("{message}: {detail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_outside_multiple_aborts() {
        let mut ctx = TestContext::detached("T.t");
        let result = ctx.assert_eq(2 + 2, 5, "");
        assert_eq!(result, Err(Abort::Failure("4 != 5".into())));
        assert!(ctx.signals().is_empty());
    }

    #[test]
    fn fault_inside_multiple_propagates_after_recording() {
        let mut ctx = TestContext::detached("T.t");
        let result = ctx.multiple(|ctx| {
            ctx.assert_eq(4, 5, "")?;
            ctx.assert_greater(42, 99, "")?;
            Err(Abort::fault("Throwing after two failures"))
        });
        assert!(matches!(result, Err(Abort::Fault(_))));
        assert_eq!(ctx.signals().len(), 2);
    }

    #[test]
    fn nested_multiple_reports_once() {
        let mut ctx = TestContext::detached("T.t");
        let result = ctx.multiple(|ctx| {
            ctx.multiple(|ctx| ctx.fail("inner"))?;
            ctx.fail("outer")
        });
        assert_eq!(result, Err(Abort::MultipleFailures(2)));
    }

    #[test]
    fn raw_failure_returned_from_block_is_recorded() {
        let mut ctx = TestContext::detached("T.t");
        let result = ctx.multiple(|_| Err(Abort::failure("direct")));
        assert_eq!(result, Err(Abort::MultipleFailures(1)));
        assert_eq!(ctx.signals(), [Signal::Failure("direct".into())]);
    }

    #[test]
    fn assumptions_and_warnings() {
        let mut ctx = TestContext::detached("T.t");
        ctx.warn_unless(2 + 2 == 5, "Math is too hard!");
        assert_eq!(ctx.signals().len(), 1);
        assert!(matches!(
            ctx.assume(false, "b != 0"),
            Err(Abort::Inconclusive(_))
        ));
    }

    #[test]
    fn scopes_find_innermost_ancestor() {
        let outer = 1_u32;
        let inner = String::from("inner");
        let root = Scopes::root();
        let first = root.push(&outer);
        let second = first.push(&inner);
        assert_eq!(second.find::<u32>(), Some(&1));
        assert_eq!(second.find::<String>().map(String::as_str), Some("inner"));
        assert_eq!(second.find::<i64>(), None);
        assert_eq!(second.depth(), 2);
    }

    #[test]
    fn prefix_since_marks_hook_phase() {
        let mut ctx = TestContext::detached("T.t");
        ctx.warn("before");
        let mark = ctx.mark();
        ctx.record_abort(Abort::fault("boom"));
        ctx.prefix_since(mark, "SetUp");
        assert_eq!(ctx.signals()[1], Signal::Error("SetUp: boom".into()));
        assert!(!ctx.clean_since(mark));
        assert!(ctx.clean_since(2));
        ctx.warn("after");
        assert!(ctx.clean_since(2));
    }
}
