//! Signals recorded while a test runs, and the non-local exits a body can take.
//!
//! A test body returns [`Outcome`]. `Ok(())` means the body ran to completion;
//! `Err(Abort)` ends it early. The scheduler turns every abort into a
//! [`Signal`] appended to the test's ordered signal list, which the
//! reconciler later reduces to one verdict.
//!
//! Any `std::error::Error` converts into [`Abort::Fault`], so `?` on a
//! fallible call inside a body reports an unhandled fault:
//!
//! ```rust
//! use verdict::signal::{Abort, Outcome};
//!
//! fn parse_port(raw: &str) -> Outcome {
//!     let _port: u16 = raw.parse()?;
//!     Ok(())
//! }
//!
//! assert!(matches!(parse_port("eighty"), Err(Abort::Fault(_))));
//! ```

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

/// What a test body, hook, or assertion returns.
pub type Outcome = Result<(), Abort>;

// ============================================================================
// RECORDED SIGNALS
// ============================================================================

/// One entry in the ordered list of things that happened during a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message")]
pub enum Signal {
    /// An assertion failed.
    Failure(String),
    /// A non-fatal warning.
    Warning(String),
    /// The test could not reach a conclusion (failed assumption or explicit call).
    Inconclusive(String),
    /// The test was ignored, either by declaration or by an explicit call.
    Ignored(String),
    /// The test was not run: explicit, excluded by platform, or cascaded.
    Skipped(String),
    /// The body exited early with an explicit pass.
    Passed(String),
    /// An unhandled fault or a panic.
    Error(String),
}

impl Signal {
    pub fn message(&self) -> &str {
        match self {
            Signal::Failure(m)
            | Signal::Warning(m)
            | Signal::Inconclusive(m)
            | Signal::Ignored(m)
            | Signal::Skipped(m)
            | Signal::Passed(m)
            | Signal::Error(m) => m,
        }
    }

    /// Returns true for signals that end the body: the first one seen is the
    /// test's exit.
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            Signal::Inconclusive(_) | Signal::Ignored(_) | Signal::Skipped(_) | Signal::Passed(_)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Signal::Failure(_) => "Failure",
            Signal::Warning(_) => "Warning",
            Signal::Inconclusive(_) => "Inconclusive",
            Signal::Ignored(_) => "Ignored",
            Signal::Skipped(_) => "Skipped",
            Signal::Passed(_) => "Passed",
            Signal::Error(_) => "Error",
        }
    }

    /// Prefixes the message, keeping the kind. Used for hook phases
    /// (`SetUp:`, `TearDown:`, `OneTimeSetUp:`).
    pub fn prefixed(self, prefix: &str) -> Signal {
        let wrap = |m: String| format!("{prefix}: {m}");
        match self {
            Signal::Failure(m) => Signal::Failure(wrap(m)),
            Signal::Warning(m) => Signal::Warning(wrap(m)),
            Signal::Inconclusive(m) => Signal::Inconclusive(wrap(m)),
            Signal::Ignored(m) => Signal::Ignored(wrap(m)),
            Signal::Skipped(m) => Signal::Skipped(wrap(m)),
            Signal::Passed(m) => Signal::Passed(wrap(m)),
            Signal::Error(m) => Signal::Error(wrap(m)),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message())
    }
}

// ============================================================================
// FAULTS
// ============================================================================

/// How an unhandled fault reached the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// A returned error.
    Error,
    /// A caught panic.
    Panic,
}

/// An unhandled fault raised by a body or a hook.
///
/// Deliberately not an `std::error::Error`: that keeps the blanket
/// `From<E: Error>` conversion into [`Abort`] coherent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Error,
            message: message.into(),
        }
    }

    /// Builds a fault from a panic payload caught by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with a non-string payload".to_string()
        };
        Self {
            kind: FaultKind::Panic,
            message: format!("panicked: {message}"),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ============================================================================
// NON-LOCAL EXITS
// ============================================================================

/// The `Err` side of a test body: every way a body can stop early.
#[derive(Debug, Clone, PartialEq)]
pub enum Abort {
    /// A fatal assertion failure. Not yet recorded; the scheduler records it.
    Failure(String),
    /// A multiple-assertion block ended with this many recorded failures.
    /// The failures are already in the signal list.
    MultipleFailures(usize),
    /// Explicit ignore.
    Ignore(String),
    /// Explicit inconclusive, or a failed assumption.
    Inconclusive(String),
    /// Explicit early pass.
    Pass(String),
    /// Unhandled fault.
    Fault(Fault),
}

impl Abort {
    pub fn failure(message: impl Into<String>) -> Self {
        Abort::Failure(message.into())
    }

    pub fn ignore(reason: impl Into<String>) -> Self {
        Abort::Ignore(reason.into())
    }

    pub fn inconclusive(message: impl Into<String>) -> Self {
        Abort::Inconclusive(message.into())
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Abort::Pass(message.into())
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Abort::Fault(Fault::new(message))
    }

    /// Converts the abort into the signal the scheduler records, or `None`
    /// when the signals are already recorded.
    pub fn into_signal(self) -> Option<Signal> {
        match self {
            Abort::Failure(m) => Some(Signal::Failure(m)),
            Abort::MultipleFailures(_) => None,
            Abort::Ignore(m) => Some(Signal::Ignored(m)),
            Abort::Inconclusive(m) => Some(Signal::Inconclusive(m)),
            Abort::Pass(m) => Some(Signal::Passed(m)),
            Abort::Fault(fault) => Some(Signal::Error(fault.message)),
        }
    }
}

impl From<Fault> for Abort {
    fn from(fault: Fault) -> Self {
        Abort::Fault(fault)
    }
}

impl<E> From<E> for Abort
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        let full = std::any::type_name::<E>();
        let short = full.rsplit("::").next().unwrap_or(full);
        Abort::Fault(Fault::new(format!("{short}: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        let fault = Fault::from_panic(Box::new("boom"));
        assert_eq!(fault.kind, FaultKind::Panic);
        assert_eq!(fault.message, "panicked: boom");

        let fault = Fault::from_panic(Box::new(String::from("owned")));
        assert_eq!(fault.message, "panicked: owned");
    }

    #[test]
    fn errors_convert_with_their_type_name() {
        let err = "x".parse::<i32>().unwrap_err();
        let Abort::Fault(fault) = Abort::from(err) else {
            panic!("expected a fault");
        };
        assert!(fault.message.starts_with("ParseIntError: "));
    }

    #[test]
    fn multiple_failures_are_already_recorded() {
        assert_eq!(Abort::MultipleFailures(2).into_signal(), None);
        assert_eq!(
            Abort::ignore("later").into_signal(),
            Some(Signal::Ignored("later".into()))
        );
    }

    #[test]
    fn prefixed_keeps_kind() {
        let s = Signal::Error("boom".into()).prefixed("TearDown");
        assert_eq!(s, Signal::Error("TearDown: boom".into()));
    }
}
