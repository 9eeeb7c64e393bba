//! Outcome reconciliation: reduces the ordered signals of one test invocation
//! to a single [`Verdict`], and rolls verdicts up to group level.
//!
//! Precedence, highest first: `Error`, `Failed`, `Warning`, `Inconclusive`,
//! `Ignored`/`Skipped`, `Passed`. The first exit signal ends the body, so
//! failures recorded after it (during teardown) do not count, and an
//! ignore/inconclusive/skip exit wins over warnings recorded before it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signal::Signal;

/// The final outcome of one test invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Passed,
    Failed,
    Warning,
    Inconclusive,
    Ignored,
    Skipped,
    Error,
}

impl Verdict {
    pub const ALL: [Verdict; 7] = [
        Verdict::Passed,
        Verdict::Failed,
        Verdict::Warning,
        Verdict::Inconclusive,
        Verdict::Ignored,
        Verdict::Skipped,
        Verdict::Error,
    ];

    /// Precedence rank; higher wins. `Ignored` and `Skipped` share a rank.
    pub fn rank(self) -> u8 {
        match self {
            Verdict::Passed => 0,
            Verdict::Ignored | Verdict::Skipped => 1,
            Verdict::Inconclusive => 2,
            Verdict::Warning => 3,
            Verdict::Failed => 4,
            Verdict::Error => 5,
        }
    }

    /// Returns true for verdicts a run summary counts against success.
    pub fn is_failure(self) -> bool {
        matches!(self, Verdict::Failed | Verdict::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Passed => "Passed",
            Verdict::Failed => "Failed",
            Verdict::Warning => "Warning",
            Verdict::Inconclusive => "Inconclusive",
            Verdict::Ignored => "Ignored",
            Verdict::Skipped => "Skipped",
            Verdict::Error => "Error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SIGNAL REDUCTION
// ============================================================================

/// Reduces an ordered signal list to exactly one verdict.
///
/// # Examples
///
/// ```rust
/// use verdict::reconcile::{reconcile, Verdict};
/// use verdict::signal::Signal;
///
/// assert_eq!(reconcile(&[]), Verdict::Passed);
///
/// let warned_then_failed = [
///     Signal::Warning("WARNING!".into()),
///     Signal::Failure("FAILING!".into()),
/// ];
/// assert_eq!(reconcile(&warned_then_failed), Verdict::Failed);
///
/// // A failure recorded after the body ignored itself does not count.
/// let ignored_then_failed = [
///     Signal::Ignored("not today".into()),
///     Signal::Failure("TearDown: leaked".into()),
/// ];
/// assert_eq!(reconcile(&ignored_then_failed), Verdict::Ignored);
/// ```
pub fn reconcile(signals: &[Signal]) -> Verdict {
    if signals.iter().any(|s| matches!(s, Signal::Error(_))) {
        return Verdict::Error;
    }

    let exit_at = signals.iter().position(Signal::is_exit);
    let before_exit = match exit_at {
        Some(index) => &signals[..index],
        None => signals,
    };

    if before_exit.iter().any(|s| matches!(s, Signal::Failure(_))) {
        return Verdict::Failed;
    }
    let warned = before_exit.iter().any(|s| matches!(s, Signal::Warning(_)));

    match exit_at.map(|index| &signals[index]) {
        Some(Signal::Ignored(_)) => Verdict::Ignored,
        Some(Signal::Skipped(_)) => Verdict::Skipped,
        Some(Signal::Inconclusive(_)) => Verdict::Inconclusive,
        Some(Signal::Passed(_)) | None if warned => Verdict::Warning,
        _ => Verdict::Passed,
    }
}

/// The message a report shows next to a verdict: the first signal that
/// explains it, if any.
pub fn headline(signals: &[Signal], verdict: Verdict) -> Option<&str> {
    let explains = |s: &&Signal| match verdict {
        Verdict::Error => matches!(s, Signal::Error(_)),
        Verdict::Failed => matches!(s, Signal::Failure(_)),
        Verdict::Warning => matches!(s, Signal::Warning(_)),
        Verdict::Inconclusive => matches!(s, Signal::Inconclusive(_)),
        Verdict::Ignored => matches!(s, Signal::Ignored(_)),
        Verdict::Skipped => matches!(s, Signal::Skipped(_)),
        Verdict::Passed => matches!(s, Signal::Passed(_)),
    };
    signals.iter().find(explains).map(Signal::message)
}

// ============================================================================
// GROUP ROLLUP
// ============================================================================

/// Group-level summary of several verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupOutcome {
    Empty,
    Uniform(Verdict),
    Mixed,
}

impl fmt::Display for GroupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupOutcome::Empty => f.write_str("Empty"),
            GroupOutcome::Uniform(v) => write!(f, "{v}"),
            GroupOutcome::Mixed => f.write_str("Mixed"),
        }
    }
}

/// Rolls several verdicts up: `Uniform` when they all agree, else `Mixed`.
pub fn rollup<I>(verdicts: I) -> GroupOutcome
where
    I: IntoIterator<Item = Verdict>,
{
    let mut iter = verdicts.into_iter();
    let Some(first) = iter.next() else {
        return GroupOutcome::Empty;
    };
    if iter.all(|v| v == first) {
        GroupOutcome::Uniform(first)
    } else {
        GroupOutcome::Mixed
    }
}

pub const ALL_INCONCLUSIVE: &str = "All test cases were inconclusive";

/// Theory rollup: like [`rollup`], except a theory whose every case was
/// inconclusive has failed.
pub fn theory_rollup<I>(verdicts: I) -> GroupOutcome
where
    I: IntoIterator<Item = Verdict>,
{
    match rollup(verdicts) {
        GroupOutcome::Uniform(Verdict::Inconclusive) => GroupOutcome::Uniform(Verdict::Failed),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(m: &str) -> Signal {
        Signal::Failure(m.to_string())
    }

    fn warning(m: &str) -> Signal {
        Signal::Warning(m.to_string())
    }

    #[test]
    fn error_beats_everything() {
        let signals = [failure("1"), failure("2"), Signal::Error("boom".into())];
        assert_eq!(reconcile(&signals), Verdict::Error);
    }

    #[test]
    fn warnings_alone_warn() {
        let signals = [warning("1"), warning("2"), warning("3")];
        assert_eq!(reconcile(&signals), Verdict::Warning);
    }

    #[test]
    fn failures_before_exit_win() {
        let signals = [failure("a"), Signal::Inconclusive("b".into())];
        assert_eq!(reconcile(&signals), Verdict::Failed);
    }

    #[test]
    fn exit_beats_earlier_warning() {
        let signals = [warning("w"), Signal::Ignored("skip me".into())];
        assert_eq!(reconcile(&signals), Verdict::Ignored);
        let signals = [warning("w"), Signal::Inconclusive("?".into())];
        assert_eq!(reconcile(&signals), Verdict::Inconclusive);
    }

    #[test]
    fn explicit_pass_keeps_warnings() {
        let signals = [warning("w"), Signal::Passed("ok".into())];
        assert_eq!(reconcile(&signals), Verdict::Warning);
        assert_eq!(reconcile(&[Signal::Passed("ok".into())]), Verdict::Passed);
    }

    #[test]
    fn rank_orders_precedence() {
        assert!(Verdict::Error.rank() > Verdict::Failed.rank());
        assert!(Verdict::Failed.rank() > Verdict::Warning.rank());
        assert!(Verdict::Warning.rank() > Verdict::Inconclusive.rank());
        assert!(Verdict::Inconclusive.rank() > Verdict::Skipped.rank());
        assert_eq!(Verdict::Ignored.rank(), Verdict::Skipped.rank());
        assert!(Verdict::Skipped.rank() > Verdict::Passed.rank());
    }

    #[test]
    fn rollups() {
        assert_eq!(rollup(Vec::<Verdict>::new()), GroupOutcome::Empty);
        assert_eq!(
            rollup([Verdict::Passed, Verdict::Passed]),
            GroupOutcome::Uniform(Verdict::Passed)
        );
        assert_eq!(rollup([Verdict::Passed, Verdict::Failed]), GroupOutcome::Mixed);
        assert_eq!(
            theory_rollup([Verdict::Inconclusive, Verdict::Inconclusive]),
            GroupOutcome::Uniform(Verdict::Failed)
        );
    }

    #[test]
    fn headline_picks_the_explaining_signal() {
        let signals = [warning("w"), failure("f")];
        assert_eq!(headline(&signals, Verdict::Failed), Some("f"));
        assert_eq!(headline(&[], Verdict::Passed), None);
    }
}
