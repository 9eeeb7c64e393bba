//! Immutable descriptors produced by discovery.
//!
//! A [`FixtureDescriptor`] tree is built once by the registry and never
//! mutated afterwards. Fixture state, hooks and bodies are stored type-erased
//! so fixtures of different state types can live in one tree; the typed
//! builder in [`crate::registry`] performs the downcasts.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::TestContext;
use crate::reconcile::Verdict;
use crate::signal::{Abort, Outcome};
use crate::value::{Arg, Args};

// =====================
// Type-erased fixture storage
// =====================

/// A fixture instance, owned by the scheduler.
pub type Instance = Box<dyn Any + Send + Sync>;

/// Builds a fixture instance from the fixture's arguments.
pub type Factory = Arc<dyn Fn(&Args) -> Result<Instance, Abort> + Send + Sync>;

/// A one-time or per-test hook.
pub type Hook = Arc<dyn Fn(&mut (dyn Any + Send + Sync), &mut TestContext<'_>) -> Outcome + Send + Sync>;

/// A test body. Returns the produced value for bodies with an expected result.
pub type TestBody = Arc<
    dyn Fn(&mut (dyn Any + Send + Sync), &mut TestContext<'_>, &Args) -> Result<Option<Arg>, Abort>
        + Send
        + Sync,
>;

// =====================
// Identities
// =====================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FixtureId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestId(pub String);

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =====================
// Declarative attributes
// =====================

/// The thread affinity a test or fixture requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Apartment {
    /// Whatever the current context is.
    #[default]
    Any,
    /// A dedicated single-threaded context.
    Sta,
    /// The shared worker context.
    Mta,
}

impl fmt::Display for Apartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Apartment::Any => "Any",
            Apartment::Sta => "STA",
            Apartment::Mta => "MTA",
        })
    }
}

/// Declared expected outcome used by the acceptance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpectedOutcome {
    Pass,
    Failure,
    Warning,
    Ignore,
    Skipped,
    Error,
    Inconclusive,
    Mixed,
}

impl ExpectedOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpectedOutcome::Pass => "Pass",
            ExpectedOutcome::Failure => "Failure",
            ExpectedOutcome::Warning => "Warning",
            ExpectedOutcome::Ignore => "Ignore",
            ExpectedOutcome::Skipped => "Skipped",
            ExpectedOutcome::Error => "Error",
            ExpectedOutcome::Inconclusive => "Inconclusive",
            ExpectedOutcome::Mixed => "Mixed",
        }
    }

    /// The single verdict this tag expects, or `None` for `Mixed`.
    pub fn verdict(self) -> Option<Verdict> {
        match self {
            ExpectedOutcome::Pass => Some(Verdict::Passed),
            ExpectedOutcome::Failure => Some(Verdict::Failed),
            ExpectedOutcome::Warning => Some(Verdict::Warning),
            ExpectedOutcome::Ignore => Some(Verdict::Ignored),
            ExpectedOutcome::Skipped => Some(Verdict::Skipped),
            ExpectedOutcome::Error => Some(Verdict::Error),
            ExpectedOutcome::Inconclusive => Some(Verdict::Inconclusive),
            ExpectedOutcome::Mixed => None,
        }
    }
}

impl fmt::Display for ExpectedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpectedOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pass" => Ok(ExpectedOutcome::Pass),
            "Failure" => Ok(ExpectedOutcome::Failure),
            "Warning" => Ok(ExpectedOutcome::Warning),
            "Ignore" => Ok(ExpectedOutcome::Ignore),
            "Skipped" | "Skip" => Ok(ExpectedOutcome::Skipped),
            "Error" => Ok(ExpectedOutcome::Error),
            "Inconclusive" => Ok(ExpectedOutcome::Inconclusive),
            "Mixed" => Ok(ExpectedOutcome::Mixed),
            other => Err(format!("unknown expected outcome '{other}'")),
        }
    }
}

/// Multi-valued key/value properties, in key order.
///
/// ```rust
/// use verdict::descriptor::Properties;
/// let mut props = Properties::default();
/// props.add("Priority", "Low");
/// props.add("Action", "Ignore");
/// props.add("Priority", "High");
/// assert_eq!(props.get("Priority"), ["Low", "High"]);
/// assert!(props.contains("Action", "Ignore"));
/// assert!(props.get("Missing").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties(BTreeMap<String, Vec<String>>);

impl Properties {
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn get(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.get(key).iter().any(|v| v == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Whether a test or fixture takes part in a run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Runnable,
    /// Runs only when a filter selects it.
    Explicit,
    Ignored(String),
    /// A discovery error; executes as an `Error` verdict with this message.
    NotRunnable(String),
}

/// A platform predicate. A test is excluded when its include list names no
/// current platform, or its exclude list names one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Condition {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Condition {
    /// Returns the skip reason when the condition excludes the given platforms.
    pub fn excludes(&self, platforms: &[String]) -> Option<String> {
        let has = |p: &String| platforms.iter().any(|q| q.eq_ignore_ascii_case(p));
        if let Some(hit) = self.exclude.iter().find(|p| has(p)) {
            return Some(format!("Not supported on {hit}"));
        }
        if !self.include.is_empty() && !self.include.iter().any(has) {
            return Some(format!("Only supported on {}", self.include.join(",")));
        }
        None
    }
}

/// How fixture instances are allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LifeCycle {
    /// One instance shared by all tests, run sequentially.
    #[default]
    SingleInstance,
    /// A fresh instance per test; tests may run concurrently.
    InstancePerTestCase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestKind {
    Simple,
    Case,
    Theory,
    Combinatorial,
}

// =====================
// Descriptors
// =====================

/// One runnable test: a simple method, or one expanded case of a
/// parameterized method.
#[derive(Clone)]
pub struct TestDescriptor {
    pub id: TestId,
    pub name: String,
    pub full_name: String,
    pub method: String,
    /// `Fixture.Method`; shared by every case of one method.
    pub method_full_name: String,
    pub kind: TestKind,
    pub args: Args,
    pub expected_result: Option<Arg>,
    /// Case-level tag, falling back to the method's.
    pub expect: Option<ExpectedOutcome>,
    pub method_expect: Option<ExpectedOutcome>,
    pub properties: Properties,
    pub categories: Vec<String>,
    pub run_state: RunState,
    pub conditions: Vec<Condition>,
    pub apartment: Apartment,
    pub description: Option<String>,
    pub(crate) body: TestBody,
}

impl TestDescriptor {
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

impl fmt::Debug for TestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDescriptor")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("expected_result", &self.expected_result)
            .field("expect", &self.expect)
            .field("categories", &self.categories)
            .field("run_state", &self.run_state)
            .field("apartment", &self.apartment)
            .finish_non_exhaustive()
    }
}

/// Optional lifecycle hooks of one fixture.
#[derive(Clone, Default)]
pub struct Hooks {
    pub(crate) one_time_setup: Option<Hook>,
    pub(crate) one_time_teardown: Option<Hook>,
    pub(crate) setup: Option<Hook>,
    pub(crate) teardown: Option<Hook>,
}

impl Hooks {
    pub fn has_one_time_setup(&self) -> bool {
        self.one_time_setup.is_some()
    }

    pub fn has_one_time_teardown(&self) -> bool {
        self.one_time_teardown.is_some()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("one_time_setup", &self.one_time_setup.is_some())
            .field("one_time_teardown", &self.one_time_teardown.is_some())
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}

/// A discovered fixture with its tests and nested child fixtures.
#[derive(Clone)]
pub struct FixtureDescriptor {
    pub id: FixtureId,
    pub name: String,
    pub full_name: String,
    pub parent: Option<FixtureId>,
    pub args: Args,
    pub tests: Vec<TestDescriptor>,
    pub children: Vec<FixtureDescriptor>,
    pub hooks: Hooks,
    pub categories: Vec<String>,
    pub properties: Properties,
    pub expect: Option<ExpectedOutcome>,
    pub run_state: RunState,
    pub conditions: Vec<Condition>,
    pub apartment: Apartment,
    pub parallelizable: bool,
    pub lifecycle: LifeCycle,
    pub description: Option<String>,
    pub(crate) factory: Factory,
}

impl FixtureDescriptor {
    /// Every test in this fixture and its children, depth first.
    pub fn all_tests(&self) -> Vec<&TestDescriptor> {
        let mut out: Vec<&TestDescriptor> = self.tests.iter().collect();
        for child in &self.children {
            out.extend(child.all_tests());
        }
        out
    }

    pub fn find_test(&self, full_name: &str) -> Option<&TestDescriptor> {
        self.all_tests().into_iter().find(|t| t.full_name == full_name)
    }

    pub(crate) fn instantiate(&self) -> Result<Instance, Abort> {
        (self.factory)(&self.args)
    }
}

impl fmt::Debug for FixtureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureDescriptor")
            .field("id", &self.id)
            .field("args", &self.args)
            .field("tests", &self.tests)
            .field("children", &self.children)
            .field("hooks", &self.hooks)
            .field("run_state", &self.run_state)
            .field("apartment", &self.apartment)
            .field("parallelizable", &self.parallelizable)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_outcome_parses_tags() {
        assert_eq!("Skipped".parse::<ExpectedOutcome>(), Ok(ExpectedOutcome::Skipped));
        assert_eq!("Skip".parse::<ExpectedOutcome>(), Ok(ExpectedOutcome::Skipped));
        assert!("Maybe".parse::<ExpectedOutcome>().is_err());
        assert_eq!(ExpectedOutcome::Mixed.verdict(), None);
    }

    #[test]
    fn conditions_exclude_platforms() {
        let platforms = vec!["linux".to_string(), "unix".to_string(), "rust".to_string()];
        let exclude_rust = Condition {
            include: vec![],
            exclude: vec!["Rust".into()],
        };
        assert_eq!(
            exclude_rust.excludes(&platforms).as_deref(),
            Some("Not supported on Rust")
        );
        let windows_only = Condition {
            include: vec!["windows".into()],
            exclude: vec![],
        };
        assert_eq!(
            windows_only.excludes(&platforms).as_deref(),
            Some("Only supported on windows")
        );
        let unix_only = Condition {
            include: vec!["unix".into()],
            exclude: vec![],
        };
        assert_eq!(unix_only.excludes(&platforms), None);
    }
}
