//! Error types for discovery, filtering, settings and the CLI.
//!
//! Every error is a `thiserror` enum that also derives `miette::Diagnostic`,
//! so the binary can render codes, labels and help text uniformly. Test
//! bodies never see these types; they use [`crate::signal::Abort`].

use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

// ============================================================================
// DISCOVERY
// ============================================================================

/// A malformed declaration found while expanding fixtures.
///
/// A test-level error makes only that test not runnable; a fixture-level
/// error makes the whole fixture not runnable. Either way the affected tests
/// report `Error` with this message when executed.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    #[error("{target}: ignore and explicit directives conflict")]
    #[diagnostic(
        code(verdict::discovery::conflicting_directives),
        help("declare either `.ignore(reason)` or `.explicit()`, not both")
    )]
    IgnoreAndExplicit { target: String },

    #[error("{target}: an ignore directive requires a reason")]
    #[diagnostic(code(verdict::discovery::empty_ignore_reason))]
    EmptyIgnoreReason { target: String },

    #[error("{target}: expected {expected} argument(s) but the case supplies {actual}")]
    #[diagnostic(code(verdict::discovery::arity))]
    ArityMismatch {
        target: String,
        expected: usize,
        actual: usize,
    },

    #[error("{target}: method returns a value but the case declares no expected result")]
    #[diagnostic(
        code(verdict::discovery::missing_expected_result),
        help("add `.returns(value)` to the case")
    )]
    MissingExpectedResult { target: String },

    #[error("{target}: method has no return value but the case declares an expected result")]
    #[diagnostic(
        code(verdict::discovery::unexpected_expected_result),
        help("declare the method with `TestDef::returning`")
    )]
    UnexpectedExpectedResult { target: String },

    #[error("{target}: no arguments were provided for parameter {index}")]
    #[diagnostic(
        code(verdict::discovery::no_arguments),
        help("declare datapoints of the parameter's kind on the fixture, or give explicit values")
    )]
    NoParameterValues { target: String, index: usize },

    #[error("{target}: invalid range for parameter {index}: {detail}")]
    #[diagnostic(code(verdict::discovery::invalid_range))]
    InvalidRange {
        target: String,
        index: usize,
        detail: String,
    },

    #[error("{target}: parameterized method declares no cases")]
    #[diagnostic(code(verdict::discovery::no_cases))]
    NoCases { target: String },

    #[error("{parent}: a fixture or test has an empty name")]
    #[diagnostic(code(verdict::discovery::empty_name))]
    EmptyName { parent: String },
}

impl DiscoveryError {
    /// The full name of the fixture or test the error belongs to.
    pub fn target(&self) -> &str {
        match self {
            DiscoveryError::IgnoreAndExplicit { target }
            | DiscoveryError::EmptyIgnoreReason { target }
            | DiscoveryError::ArityMismatch { target, .. }
            | DiscoveryError::MissingExpectedResult { target }
            | DiscoveryError::UnexpectedExpectedResult { target }
            | DiscoveryError::NoParameterValues { target, .. }
            | DiscoveryError::InvalidRange { target, .. }
            | DiscoveryError::NoCases { target } => target,
            DiscoveryError::EmptyName { parent } => parent,
        }
    }
}

// ============================================================================
// FILTER
// ============================================================================

/// A malformed selection filter, labelled at the offending span.
#[derive(Error, Diagnostic, Debug, Clone)]
pub enum FilterError {
    #[error("Filter error: unexpected {found}")]
    #[diagnostic(code(verdict::filter::unexpected_token))]
    UnexpectedToken {
        found: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("expected {expected}")]
        span: SourceSpan,
        expected: String,
    },

    #[error("Filter error: unknown operator '{operator}'")]
    #[diagnostic(
        code(verdict::filter::unknown_operator),
        help("supported operators are =, !=, ~ and !~")
    )]
    UnknownOperator {
        operator: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Filter error: unterminated parenthesis")]
    #[diagnostic(code(verdict::filter::unbalanced))]
    Unbalanced {
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("opened here")]
        span: SourceSpan,
    },

    #[error("Filter error: empty filter expression")]
    #[diagnostic(
        code(verdict::filter::empty),
        help("omit --filter to run every test")
    )]
    Empty,
}

// ============================================================================
// SETTINGS AND CLI
// ============================================================================

#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("workers must be at least 1")]
    #[diagnostic(code(verdict::settings::workers))]
    ZeroWorkers,

    #[error("invalid run parameter '{raw}'")]
    #[diagnostic(
        code(verdict::settings::parameter),
        help("parameters are written KEY=VALUE")
    )]
    InvalidParameter { raw: String },
}

/// Top-level error of the `verdict` binary.
#[derive(Error, Diagnostic, Debug)]
pub enum VerdictError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Settings(#[from] SettingsError),

    #[error("could not serialize the run report")]
    #[diagnostic(code(verdict::cli::json))]
    Json(#[from] serde_json::Error),

    #[error("could not write to the terminal")]
    #[diagnostic(code(verdict::cli::io))]
    Io(#[from] std::io::Error),
}
