//! `verdict`: a test-fixture lifecycle, scheduling and outcome-reconciliation
//! engine.
//!
//! Fixtures are declared as typed [`registry::FixtureDef`]s, expanded into
//! descriptors by [`registry::Registry::discover`], executed by
//! [`scheduler::Scheduler`] and reduced to one [`reconcile::Verdict`] per
//! test. The bundled [`demo`] suite tags every test with the outcome it is
//! expected to produce; [`acceptance::verify`] checks a run against those
//! tags.

pub mod acceptance;
pub mod cli;
pub mod context;
pub mod demo;
pub mod descriptor;
pub mod errors;
pub mod filter;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod settings;
pub mod signal;
pub mod value;

pub use crate::context::TestContext;
pub use crate::errors::VerdictError;
pub use crate::reconcile::Verdict;
pub use crate::registry::{FixtureDef, Registry, TestDef};
pub use crate::scheduler::Scheduler;
pub use crate::settings::RunSettings;
pub use crate::signal::{Abort, Outcome};
