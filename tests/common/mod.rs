//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use verdict::reconcile::Verdict;
use verdict::registry::{Discovery, Registry};
use verdict::report::{ExecutionResult, RunReport};
use verdict::settings::RunSettings;
use verdict::Scheduler;

pub const SEED: u64 = 20_240_601;

/// Settings with a fixed seed and the given worker count.
pub fn settings(workers: usize) -> RunSettings {
    RunSettings::default().with_seed(SEED).with_workers(workers)
}

/// Discovers and runs `registry` with `settings`.
pub fn run_with(registry: &Registry, settings: RunSettings) -> (Discovery, RunReport) {
    let discovery = registry.discover(settings.seed);
    let report = Scheduler::new(settings)
        .expect("valid settings")
        .run(&discovery);
    (discovery, report)
}

pub fn run(registry: &Registry) -> (Discovery, RunReport) {
    run_with(registry, settings(1))
}

pub fn result<'r>(report: &'r RunReport, full_name: &str) -> &'r ExecutionResult {
    report
        .find(full_name)
        .unwrap_or_else(|| panic!("no result for {full_name}"))
}

pub fn verdict_of(report: &RunReport, full_name: &str) -> Verdict {
    result(report, full_name).verdict
}

/// An ordered event log shared between a test and the fixtures it builds.
#[derive(Debug, Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Fixture state that only carries a log.
pub struct Logged {
    pub log: Log,
}

impl Logged {
    /// A fixture factory handing each instance a clone of `log`.
    pub fn factory(log: &Log) -> impl Fn(&verdict::value::Args) -> Logged + Send + Sync + 'static {
        let log = log.clone();
        move |_| Logged { log: log.clone() }
    }
}
