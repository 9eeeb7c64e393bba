//! The `verdict` Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! discovery, scheduling and acceptance checking of the demo suite.

use std::process;

use clap::Parser;
use tracing::Level;

use crate::cli::args::{Command, RunArgs, VerdictArgs};
use crate::cli::output::{color_choice, print_listing, print_run_summary, LiveReporter};
use crate::errors::VerdictError;
use crate::scheduler::Scheduler;
use crate::settings::RunSettings;
use crate::{acceptance, demo};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = VerdictArgs::parse();
    init_logging(args.verbose);

    // Dispatch to the appropriate subcommand handler.
    let result = match args.command {
        Command::Run(run) => handle_run(run),
        Command::List { filter } => handle_list(filter),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Handles the `run` subcommand. Returns whether every expected outcome
/// matched.
fn handle_run(args: RunArgs) -> Result<bool, VerdictError> {
    let mut settings = RunSettings::default().with_workers(args.workers);
    if let Some(seed) = args.seed {
        settings = settings.with_seed(seed);
    }
    if let Some(filter) = args.filter {
        settings = settings.with_filter(filter);
    }
    for raw in &args.params {
        settings.parameter(raw)?;
    }
    settings.teardown_after_failed_setup = args.teardown_after_failed_setup;
    if args.no_color {
        settings.use_colors = false;
    }

    let choice = color_choice(settings.use_colors);
    let discovery = demo::registry().discover(settings.seed);
    let scheduler = Scheduler::new(settings)?;

    // Caught test panics become verdicts; keep them off the terminal.
    std::panic::set_hook(Box::new(|info| {
        tracing::debug!(panic = %info, "test panicked");
    }));

    let report = if args.json {
        scheduler.run(&discovery)
    } else {
        let live = LiveReporter::new(choice);
        scheduler.with_listener(&live).run(&discovery)
    };
    let _ = std::panic::take_hook();

    let acceptance = acceptance::verify(&discovery, &report);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_summary(&report, &acceptance, choice)?;
    }
    Ok(acceptance.is_success())
}

/// Handles the `list` subcommand.
fn handle_list(filter: Option<String>) -> Result<bool, VerdictError> {
    let mut settings = RunSettings::default();
    settings.filter = filter;
    let choice = color_choice(settings.use_colors);
    let discovery = demo::registry().discover(settings.seed);
    let scheduler = Scheduler::new(settings)?;
    print_listing(&discovery, &scheduler, choice)?;
    Ok(true)
}
