//! Defines the command-line arguments and subcommands for the `verdict` CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Args, Parser, Subcommand};

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "verdict",
    version,
    about = "Runs the bundled demo fixtures and verifies their expected outcomes."
)]
pub struct VerdictArgs {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the demo suite, print each verdict and check expected outcomes.
    Run(RunArgs),
    /// List discovered tests and discovery errors without running anything.
    List {
        /// Only list tests matching this filter expression.
        #[arg(short, long)]
        filter: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Selection filter, e.g. `Category=Slow & !(Name~Theory)`.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Maximum number of fixtures or tests running at once.
    #[arg(short, long, default_value_t = 1)]
    pub workers: usize,

    /// Seed for random parameters; chosen at random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// A named test parameter, written KEY=VALUE. May be repeated.
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Run per-test teardown even when setup failed.
    #[arg(long)]
    pub teardown_after_failed_setup: bool,

    /// Print the run report as JSON instead of per-test lines.
    #[arg(long)]
    pub json: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}
