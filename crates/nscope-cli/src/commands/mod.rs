//! CLI command definitions and dispatch.

pub mod list;
pub mod translate;

use clap::{Args, Parser, Subcommand};
use nscope_discovery::DiscoveryOptions;

/// nscope: discovers Linux namespaces and how they relate.
#[derive(Parser, Debug)]
#[command(name = "nscope", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Discovery phases to skip.
    #[command(flatten)]
    pub discovery: DiscoveryArgs,
}

/// Switches turning off individual discovery phases.
#[derive(Args, Debug, Default, Clone, Copy)]
pub struct DiscoveryArgs {
    /// Do not discover namespaces from processes.
    #[arg(long, global = true)]
    pub skip_procs: bool,

    /// Do not walk the PID and user namespace hierarchies.
    #[arg(long, global = true)]
    pub skip_hierarchy: bool,

    /// Do not look for bind-mounted namespaces.
    #[arg(long, global = true)]
    pub skip_bindmounts: bool,

    /// Do not resolve owning user namespaces.
    #[arg(long, global = true)]
    pub skip_ownership: bool,
}

impl From<DiscoveryArgs> for DiscoveryOptions {
    fn from(args: DiscoveryArgs) -> Self {
        Self {
            skip_procs: args.skip_procs,
            skip_hierarchy: args.skip_hierarchy,
            skip_bindmounts: args.skip_bindmounts,
            skip_ownership: args.skip_ownership,
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the discovered namespaces.
    List(list::ListArgs),
    /// Translate a PID from one PID namespace into another.
    Translate(translate::TranslateArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let options = DiscoveryOptions::from(cli.discovery);
    match cli.command {
        Command::List(args) => list::execute(&args, options),
        Command::Translate(args) => translate::execute(&args, options),
    }
}
