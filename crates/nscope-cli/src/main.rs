//! # nscope: Linux namespace discovery
//!
//! Lists the namespaces of the running system and how they relate, and
//! translates PIDs between PID namespaces.

mod commands;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    // Re-executed workers end here; must run before anything touches stdout.
    nscope_core::reexec::handle_reexec();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
