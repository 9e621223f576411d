//! `nscope list`: List the discovered namespaces.

use clap::Args;
use nscope_common::types::NamespaceType;
use nscope_discovery::{DiscoveryOptions, DiscoveryResult, Namespace, discover};

use crate::output;

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list namespaces of these types (mnt, cgroup, uts, ipc, user, pid, net).
    #[arg(short = 't', long = "type", value_parser = output::parse_type)]
    pub types: Vec<NamespaceType>,

    /// Print the namespaces as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `list` command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(args: &ListArgs, options: DiscoveryOptions) -> anyhow::Result<()> {
    let result = discover(options);
    let namespaces = selected(&result, &args.types);
    tracing::info!(count = namespaces.len(), "listing namespaces");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&namespaces)?);
        return Ok(());
    }
    if namespaces.is_empty() {
        println!("No namespaces found.");
        return Ok(());
    }

    println!("{}", output::HEADER);
    for ns in namespaces {
        println!("{}", output::namespace_row(&result, ns));
    }
    Ok(())
}

/// Namespaces of the requested types, or of all types if none are requested.
fn selected<'a>(result: &'a DiscoveryResult, types: &[NamespaceType]) -> Vec<&'a Namespace> {
    NamespaceType::ALL
        .into_iter()
        .filter(|t| types.is_empty() || types.contains(t))
        .flat_map(|t| result.namespaces(t).values())
        .collect()
}
