//! `nscope translate`: Translate a PID between PID namespaces.

use anyhow::Context;
use clap::Args;
use nscope_common::types::{NamespaceId, NamespaceType, Pid};
use nscope_discovery::{DiscoveryOptions, DiscoveryResult, PidMap, discover};

use crate::output;

/// Arguments for the `translate` command.
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// PID to translate.
    pub pid: Pid,

    /// PID namespace the PID is valid in, as `pid:[<inode>]` or inode
    /// number. Defaults to our own PID namespace.
    #[arg(long)]
    pub from: Option<String>,

    /// PID namespace to translate into. Defaults to our own PID namespace.
    #[arg(long)]
    pub to: Option<String>,
}

/// Executes the `translate` command.
///
/// # Errors
///
/// Returns an error if a PID namespace is unknown or the PID has no
/// counterpart in the target PID namespace.
pub fn execute(args: &TranslateArgs, options: DiscoveryOptions) -> anyhow::Result<()> {
    let result = discover(options);
    let from = pid_namespace(&result, args.from.as_deref())?;
    let to = pid_namespace(&result, args.to.as_deref())?;
    let pidmap = PidMap::new(&result);

    let translated = pidmap
        .translate(args.pid, from, to)
        .with_context(|| format!("PID {} of pid:[{from}] has no PID in pid:[{to}]", args.pid))?;
    println!("{translated}");
    Ok(())
}

/// Looks up a discovered PID namespace by its textual form, falling back to
/// our own PID namespace.
fn pid_namespace(result: &DiscoveryResult, text: Option<&str>) -> anyhow::Result<NamespaceId> {
    let Some(text) = text else {
        return result
            .initial_namespace(NamespaceType::Pid)
            .context("own PID namespace is unknown");
    };
    let ino = output::parse_inode(text, NamespaceType::Pid)?;
    result
        .namespaces(NamespaceType::Pid)
        .keys()
        .copied()
        .find(|id| id.ino == ino)
        .with_context(|| format!("unknown PID namespace pid:[{ino}]"))
}
