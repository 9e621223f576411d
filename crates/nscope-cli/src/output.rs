//! Formatted output and argument parsing helpers for CLI commands.

use anyhow::bail;
use nscope_common::types::{self, NamespaceType, format_id};
use nscope_discovery::{DiscoveryResult, Namespace};

/// Column header matching [`namespace_row`].
pub const HEADER: &str = "NAMESPACE                  PROCS  LEADER   OWNER                      REFERENCE";

/// Formats one namespace as a table row.
#[must_use]
pub fn namespace_row(result: &DiscoveryResult, ns: &Namespace) -> String {
    let leader = result
        .leaders(ns)
        .first()
        .map_or_else(|| "-".to_string(), |p| p.pid().to_string());
    let owner = if ns.ns_type() == NamespaceType::User {
        ns.parent().map(|p| format_id(p, NamespaceType::User))
    } else {
        ns.owner().or(ns.owner_id()).map(|o| format_id(o, NamespaceType::User))
    };
    format!(
        "{:<26} {:>5}  {:<8} {:<26} {}",
        ns.to_string(),
        ns.members().len(),
        leader,
        owner.as_deref().unwrap_or("-"),
        ns.reference().unwrap_or("-"),
    )
}

/// Parses a namespace type name such as `net`.
///
/// # Errors
///
/// Returns an error naming the valid types if `name` is unknown.
pub fn parse_type(name: &str) -> anyhow::Result<NamespaceType> {
    match NamespaceType::from_name(name) {
        Some(t) => Ok(t),
        None => {
            let valid: Vec<&str> = NamespaceType::ALL.iter().map(|t| t.name()).collect();
            bail!("unknown namespace type {name:?}, expected one of {}", valid.join(", "))
        }
    }
}

/// Parses `"<type>:[<inode>]"` or a bare inode number into the inode
/// number, requiring the type to be `ns_type`.
///
/// # Errors
///
/// Returns an error if the text is malformed or names another type.
pub fn parse_inode(text: &str, ns_type: NamespaceType) -> anyhow::Result<u64> {
    if let Some(ino) = types::inode(text) {
        return Ok(ino);
    }
    match types::type_and_inode(text) {
        Some((parsed, ino)) if parsed == ns_type => Ok(ino),
        Some(_) => bail!("{text:?} is not a {ns_type} namespace"),
        None => bail!("malformed namespace {text:?}"),
    }
}
