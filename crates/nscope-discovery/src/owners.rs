//! Resolves which user namespaces own the other namespaces.
//!
//! Must only run once user namespaces have been completely discovered;
//! running it earlier leaves the owners of not yet known user namespaces
//! unresolved.

use nscope_common::types::{NamespaceId, NamespaceType};

use crate::result::DiscoveryResult;

/// Links the namespaces of type `ns_type` to their owning user namespaces.
///
/// User namespaces are skipped, their relation is the parent/child
/// hierarchy. Running it again yields the same links.
pub(crate) fn resolve_ownership(ns_type: NamespaceType, result: &mut DiscoveryResult) {
    if result.options().skip_ownership || ns_type == NamespaceType::User {
        return;
    }
    let users = result.namespaces(NamespaceType::User);
    let resolved: Vec<(NamespaceId, NamespaceId)> = result
        .namespaces(ns_type)
        .values()
        .filter_map(|ns| {
            let owner = ns.owner_id()?;
            users.contains_key(&owner).then_some((ns.id(), owner))
        })
        .collect();
    let unresolved = result.namespaces(ns_type).len() - resolved.len();

    for &(id, owner) in &resolved {
        if let Some(ns) = result.namespaces_mut(ns_type).get_mut(&id) {
            ns.set_owner(owner);
        }
        if let Some(userns) = result.namespaces_mut(NamespaceType::User).get_mut(&owner) {
            userns.add_owned(ns_type, id);
        }
    }
    tracing::debug!(%ns_type, resolved = resolved.len(), unresolved, "ownership resolved");
}
