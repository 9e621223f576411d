//! Walks the parent/child hierarchy of PID and user namespaces.
//!
//! Ancestors that no process is a member of are added as hidden
//! namespaces without a re-entry reference. The walk upwards stops at the
//! first ancestor already known, or where the kernel refuses to reveal
//! the parent because it lies outside the caller's visibility.

use nscope_common::types::{NamespaceId, NamespaceType};
use nscope_core::namespace::NamespaceFile;

use crate::namespace::Namespace;
use crate::result::DiscoveryResult;

/// Links all known namespaces of a hierarchical type to their parents.
///
/// Idempotent: namespaces that already have a parent are left alone.
pub(crate) fn discover_hierarchy(ns_type: NamespaceType, result: &mut DiscoveryResult) {
    if result.options().skip_hierarchy || !ns_type.is_hierarchical() {
        return;
    }
    let pending: Vec<(NamespaceId, String)> = result
        .namespaces(ns_type)
        .values()
        .filter(|ns| ns.parent().is_none())
        .filter_map(|ns| Some((ns.id(), ns.reference()?.to_owned())))
        .collect();
    let before = result.namespaces(ns_type).len();
    for (id, reference) in pending {
        let file = match NamespaceFile::open(&reference) {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!(%ns_type, reference, error = %e, "cannot open namespace");
                continue;
            }
        };
        // References of bind mounts only resolve within their own mount
        // namespace, and proc references go stale on PID reuse.
        match file.id() {
            Ok(actual) if actual == id => walk_up(ns_type, id, file, result),
            Ok(actual) => {
                tracing::debug!(%ns_type, %id, %actual, reference, "reference identifies another namespace");
            }
            Err(e) => tracing::debug!(%ns_type, reference, error = %e, "cannot identify namespace"),
        }
    }
    tracing::info!(
        %ns_type,
        hidden = result.namespaces(ns_type).len() - before,
        "namespace hierarchy walked"
    );
}

fn walk_up(ns_type: NamespaceType, mut child: NamespaceId, mut file: NamespaceFile, result: &mut DiscoveryResult) {
    loop {
        let parent_file = match file.parent() {
            Ok(parent) => parent,
            Err(e) => {
                tracing::trace!(%ns_type, %child, error = %e, "no visible parent");
                return;
            }
        };
        let Ok(parent_id) = parent_file.id() else {
            return;
        };
        let record_owner = !result.options().skip_ownership;
        let (parent, created) = result.merge_namespace(ns_type, parent_id);
        if created {
            describe_hidden(parent, &parent_file, record_owner);
        }
        result.link_parent(ns_type, child, parent_id);
        if !created {
            return;
        }
        child = parent_id;
        file = parent_file;
    }
}

/// Records what the kernel reveals about a namespace known only as an
/// ancestor: its creator's UID for user namespaces, its owning user
/// namespace otherwise.
fn describe_hidden(ns: &mut Namespace, file: &NamespaceFile, record_owner: bool) {
    if ns.ns_type() == NamespaceType::User {
        if let Ok(uid) = file.owner_uid() {
            ns.set_owner_uid(uid);
        }
    } else if record_owner {
        match file.user().and_then(|user| user.id()) {
            Ok(owner) => ns.set_owner_id(owner),
            Err(e) => tracing::trace!(ns = %ns, error = %e, "owner of hidden namespace not visible"),
        }
    }
}

#[cfg(test)]
mod tests {
    use nscope_common::config::DiscoveryOptions;

    use super::*;

    fn with_own_namespace(ns_type: NamespaceType, options: DiscoveryOptions) -> DiscoveryResult {
        let mut result = DiscoveryResult::new(options);
        let path = format!("/proc/self/ns/{}", ns_type.name());
        if let Ok(id) = nscope_core::namespace::namespace_id(&path) {
            let (ns, _) = result.merge_namespace(ns_type, id);
            ns.set_reference(path);
        }
        result
    }

    #[test]
    fn skipped_when_disabled() {
        let mut result = with_own_namespace(NamespaceType::Pid, DiscoveryOptions::NONE);
        let before = result.namespace_count();
        discover_hierarchy(NamespaceType::Pid, &mut result);
        assert_eq!(result.namespace_count(), before);
    }

    #[test]
    fn flat_types_have_no_hierarchy() {
        let mut result = with_own_namespace(NamespaceType::Net, DiscoveryOptions::FULL);
        let before = result.namespace_count();
        discover_hierarchy(NamespaceType::Net, &mut result);
        assert_eq!(result.namespace_count(), before);
    }

    #[test]
    fn links_are_consistent_in_both_directions() {
        for ns_type in [NamespaceType::Pid, NamespaceType::User] {
            let mut result = with_own_namespace(ns_type, DiscoveryOptions::FULL);
            discover_hierarchy(ns_type, &mut result);
            discover_hierarchy(ns_type, &mut result);
            for ns in result.namespaces(ns_type).values() {
                if let Some(parent) = result.parent_of(ns) {
                    assert!(parent.children().contains(&ns.id()));
                }
                assert_ne!(ns.parent(), Some(ns.id()));
            }
        }
    }

    #[test]
    fn stale_reference_is_not_walked() {
        let mut result = DiscoveryResult::new(DiscoveryOptions::FULL);
        let bogus = NamespaceId::new(4, 999_999);
        let (ns, _) = result.merge_namespace(NamespaceType::Pid, bogus);
        ns.set_reference("/proc/self/ns/pid");

        discover_hierarchy(NamespaceType::Pid, &mut result);

        let ns = result.namespace(NamespaceType::Pid, bogus).unwrap();
        assert_eq!(ns.parent(), None);
        assert_eq!(result.namespace_count(), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn hidden_namespace_records_its_owner() {
        let path = "/proc/self/ns/pid";
        let Ok(file) = NamespaceFile::open(path) else {
            return;
        };
        let id = file.id().unwrap();
        let mut ns = Namespace::new(NamespaceType::Pid, id);
        describe_hidden(&mut ns, &file, true);
        assert_eq!(ns.owner_id(), nscope_core::namespace::owning_user_namespace(path));

        let mut ns = Namespace::new(NamespaceType::Pid, id);
        describe_hidden(&mut ns, &file, false);
        assert_eq!(ns.owner_id(), None);
    }
}
