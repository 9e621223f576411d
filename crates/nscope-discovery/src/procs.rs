//! Discovers namespaces from the memberships of processes.

use nscope_common::types::{NamespaceType, Pid};
use nscope_core::namespace::{NamespaceFile, owning_user_namespace};
use nscope_core::procfs::ProcFs;

use crate::result::DiscoveryResult;

/// Records the namespaces of type `ns_type` that the processes in the
/// process table are members of.
///
/// Processes whose namespace links cannot be read, because they vanished
/// or belong to another user, are skipped.
pub(crate) fn discover_from_procs(ns_type: NamespaceType, procfs: &ProcFs, result: &mut DiscoveryResult) {
    if result.options().skip_procs {
        return;
    }
    let record_owner = !result.options().skip_ownership;
    let pids: Vec<Pid> = result.processes().keys().copied().collect();
    let mut found = 0_usize;
    for pid in pids {
        let id = match procfs.namespace_id(pid, ns_type) {
            Ok(id) => id,
            Err(e) => {
                tracing::trace!(pid, %ns_type, error = %e, "namespace not visible");
                continue;
            }
        };
        let (ns, created) = result.merge_namespace(ns_type, id);
        if created {
            found += 1;
            let path = procfs.namespace_path(pid, ns_type);
            ns.set_reference(path.to_string_lossy());
            if ns_type == NamespaceType::User {
                if let Ok(uid) = NamespaceFile::open(&path).and_then(|f| f.owner_uid()) {
                    ns.set_owner_uid(uid);
                }
            } else if record_owner {
                if let Some(owner) = owning_user_namespace(&path) {
                    ns.set_owner_id(owner);
                }
            }
        }
        ns.add_member(pid);
        if let Some(process) = result.processes_mut().get_mut(&pid) {
            process.set_namespace(ns_type, id);
        }
    }
    tracing::info!(%ns_type, found, "namespaces discovered from processes");
}
