//! Discovers namespaces that are only reachable through bind mounts,
//! including bind mounts living in other mount namespaces.
//!
//! Bind mounts in other mount namespaces can only be seen from inside
//! them, so every known mount namespace gets visited by a re-executed
//! worker joined to it. Mount namespaces found this way are queued for a
//! visit of their own. Each mount namespace is visited at most once, and
//! the caller's own mount namespace never, so the scan terminates.

use std::collections::{HashSet, VecDeque};

use nscope_common::constants::BINDMOUNTS_ACTION;
use nscope_common::error::{NscopeError, Result};
use nscope_common::types::{NamespaceId, NamespaceType};
use nscope_core::bindmount::{BindmountedNamespace, local_bindmounts};
use nscope_core::namespace::join::JoinTarget;
use nscope_core::namespace::owning_user_namespace;
use nscope_core::procfs::ProcFs;
use nscope_core::reexec::{ProcessReexecutor, Reexecutor};

use crate::result::DiscoveryResult;

/// Where bind-mounted namespaces come from.
pub trait BindmountSource {
    /// Lists the bind-mounted namespaces in the caller's own mount
    /// namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller's mount table cannot be read.
    fn local(&self) -> Result<Vec<BindmountedNamespace>>;

    /// Lists the bind-mounted namespaces as seen after joining
    /// `namespaces`, returning the worker's serialized findings.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespaces cannot be joined or the worker
    /// fails.
    fn within(&self, namespaces: &[JoinTarget]) -> Result<Vec<u8>>;

    /// Returns the user namespace owning the namespace at `reference`.
    fn owning_user(&self, reference: &str) -> Option<NamespaceId>;
}

/// Bind mounts of the running system, visiting other mount namespaces by
/// re-execution.
pub struct HostBindmounts {
    procfs: ProcFs,
    executor: Box<dyn Reexecutor>,
}

impl HostBindmounts {
    /// Creates a source reading `procfs` and re-executing the current
    /// binary.
    #[must_use]
    pub fn new(procfs: ProcFs) -> Self {
        Self::with_executor(procfs, Box::new(ProcessReexecutor::new()))
    }

    /// Creates a source visiting other mount namespaces via `executor`.
    #[must_use]
    pub fn with_executor(procfs: ProcFs, executor: Box<dyn Reexecutor>) -> Self {
        Self { procfs, executor }
    }
}

impl BindmountSource for HostBindmounts {
    fn local(&self) -> Result<Vec<BindmountedNamespace>> {
        local_bindmounts(self.procfs.own_mountinfo_path())
    }

    fn within(&self, namespaces: &[JoinTarget]) -> Result<Vec<u8>> {
        self.executor.run(BINDMOUNTS_ACTION, namespaces)
    }

    fn owning_user(&self, reference: &str) -> Option<NamespaceId> {
        owning_user_namespace(reference)
    }
}

/// Runs the bind-mount scan once, merging what it finds into `result`.
///
/// Mount namespaces that cannot be joined are skipped; so are those whose
/// worker violates the output protocol, which is logged as an error.
pub(crate) fn discover_bindmounts(result: &mut DiscoveryResult, source: &dyn BindmountSource) {
    if result.options().skip_bindmounts {
        return;
    }
    match source.local() {
        Ok(found) => {
            let _ = merge(result, found);
        }
        Err(e) => tracing::debug!(error = %e, "cannot read own bind mounts"),
    }

    let mut backlog: VecDeque<NamespaceId> =
        result.namespaces(NamespaceType::Mount).keys().copied().collect();
    let mut visited: HashSet<NamespaceId> =
        result.initial_namespace(NamespaceType::Mount).into_iter().collect();
    let own_userns = result.initial_namespace(NamespaceType::User);
    let mut visits = 0_usize;

    while let Some(mntns) = backlog.pop_front() {
        if !visited.insert(mntns) {
            continue;
        }
        let Some(join) = join_set(result, source, mntns, own_userns) else {
            tracing::debug!(%mntns, "mount namespace has no reference");
            continue;
        };
        visits += 1;
        match fetch(source, &join) {
            Ok(found) => backlog.extend(merge(result, found)),
            Err(e) if e.is_protocol_violation() => {
                tracing::error!(%mntns, error = %e, "bind-mount worker broke protocol");
            }
            Err(e) => tracing::debug!(%mntns, error = %e, "skipping mount namespace"),
        }
    }
    tracing::info!(visits, "bind-mount scan finished");
}

/// Namespaces to join for visiting `mntns`: its owning user namespace
/// first, unless the caller already lives in it, then `mntns` itself.
fn join_set(
    result: &DiscoveryResult,
    source: &dyn BindmountSource,
    mntns: NamespaceId,
    own_userns: Option<NamespaceId>,
) -> Option<Vec<JoinTarget>> {
    let ns = result.namespace(NamespaceType::Mount, mntns)?;
    let reference = ns.reference()?;
    let mut join = Vec::with_capacity(2);
    let owner = ns.owner_id().or_else(|| source.owning_user(reference));
    let userns = owner
        .filter(|&owner| Some(owner) != own_userns)
        .and_then(|owner| result.namespace(NamespaceType::User, owner));
    if let Some((userns, userns_ref)) = userns.and_then(|u| Some((u.id(), u.reference()?))) {
        join.push(JoinTarget::new(userns_ref, NamespaceType::User).with_expected(userns));
    }
    join.push(JoinTarget::new(reference, NamespaceType::Mount).with_expected(mntns));
    Some(join)
}

fn fetch(source: &dyn BindmountSource, join: &[JoinTarget]) -> Result<Vec<BindmountedNamespace>> {
    let raw = source.within(join)?;
    serde_json::from_slice(&raw).map_err(|e| NscopeError::ProtocolViolation {
        action: BINDMOUNTS_ACTION.into(),
        source: e,
    })
}

/// Merges bind-mounted namespaces into `result`, returning the mount
/// namespaces not seen before.
fn merge(result: &mut DiscoveryResult, found: Vec<BindmountedNamespace>) -> Vec<NamespaceId> {
    let mut new_mntns = Vec::new();
    for bmnt in found {
        if bmnt.id.is_none() {
            continue;
        }
        let (ns, created) = result.merge_namespace(bmnt.ns_type, bmnt.id);
        if created {
            ns.set_reference(bmnt.path);
            if bmnt.ns_type == NamespaceType::Mount {
                new_mntns.push(bmnt.id);
            }
        }
        if let Some(owner) = bmnt.owner_id {
            ns.set_owner_id(owner);
        }
    }
    new_mntns
}
