//! The discovery result: registry of namespaces and processes.

use std::collections::BTreeMap;

use nscope_common::config::DiscoveryOptions;
use nscope_common::types::{NamespaceId, NamespaceType, Pid};

use crate::namespace::Namespace;
use crate::process::Process;

/// Map from namespace identity to namespace, for a single type.
pub type NamespaceMap = BTreeMap<NamespaceId, Namespace>;

/// Everything a discovery run found.
///
/// The result is the single owner of all namespaces and processes; all
/// relations between them are identities looked up here.
#[derive(Debug, Clone)]
pub struct DiscoveryResult {
    options: DiscoveryOptions,
    namespaces: [NamespaceMap; NamespaceType::COUNT],
    processes: BTreeMap<Pid, Process>,
    initial: [Option<NamespaceId>; NamespaceType::COUNT],
    pid_roots: Vec<NamespaceId>,
    user_roots: Vec<NamespaceId>,
}

impl DiscoveryResult {
    pub(crate) fn new(options: DiscoveryOptions) -> Self {
        Self {
            options,
            namespaces: std::array::from_fn(|_| NamespaceMap::new()),
            processes: BTreeMap::new(),
            initial: [None; NamespaceType::COUNT],
            pid_roots: Vec::new(),
            user_roots: Vec::new(),
        }
    }

    /// Options this result was discovered with.
    pub const fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// All discovered namespaces of the given type.
    pub const fn namespaces(&self, ns_type: NamespaceType) -> &NamespaceMap {
        &self.namespaces[ns_type.index()]
    }

    /// Looks up a namespace by type and identity.
    pub fn namespace(&self, ns_type: NamespaceType, id: NamespaceId) -> Option<&Namespace> {
        self.namespaces(ns_type).get(&id)
    }

    /// Total number of discovered namespaces of all types.
    pub fn namespace_count(&self) -> usize {
        self.namespaces.iter().map(BTreeMap::len).sum()
    }

    /// All discovered processes, by PID.
    pub const fn processes(&self) -> &BTreeMap<Pid, Process> {
        &self.processes
    }

    /// Looks up a process by its PID.
    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    /// Namespace of the given type the discovering process was a member of.
    pub const fn initial_namespace(&self, ns_type: NamespaceType) -> Option<NamespaceId> {
        self.initial[ns_type.index()]
    }

    /// PID namespaces without a discovered parent.
    pub fn pid_roots(&self) -> &[NamespaceId] {
        &self.pid_roots
    }

    /// User namespaces without a discovered parent.
    pub fn user_roots(&self) -> &[NamespaceId] {
        &self.user_roots
    }

    /// Resolved owning user namespace of `ns`.
    pub fn owner_of(&self, ns: &Namespace) -> Option<&Namespace> {
        self.namespace(NamespaceType::User, ns.owner()?)
    }

    /// Parent namespace of a PID or user namespace.
    pub fn parent_of(&self, ns: &Namespace) -> Option<&Namespace> {
        self.namespace(ns.ns_type(), ns.parent()?)
    }

    /// Parent process of `process`.
    pub fn parent_process(&self, process: &Process) -> Option<&Process> {
        self.process(process.parent()?)
    }

    /// Processes without a discovered parent process.
    pub fn process_roots(&self) -> impl Iterator<Item = &Process> {
        self.processes.values().filter(|p| p.parent().is_none())
    }

    /// Member processes of `ns` whose parent process is not a member of
    /// the same namespace, or who have no parent at all.
    pub fn leaders(&self, ns: &Namespace) -> Vec<&Process> {
        ns.members()
            .iter()
            .filter_map(|pid| self.process(*pid))
            .filter(|p| {
                self.parent_process(p)
                    .is_none_or(|parent| parent.namespace(ns.ns_type()) != Some(ns.id()))
            })
            .collect()
    }

    pub(crate) const fn namespaces_mut(&mut self, ns_type: NamespaceType) -> &mut NamespaceMap {
        &mut self.namespaces[ns_type.index()]
    }

    /// Returns the namespace of the given type and identity, creating it
    /// if it was not known yet; the flag tells whether it was created.
    pub(crate) fn merge_namespace(
        &mut self,
        ns_type: NamespaceType,
        id: NamespaceId,
    ) -> (&mut Namespace, bool) {
        let map = self.namespaces_mut(ns_type);
        let created = !map.contains_key(&id);
        let ns = map.entry(id).or_insert_with(|| Namespace::new(ns_type, id));
        (ns, created)
    }

    pub(crate) const fn processes_mut(&mut self) -> &mut BTreeMap<Pid, Process> {
        &mut self.processes
    }

    pub(crate) fn set_processes(&mut self, processes: BTreeMap<Pid, Process>) {
        self.processes = processes;
    }

    pub(crate) const fn set_initial_namespace(&mut self, ns_type: NamespaceType, id: NamespaceId) {
        self.initial[ns_type.index()] = Some(id);
    }

    /// Links `child` below `parent` within a hierarchical type.
    pub(crate) fn link_parent(&mut self, ns_type: NamespaceType, child: NamespaceId, parent: NamespaceId) {
        if child == parent {
            return;
        }
        let map = self.namespaces_mut(ns_type);
        if !map.contains_key(&parent) {
            return;
        }
        let Some(ns) = map.get_mut(&child) else {
            return;
        };
        ns.set_parent(parent);
        if let Some(ns) = map.get_mut(&parent) {
            ns.add_child(child);
        }
    }

    /// Collects the roots of the PID and user namespace hierarchies.
    pub(crate) fn collect_roots(&mut self) {
        let roots = |map: &NamespaceMap| -> Vec<NamespaceId> {
            map.values()
                .filter(|ns| ns.parent().is_none())
                .map(Namespace::id)
                .collect()
        };
        self.pid_roots = roots(self.namespaces(NamespaceType::Pid));
        self.user_roots = roots(self.namespaces(NamespaceType::User));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake_process;

    fn id(ino: u64) -> NamespaceId {
        NamespaceId::new(4, ino)
    }

    #[test]
    fn merging_twice_keeps_a_single_record() {
        let mut result = DiscoveryResult::new(DiscoveryOptions::FULL);
        let (ns, created) = result.merge_namespace(NamespaceType::Net, id(1));
        ns.set_reference("/proc/1/ns/net");
        assert!(created);
        let (ns, created) = result.merge_namespace(NamespaceType::Net, id(1));
        assert!(!created);
        assert_eq!(ns.reference(), Some("/proc/1/ns/net"));
        assert_eq!(result.namespaces(NamespaceType::Net).len(), 1);
        assert_eq!(result.namespace_count(), 1);
    }

    #[test]
    fn same_identity_in_different_types_is_distinct() {
        let mut result = DiscoveryResult::new(DiscoveryOptions::FULL);
        let _ = result.merge_namespace(NamespaceType::Net, id(1));
        let _ = result.merge_namespace(NamespaceType::Ipc, id(1));
        assert_eq!(result.namespace_count(), 2);
    }

    #[test]
    fn links_hierarchy_and_collects_roots() {
        let mut result = DiscoveryResult::new(DiscoveryOptions::FULL);
        let _ = result.merge_namespace(NamespaceType::Pid, id(1));
        let _ = result.merge_namespace(NamespaceType::Pid, id(2));
        result.link_parent(NamespaceType::Pid, id(2), id(1));
        result.link_parent(NamespaceType::Pid, id(1), id(1));
        result.collect_roots();

        assert_eq!(result.pid_roots(), &[id(1)]);
        let child = result.namespace(NamespaceType::Pid, id(2)).unwrap();
        assert_eq!(result.parent_of(child).map(Namespace::id), Some(id(1)));
        assert!(result.namespace(NamespaceType::Pid, id(1)).unwrap().children().contains(&id(2)));
    }

    #[test]
    fn leaders_are_members_with_outside_parents() {
        let mut result = DiscoveryResult::new(DiscoveryOptions::FULL);
        let mut procs: BTreeMap<Pid, Process> = [(1, 0), (10, 1), (11, 10)]
            .into_iter()
            .map(|(pid, ppid)| (pid, fake_process(pid, ppid, vec![pid])))
            .collect();
        crate::process::link_process_tree(&mut procs);
        result.set_processes(procs);

        for (pid, ino) in [(1, 1), (10, 2), (11, 2)] {
            let (ns, _) = result.merge_namespace(NamespaceType::Net, id(ino));
            ns.add_member(pid);
            if let Some(p) = result.processes_mut().get_mut(&pid) {
                p.set_namespace(NamespaceType::Net, id(ino));
            }
        }

        let netns = result.namespace(NamespaceType::Net, id(2)).unwrap();
        let leaders: Vec<Pid> = result.leaders(netns).iter().map(|p| p.pid()).collect();
        assert_eq!(leaders, vec![10]);
    }
}
