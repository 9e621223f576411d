//! Translates PIDs between PID namespaces.
//!
//! A process has a different PID in its own PID namespace and in every
//! ancestor PID namespace. The kernel lists these PIDs in the `NSpid` field
//! of `/proc/<pid>/status`, ordered from the outermost namespace visible to
//! the proc filesystem down to the process' own one; pairing them with the
//! discovered PID namespace hierarchy yields a PID per namespace.

use std::collections::HashMap;

use nscope_common::types::{NamespaceId, NamespaceType, Pid};

use crate::result::DiscoveryResult;

/// A PID together with the PID namespace it is valid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespacedPid {
    /// The PID namespace.
    pub pid_ns: NamespaceId,
    /// The PID within `pid_ns`.
    pub pid: Pid,
}

/// Read-only index for translating PIDs between PID namespaces, built from
/// a finished [`DiscoveryResult`].
#[derive(Debug, Clone, Default)]
pub struct PidMap {
    /// (PID namespace, PID in it) to the PID as seen by discovery.
    processes: HashMap<NamespacedPid, Pid>,
    /// PID as seen by discovery to its PIDs, innermost namespace first.
    namespaced: HashMap<Pid, Vec<NamespacedPid>>,
    /// Parent of each PID namespace.
    parents: HashMap<NamespaceId, NamespaceId>,
}

impl PidMap {
    /// Builds the translation index from a discovery result.
    ///
    /// Translation across PID namespaces needs the process table, the
    /// processes' namespaces and the PID namespace hierarchy.
    pub fn new(result: &DiscoveryResult) -> Self {
        let parents: HashMap<NamespaceId, NamespaceId> = result
            .namespaces(NamespaceType::Pid)
            .values()
            .filter_map(|ns| Some((ns.id(), ns.parent()?)))
            .collect();
        let initial_pidns = result.initial_namespace(NamespaceType::Pid);

        let mut map = Self {
            parents,
            ..Self::default()
        };
        for process in result.processes().values() {
            let Some(own_pidns) = process.namespace(NamespaceType::Pid) else {
                continue;
            };
            let mut pids = Vec::with_capacity(process.nspids().len());
            if process.nspids().is_empty() {
                // Without NSpid only the local PID in the initial namespace is known.
                if Some(own_pidns) == initial_pidns {
                    pids.push(NamespacedPid {
                        pid_ns: own_pidns,
                        pid: process.pid(),
                    });
                }
            } else {
                let mut pid_ns = Some(own_pidns);
                for &pid in process.nspids().iter().rev() {
                    let Some(ns) = pid_ns else {
                        break;
                    };
                    pids.push(NamespacedPid { pid_ns: ns, pid });
                    pid_ns = map.parents.get(&ns).copied();
                }
            }
            for &nspid in &pids {
                let _ = map.processes.insert(nspid, process.pid());
            }
            let _ = map.namespaced.insert(process.pid(), pids);
        }
        map
    }

    /// Translates `pid`, valid in PID namespace `from`, into the PID of the
    /// same process as seen from PID namespace `to`.
    ///
    /// Returns `None` if `pid` is unknown in `from`, if `to` is neither an
    /// ancestor nor a descendant of `from`, or if the process' PID in some
    /// namespace along the way is not known.
    pub fn translate(&self, pid: Pid, from: NamespaceId, to: NamespaceId) -> Option<Pid> {
        let process = *self.processes.get(&NamespacedPid { pid_ns: from, pid })?;
        let pids = self.namespaced.get(&process)?;
        let mut translated = pid;
        for hop in self.hops(from, to)? {
            translated = pids.iter().find(|nspid| nspid.pid_ns == hop)?.pid;
        }
        Some(translated)
    }

    /// Returns the PIDs of the process known as `pid` in PID namespace
    /// `pid_ns`, from its own PID namespace outwards; empty if unknown.
    pub fn namespaced_pids(&self, pid: Pid, pid_ns: NamespaceId) -> Vec<NamespacedPid> {
        self.processes
            .get(&NamespacedPid { pid_ns, pid })
            .and_then(|process| self.namespaced.get(process))
            .cloned()
            .unwrap_or_default()
    }

    /// PID namespaces passed when moving from `from` to `to`, excluding
    /// `from` and including `to`.
    fn hops(&self, from: NamespaceId, to: NamespaceId) -> Option<Vec<NamespaceId>> {
        if let Some(up) = self.path_up(from, to) {
            return Some(up);
        }
        let mut down = self.path_up(to, from)?;
        // Moving down visits the namespaces below `from` in reverse, ending at `to`.
        let _ = down.pop();
        down.reverse();
        down.push(to);
        Some(down)
    }

    /// Namespaces from the parent of `from` up to and including `ancestor`,
    /// or `None` if `ancestor` is not an ancestor of `from` (or itself).
    fn path_up(&self, from: NamespaceId, ancestor: NamespaceId) -> Option<Vec<NamespaceId>> {
        let mut path = Vec::new();
        let mut current = from;
        while current != ancestor {
            current = *self.parents.get(&current)?;
            path.push(current);
            if path.len() > self.parents.len() {
                return None;
            }
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use nscope_common::config::DiscoveryOptions;

    use super::*;
    use crate::process::fake_process;

    fn id(ino: u64) -> NamespaceId {
        NamespaceId::new(4, ino)
    }

    /// `pid:[1]` is the root with child `pid:[2]`, which has child
    /// `pid:[3]`; `pid:[9]` is an unrelated root. Processes (PID in
    /// `pid:[1]`, NSpid, own PID namespace):
    /// - 1: [1] in pid:[1]
    /// - 100: [100, 7] in pid:[2]
    /// - 200: [200, 8, 1] in pid:[3]
    /// - 300: [300, 1] in pid:[9]
    fn scenario() -> DiscoveryResult {
        scenario_with_links(&[(2, 1), (3, 2)])
    }

    fn scenario_with_links(links: &[(u64, u64)]) -> DiscoveryResult {
        let mut result = DiscoveryResult::new(DiscoveryOptions::FULL);
        result.set_initial_namespace(NamespaceType::Pid, id(1));
        for ino in [1, 2, 3, 9] {
            let _ = result.merge_namespace(NamespaceType::Pid, id(ino));
        }
        for &(child, parent) in links {
            result.link_parent(NamespaceType::Pid, id(child), id(parent));
        }

        let procs = [
            (1, 0, vec![1], 1),
            (100, 1, vec![100, 7], 2),
            (200, 100, vec![200, 8, 1], 3),
            (300, 1, vec![300, 1], 9),
        ];
        let mut table = std::collections::BTreeMap::new();
        for (pid, ppid, nspids, pidns) in procs {
            let mut process = fake_process(pid, ppid, nspids);
            process.set_namespace(NamespaceType::Pid, id(pidns));
            let _ = table.insert(pid, process);
        }
        crate::process::link_process_tree(&mut table);
        result.set_processes(table);
        result.collect_roots();
        result
    }

    #[test]
    fn nested_namespace_has_parent_root() {
        let result = scenario();
        assert_eq!(result.namespaces(NamespaceType::Pid).len(), 4);
        let child = result.namespace(NamespaceType::Pid, id(2)).unwrap();
        assert_eq!(child.parent(), Some(id(1)));
        assert_eq!(result.pid_roots(), &[id(1), id(9)]);
    }

    #[test]
    fn translates_upwards() {
        let pidmap = PidMap::new(&scenario());
        assert_eq!(pidmap.translate(7, id(2), id(1)), Some(100));
        assert_eq!(pidmap.translate(1, id(3), id(2)), Some(8));
        assert_eq!(pidmap.translate(1, id(3), id(1)), Some(200));
    }

    #[test]
    fn translates_downwards() {
        let pidmap = PidMap::new(&scenario());
        assert_eq!(pidmap.translate(100, id(1), id(2)), Some(7));
        assert_eq!(pidmap.translate(200, id(1), id(3)), Some(1));
        assert_eq!(pidmap.translate(8, id(2), id(3)), Some(1));
    }

    #[test]
    fn translation_is_symmetric() {
        let pidmap = PidMap::new(&scenario());
        for (pid, from, to) in [(7, 2, 1), (1, 3, 1), (1, 3, 2), (8, 2, 1)] {
            let there = pidmap.translate(pid, id(from), id(to)).unwrap();
            assert_eq!(pidmap.translate(there, id(to), id(from)), Some(pid));
        }
    }

    #[test]
    fn same_namespace_translates_to_itself() {
        let pidmap = PidMap::new(&scenario());
        assert_eq!(pidmap.translate(7, id(2), id(2)), Some(7));
        assert_eq!(pidmap.translate(0, id(1), id(1)), None);
    }

    #[test]
    fn unrelated_namespaces_do_not_translate() {
        let pidmap = PidMap::new(&scenario());
        assert_eq!(pidmap.translate(1, id(9), id(2)), None);
        assert_eq!(pidmap.translate(7, id(2), id(9)), None);
    }

    #[test]
    fn processes_outside_the_target_do_not_translate() {
        let pidmap = PidMap::new(&scenario());
        // PID 1 of pid:[1] is not visible inside pid:[2].
        assert_eq!(pidmap.translate(1, id(1), id(2)), None);
        assert_eq!(pidmap.translate(4242, id(1), id(2)), None);
    }

    #[test]
    fn missing_hierarchy_link_breaks_translation() {
        // A privilege gap hides that pid:[3] is a child of pid:[2].
        let result = scenario_with_links(&[(2, 1)]);
        let pidmap = PidMap::new(&result);
        assert_eq!(pidmap.translate(1, id(3), id(1)), None);
        assert_eq!(pidmap.translate(7, id(2), id(1)), Some(100));
    }

    #[test]
    fn lists_namespaced_pids_innermost_first() {
        let pidmap = PidMap::new(&scenario());
        let pids: Vec<(u64, Pid)> = pidmap
            .namespaced_pids(1, id(3))
            .iter()
            .map(|n| (n.pid_ns.ino, n.pid))
            .collect();
        assert_eq!(pids, vec![(3, 1), (2, 8), (1, 200)]);
        assert!(pidmap.namespaced_pids(1, id(7)).is_empty());
    }
}
