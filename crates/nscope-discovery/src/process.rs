//! Discovered processes and the process tree.

use std::collections::{BTreeMap, BTreeSet};

use nscope_common::types::{NamespaceId, NamespaceType, Pid};
use nscope_core::procfs::{ProcEntry, ProcFs};
use serde::Serialize;

/// A process together with its namespace memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    pid: Pid,
    ppid: Pid,
    name: String,
    cmdline: Vec<String>,
    nspids: Vec<Pid>,
    parent: Option<Pid>,
    children: BTreeSet<Pid>,
    namespaces: [Option<NamespaceId>; NamespaceType::COUNT],
}

impl Process {
    pub(crate) fn from_entry(entry: ProcEntry) -> Self {
        Self {
            pid: entry.pid,
            ppid: entry.ppid,
            name: entry.name,
            cmdline: entry.cmdline,
            nspids: entry.nspids,
            parent: None,
            children: BTreeSet::new(),
            namespaces: [None; NamespaceType::COUNT],
        }
    }

    /// PID as seen from the PID namespace discovery ran in.
    pub const fn pid(&self) -> Pid {
        self.pid
    }

    /// Parent PID as reported by the kernel.
    pub const fn ppid(&self) -> Pid {
        self.ppid
    }

    /// Command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command line arguments.
    pub fn cmdline(&self) -> &[String] {
        &self.cmdline
    }

    /// PIDs of this process in each PID namespace it is visible in, from
    /// the outermost visible namespace down to its own one.
    pub fn nspids(&self) -> &[Pid] {
        &self.nspids
    }

    /// Parent process, if it was discovered as well.
    pub const fn parent(&self) -> Option<Pid> {
        self.parent
    }

    /// Child processes.
    pub const fn children(&self) -> &BTreeSet<Pid> {
        &self.children
    }

    /// Namespace of the given type this process is a member of.
    pub const fn namespace(&self, ns_type: NamespaceType) -> Option<NamespaceId> {
        self.namespaces[ns_type.index()]
    }

    pub(crate) const fn set_namespace(&mut self, ns_type: NamespaceType, id: NamespaceId) {
        self.namespaces[ns_type.index()] = Some(id);
    }
}

/// Reads all processes from `procfs`; vanished and unreadable ones are
/// skipped.
pub(crate) fn read_process_table(procfs: &ProcFs) -> BTreeMap<Pid, Process> {
    let pids = match procfs.pids() {
        Ok(pids) => pids,
        Err(e) => {
            tracing::warn!(error = %e, "cannot list processes");
            return BTreeMap::new();
        }
    };
    let mut table = BTreeMap::new();
    for pid in pids {
        match procfs.process(pid) {
            Ok(entry) => {
                let _ = table.insert(pid, Process::from_entry(entry));
            }
            Err(e) => tracing::debug!(pid, error = %e, "skipping process"),
        }
    }
    link_process_tree(&mut table);
    tracing::info!(count = table.len(), "process table read");
    table
}

/// Links processes to their parents, keeping the tree a forest: a link
/// that would close a cycle is dropped, leaving the process a root.
pub(crate) fn link_process_tree(table: &mut BTreeMap<Pid, Process>) {
    let pids: Vec<Pid> = table.keys().copied().collect();
    for pid in pids {
        let ppid = table[&pid].ppid;
        if ppid == pid || !table.contains_key(&ppid) || is_ancestor(table, pid, ppid) {
            continue;
        }
        if let Some(child) = table.get_mut(&pid) {
            child.parent = Some(ppid);
        }
        if let Some(parent) = table.get_mut(&ppid) {
            let _ = parent.children.insert(pid);
        }
    }
}

/// Whether `ancestor` is reachable from `pid` by following parent links.
fn is_ancestor(table: &BTreeMap<Pid, Process>, ancestor: Pid, pid: Pid) -> bool {
    let mut current = Some(pid);
    while let Some(p) = current {
        if p == ancestor {
            return true;
        }
        current = table.get(&p).and_then(|proc| proc.parent);
    }
    false
}

#[cfg(test)]
pub(crate) fn fake_process(pid: Pid, ppid: Pid, nspids: Vec<Pid>) -> Process {
    Process::from_entry(ProcEntry {
        pid,
        ppid,
        name: format!("proc{pid}"),
        cmdline: Vec::new(),
        nspids,
    })
}
