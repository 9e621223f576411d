//! Discovery orchestration: runs the discovery phases in their fixed order.

use std::path::PathBuf;

use nscope_common::config::DiscoveryOptions;
use nscope_common::types::NamespaceType;
use nscope_core::procfs::ProcFs;

use crate::bindmount::{BindmountSource, HostBindmounts, discover_bindmounts};
use crate::hierarchy::discover_hierarchy;
use crate::owners::resolve_ownership;
use crate::process::read_process_table;
use crate::procs::discover_from_procs;
use crate::result::DiscoveryResult;

/// Discovers the namespaces of the running system with the host defaults.
///
/// The bind-mount scan re-executes the current binary, so binaries calling
/// this must call [`nscope_core::reexec::handle_reexec`] first thing in
/// `main`.
#[must_use]
pub fn discover(options: DiscoveryOptions) -> DiscoveryResult {
    Discoverer::new().discover(options)
}

/// Runs discoveries against a proc filesystem and a bind-mount source.
pub struct Discoverer {
    procfs: ProcFs,
    bindmounts: Box<dyn BindmountSource>,
}

impl Discoverer {
    /// Creates a discoverer for the host's `/proc`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_proc_root(nscope_common::constants::PROC_ROOT)
    }

    /// Creates a discoverer reading the proc filesystem mounted at `root`.
    #[must_use]
    pub fn with_proc_root(root: impl Into<PathBuf>) -> Self {
        let procfs = ProcFs::new(root);
        Self {
            bindmounts: Box::new(HostBindmounts::new(procfs.clone())),
            procfs,
        }
    }

    /// Replaces where bind-mounted namespaces are looked up.
    #[must_use]
    pub fn with_bindmount_source(mut self, source: Box<dyn BindmountSource>) -> Self {
        self.bindmounts = source;
        self
    }

    /// Runs a discovery.
    ///
    /// Per namespace type, namespaces are harvested from the processes and
    /// PID and user namespaces get their hierarchy walked. Afterwards the
    /// bind mounts of all reachable mount namespaces are scanned once.
    /// Ownership is resolved last, as it needs the complete set of user
    /// namespaces. Anything hidden by missing privileges is skipped.
    #[must_use]
    pub fn discover(&self, options: DiscoveryOptions) -> DiscoveryResult {
        tracing::info!(?options, proc_root = %self.procfs.root().display(), "discovering namespaces");
        let mut result = DiscoveryResult::new(options);
        for ns_type in NamespaceType::ALL {
            match self.procfs.own_namespace_id(ns_type) {
                Ok(id) => result.set_initial_namespace(ns_type, id),
                Err(e) => tracing::debug!(%ns_type, error = %e, "own namespace unknown"),
            }
        }
        result.set_processes(read_process_table(&self.procfs));

        for ns_type in NamespaceType::ALL {
            discover_from_procs(ns_type, &self.procfs, &mut result);
            discover_hierarchy(ns_type, &mut result);
        }

        discover_bindmounts(&mut result, self.bindmounts.as_ref());
        // Bind mounts may have revealed further PID and user namespaces.
        discover_hierarchy(NamespaceType::User, &mut result);
        discover_hierarchy(NamespaceType::Pid, &mut result);
        result.collect_roots();

        for ns_type in NamespaceType::ALL {
            resolve_ownership(ns_type, &mut result);
        }
        tracing::info!(
            namespaces = result.namespace_count(),
            processes = result.processes().len(),
            "discovery finished"
        );
        result
    }
}

impl Default for Discoverer {
    fn default() -> Self {
        Self::new()
    }
}
