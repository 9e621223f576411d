//! Discovery configuration.

use serde::{Deserialize, Serialize};

/// Switches controlling which discovery phases run.
///
/// Every switch disables one phase; the presets [`DiscoveryOptions::FULL`]
/// and [`DiscoveryOptions::NONE`] enable or disable all of them.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    /// Do not harvest namespaces from the memberships of processes.
    pub skip_procs: bool,
    /// Do not walk the parent/child hierarchy of PID and user namespaces.
    pub skip_hierarchy: bool,
    /// Do not scan for bind-mounted namespaces, neither locally nor in
    /// other mount namespaces.
    pub skip_bindmounts: bool,
    /// Do not resolve which user namespaces own the other namespaces.
    pub skip_ownership: bool,
}

impl DiscoveryOptions {
    /// Runs every discovery phase.
    pub const FULL: Self = Self {
        skip_procs: false,
        skip_hierarchy: false,
        skip_bindmounts: false,
        skip_ownership: false,
    };

    /// Runs no discovery phase; only the process table gets read.
    pub const NONE: Self = Self {
        skip_procs: true,
        skip_hierarchy: true,
        skip_bindmounts: true,
        skip_ownership: true,
    };
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::FULL
    }
}
