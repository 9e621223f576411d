//! # nscope-discovery
//!
//! Discovers the Linux namespaces of a system and how they relate.
//!
//! Provides four main entry points:
//! - [`discover`](discover::discover): Runs a discovery with the host
//!   defaults and returns a read-only [`DiscoveryResult`].
//! - [`Discoverer`](discover::Discoverer): Runs discoveries against an
//!   injected proc root and bind-mount source.
//! - [`DiscoveryResult`](result::DiscoveryResult): Namespaces and processes
//!   found, including the PID and user namespace hierarchies and the
//!   owning user namespaces.
//! - [`PidMap`](pidmap::PidMap): Translates PIDs between PID namespaces.
//!
//! Namespaces in other mount namespaces are found by re-executing the
//! current binary, so binaries using this crate must call
//! [`nscope_core::reexec::handle_reexec`] first thing in `main`.
//!
//! # Example
//!
//! ```rust,no_run
//! use nscope_discovery::{DiscoveryOptions, PidMap, discover};
//! use nscope_common::types::NamespaceType;
//!
//! nscope_core::reexec::handle_reexec();
//! let result = discover(DiscoveryOptions::FULL);
//! let pidmap = PidMap::new(&result);
//! for netns in result.namespaces(NamespaceType::Net).values() {
//!     println!("{netns}: {} processes", netns.members().len());
//! }
//! # let _ = pidmap;
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod bindmount;
pub mod discover;
mod hierarchy;
pub mod namespace;
mod owners;
pub mod pidmap;
pub mod process;
mod procs;
pub mod result;

pub use bindmount::{BindmountSource, HostBindmounts};
pub use discover::{Discoverer, discover};
pub use namespace::Namespace;
pub use nscope_common::config::DiscoveryOptions;
pub use pidmap::{NamespacedPid, PidMap};
pub use process::Process;
pub use result::{DiscoveryResult, NamespaceMap};
