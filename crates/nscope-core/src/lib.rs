//! # nscope-core
//!
//! Low-level Linux primitives for namespace discovery.
//!
//! This crate provides safe abstractions over:
//! - **Namespace filesystem**: identities via `stat(2)`, owner and parent
//!   queries via `ioctl_ns(2)`, and joining via `setns(2)`.
//! - **Proc filesystem**: the process table and per-process namespace links.
//! - **Mountinfo**: bind-mounted namespace references.
//! - **Re-execution**: running work inside other mount and user namespaces.
//!
//! All unsafe system calls are encapsulated in safe wrappers with
//! `// SAFETY:` documentation.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod bindmount;
pub mod mountinfo;
pub mod namespace;
pub mod procfs;
pub mod reexec;
