//! Namespace-filesystem (nsfs) operations.
//!
//! Provides safe wrappers around `stat(2)` on namespace references, the
//! nsfs `ioctl(2)` queries for owning user namespace and parent namespace,
//! and `setns(2)` for joining namespaces.

mod ioctl;
pub mod join;

use std::fs::File;
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use nscope_common::error::{NscopeError, Result};
use nscope_common::types::NamespaceId;

/// Returns the identity of the namespace referenced by `path`.
///
/// Works for `/proc/<pid>/ns/*` links as well as for bind-mounted
/// namespace references; symbolic links are followed.
///
/// # Errors
///
/// Returns [`NscopeError::PermissionDenied`] if the caller lacks ptrace
/// access to the process, or an I/O error if `stat(2)` fails otherwise,
/// most commonly because the process vanished.
pub fn namespace_id(path: impl AsRef<Path>) -> Result<NamespaceId> {
    let path = path.as_ref();
    let md = std::fs::metadata(path).map_err(|e| NscopeError::access(path, e))?;
    Ok(NamespaceId::new(md.dev(), md.ino()))
}

/// Returns the identity of the user namespace owning the namespace
/// referenced by `path`, or `None` if it cannot be determined.
pub fn owning_user_namespace(path: impl AsRef<Path>) -> Option<NamespaceId> {
    let owner = NamespaceFile::open(path).and_then(|ns| ns.user()).and_then(|u| u.id());
    match owner {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::trace!(error = %e, "owning user namespace not available");
            None
        }
    }
}

/// An open file descriptor referencing a namespace.
#[derive(Debug)]
pub struct NamespaceFile {
    file: File,
    path: PathBuf,
}

impl NamespaceFile {
    /// Opens the namespace reference at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference cannot be opened;
    /// [`NscopeError::PermissionDenied`] if access was refused.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| NscopeError::access(path, e))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Returns the identity of the referenced namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if `fstat(2)` fails.
    pub fn id(&self) -> Result<NamespaceId> {
        let md = self
            .file
            .metadata()
            .map_err(|e| NscopeError::io(&self.path, e))?;
        Ok(NamespaceId::new(md.dev(), md.ino()))
    }

    /// Returns the path this reference was opened from, or derived from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the user namespace owning this namespace. For a user
    /// namespace, this is its parent user namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner lies outside the caller's visibility
    /// or the kernel does not support the query.
    pub fn user(&self) -> Result<Self> {
        let file = ioctl::user_namespace(&self.file).map_err(|e| NscopeError::io(&self.path, e))?;
        Ok(self.derived(file, "user"))
    }

    /// Returns the parent namespace of a PID or user namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if this is a root namespace as far as the caller
    /// can see, or the namespace type has no hierarchy.
    pub fn parent(&self) -> Result<Self> {
        let file =
            ioctl::parent_namespace(&self.file).map_err(|e| NscopeError::io(&self.path, e))?;
        Ok(self.derived(file, "parent"))
    }

    /// Returns the UID of the creator of a user namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if this is not a user namespace.
    pub fn owner_uid(&self) -> Result<u32> {
        ioctl::owner_uid(&self.file).map_err(|e| NscopeError::io(&self.path, e))
    }

    fn derived(&self, file: File, relation: &str) -> Self {
        let mut path = self.path.clone().into_os_string();
        path.push("#");
        path.push(relation);
        Self {
            file,
            path: path.into(),
        }
    }
}

impl AsFd for NamespaceFile {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}
