//! Enumeration of bind-mounted namespace references in the caller's own
//! mount namespace.
//!
//! mountinfo tells the type and inode of a bind-mounted namespace, but not
//! the device number, so every mount point gets stat'ed while still inside
//! the mount namespace it belongs to.

use std::path::Path;

use nscope_common::constants::NSFS_TYPE;
use nscope_common::error::Result;
use nscope_common::types::{NamespaceId, NamespaceType, type_and_inode};
use serde::{Deserialize, Serialize};

use crate::mountinfo::{MountEntry, read_mountinfo};
use crate::namespace::{namespace_id, owning_user_namespace};

/// A bind-mounted namespace, as exchanged between a re-executed worker
/// and the discovering process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindmountedNamespace {
    /// Full identity of the namespace.
    pub id: NamespaceId,
    /// Type of the namespace.
    #[serde(rename = "type")]
    pub ns_type: NamespaceType,
    /// Mount point of the bind mount, valid within its mount namespace.
    pub path: String,
    /// Identity of the owning user namespace; always `None` for user
    /// namespaces.
    pub owner_id: Option<NamespaceId>,
}

/// Lists the bind-mounted namespaces found in the mountinfo at
/// `mountinfo`, which must describe the caller's current mount namespace.
///
/// Entries whose identity cannot be determined are left out.
///
/// # Errors
///
/// Returns an error if the mountinfo cannot be read.
pub fn local_bindmounts(mountinfo: impl AsRef<Path>) -> Result<Vec<BindmountedNamespace>> {
    let mounts = read_mountinfo(mountinfo)?;
    let found: Vec<_> = mounts
        .iter()
        .filter(|m| m.fs_type == NSFS_TYPE)
        .filter_map(resolve)
        .collect();
    tracing::debug!(count = found.len(), "bind-mounted namespaces found");
    Ok(found)
}

fn resolve(mount: &MountEntry) -> Option<BindmountedNamespace> {
    let (ns_type, _) = type_and_inode(&mount.root)?;
    let id = match namespace_id(&mount.mount_point) {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(path = %mount.mount_point.display(), error = %e, "skipping bind mount");
            return None;
        }
    };
    let owner_id = if ns_type == NamespaceType::User {
        None
    } else {
        owning_user_namespace(&mount.mount_point)
    };
    Some(BindmountedNamespace {
        id,
        ns_type,
        path: mount.mount_point.to_string_lossy().into_owned(),
        owner_id,
    })
}
