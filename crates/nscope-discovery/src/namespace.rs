//! Discovered namespaces.

use std::collections::BTreeSet;

use nscope_common::types::{NamespaceId, NamespaceType, Pid, format_id};
use serde::Serialize;

/// A discovered namespace.
///
/// Relations to other namespaces and to processes are stored as
/// identities and resolved through the owning
/// [`DiscoveryResult`](crate::DiscoveryResult). Only discovery itself
/// configures a namespace; afterwards it is read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Namespace {
    id: NamespaceId,
    #[serde(rename = "type")]
    ns_type: NamespaceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
    owner_id: Option<NamespaceId>,
    owner: Option<NamespaceId>,
    owner_uid: Option<u32>,
    parent: Option<NamespaceId>,
    children: BTreeSet<NamespaceId>,
    members: BTreeSet<Pid>,
    owned: BTreeSet<(NamespaceType, NamespaceId)>,
}

impl Namespace {
    pub(crate) const fn new(ns_type: NamespaceType, id: NamespaceId) -> Self {
        Self {
            id,
            ns_type,
            reference: None,
            owner_id: None,
            owner: None,
            owner_uid: None,
            parent: None,
            children: BTreeSet::new(),
            members: BTreeSet::new(),
            owned: BTreeSet::new(),
        }
    }

    /// Identity of this namespace.
    pub const fn id(&self) -> NamespaceId {
        self.id
    }

    /// Type of this namespace.
    pub const fn ns_type(&self) -> NamespaceType {
        self.ns_type
    }

    /// Filesystem path usable to re-enter this namespace, if any. Hidden
    /// namespaces found only while walking a hierarchy have none.
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Identity of the owning user namespace as recorded during discovery,
    /// whether or not that user namespace was itself discovered.
    pub const fn owner_id(&self) -> Option<NamespaceId> {
        self.owner_id
    }

    /// Identity of the owning user namespace, once resolved to a
    /// discovered user namespace.
    pub const fn owner(&self) -> Option<NamespaceId> {
        self.owner
    }

    /// UID of the creator of a user namespace.
    pub const fn owner_uid(&self) -> Option<u32> {
        self.owner_uid
    }

    /// Parent namespace of a PID or user namespace.
    pub const fn parent(&self) -> Option<NamespaceId> {
        self.parent
    }

    /// Child namespaces of a PID or user namespace.
    pub const fn children(&self) -> &BTreeSet<NamespaceId> {
        &self.children
    }

    /// PIDs of the processes that are members of this namespace.
    pub const fn members(&self) -> &BTreeSet<Pid> {
        &self.members
    }

    /// Namespaces owned by a user namespace.
    pub const fn owned(&self) -> &BTreeSet<(NamespaceType, NamespaceId)> {
        &self.owned
    }

    pub(crate) fn set_reference(&mut self, reference: impl Into<String>) {
        self.reference = Some(reference.into());
    }

    pub(crate) fn set_owner_id(&mut self, owner_id: NamespaceId) {
        if self.ns_type != NamespaceType::User && !owner_id.is_none() {
            self.owner_id = Some(owner_id);
        }
    }

    pub(crate) fn set_owner(&mut self, owner: NamespaceId) {
        if owner != self.id {
            self.owner = Some(owner);
        }
    }

    pub(crate) const fn set_owner_uid(&mut self, uid: u32) {
        self.owner_uid = Some(uid);
    }

    pub(crate) const fn set_parent(&mut self, parent: NamespaceId) {
        self.parent = Some(parent);
    }

    pub(crate) fn add_child(&mut self, child: NamespaceId) {
        let _ = self.children.insert(child);
    }

    pub(crate) fn add_member(&mut self, pid: Pid) {
        let _ = self.members.insert(pid);
    }

    pub(crate) fn add_owned(&mut self, ns_type: NamespaceType, id: NamespaceId) {
        let _ = self.owned.insert((ns_type, id));
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_id(self.id, self.ns_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_namespaces_never_record_an_owner_id() {
        let mut userns = Namespace::new(NamespaceType::User, NamespaceId::new(4, 1));
        userns.set_owner_id(NamespaceId::new(4, 2));
        assert_eq!(userns.owner_id(), None);
    }

    #[test]
    fn namespace_cannot_own_itself() {
        let id = NamespaceId::new(4, 1);
        let mut ns = Namespace::new(NamespaceType::User, id);
        ns.set_owner(id);
        assert_eq!(ns.owner(), None);
    }

    #[test]
    fn none_owner_id_is_ignored() {
        let mut netns = Namespace::new(NamespaceType::Net, NamespaceId::new(4, 1));
        netns.set_owner_id(NamespaceId::NONE);
        assert_eq!(netns.owner_id(), None);
    }

    #[test]
    fn displays_textual_identifier() {
        let ns = Namespace::new(NamespaceType::Net, NamespaceId::new(4, 123));
        assert_eq!(ns.to_string(), "net:[123]");
    }
}
