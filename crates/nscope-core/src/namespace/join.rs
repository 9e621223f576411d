//! Joining existing namespaces via `setns(2)`.

use std::path::PathBuf;

use nscope_common::error::{NscopeError, Result};
use nscope_common::types::{NamespaceId, NamespaceType};
use serde::{Deserialize, Serialize};

/// A namespace to join, given by a filesystem reference and its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTarget {
    /// Reference usable to open the namespace, such as `/proc/42/ns/mnt`.
    pub path: PathBuf,
    /// Expected type of the namespace.
    pub ns_type: NamespaceType,
    /// Identity the reference must still resolve to when opened.
    #[serde(default)]
    pub expected: Option<NamespaceId>,
}

impl JoinTarget {
    /// Creates a join target.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, ns_type: NamespaceType) -> Self {
        Self {
            path: path.into(),
            ns_type,
            expected: None,
        }
    }

    /// Refuses joining unless the reference identifies `id`.
    #[must_use]
    pub fn with_expected(mut self, id: NamespaceId) -> Self {
        self.expected = Some(id);
        self
    }

    fn error(&self, message: impl Into<String>) -> NscopeError {
        NscopeError::Join {
            reference: self.path.display().to_string(),
            message: message.into(),
        }
    }
}

/// Joins the calling process to the given namespaces, in order.
///
/// All references are opened and checked against their expected identity
/// before the first `setns(2)`, as joining a mount namespace changes how
/// later paths resolve. A user namespace must come first when the joined
/// namespaces are owned by it.
///
/// The calling process must be single-threaded for joining user and mount
/// namespaces to succeed.
///
/// # Errors
///
/// Returns [`NscopeError::Join`] if a reference cannot be opened, now
/// identifies another namespace, or `setns(2)` fails.
#[cfg(target_os = "linux")]
pub fn join_namespaces(targets: &[JoinTarget]) -> Result<()> {
    use super::NamespaceFile;

    let files = targets
        .iter()
        .map(|target| {
            let file = NamespaceFile::open(&target.path).map_err(|e| target.error(e.to_string()))?;
            if let Some(expected) = target.expected {
                let actual = file.id().map_err(|e| target.error(e.to_string()))?;
                if actual != expected {
                    return Err(target.error(format!(
                        "reference now identifies {}:[{}], expected {}:[{}]",
                        target.ns_type, actual, target.ns_type, expected
                    )));
                }
            }
            Ok(file)
        })
        .collect::<Result<Vec<_>>>()?;

    for (target, file) in targets.iter().zip(&files) {
        nix::sched::setns(file, clone_flags(target.ns_type))
            .map_err(|e| target.error(e.to_string()))?;
        tracing::debug!(path = %target.path.display(), ns_type = %target.ns_type, "joined namespace");
    }
    Ok(())
}

/// Returns the `setns(2)` flag restricting a join to `ns_type`.
#[cfg(target_os = "linux")]
fn clone_flags(ns_type: NamespaceType) -> nix::sched::CloneFlags {
    use nix::sched::CloneFlags;

    match ns_type {
        NamespaceType::Mount => CloneFlags::CLONE_NEWNS,
        NamespaceType::Cgroup => CloneFlags::CLONE_NEWCGROUP,
        NamespaceType::Uts => CloneFlags::CLONE_NEWUTS,
        NamespaceType::Ipc => CloneFlags::CLONE_NEWIPC,
        NamespaceType::User => CloneFlags::CLONE_NEWUSER,
        NamespaceType::Pid => CloneFlags::CLONE_NEWPID,
        NamespaceType::Net => CloneFlags::CLONE_NEWNET,
    }
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error, joining namespaces requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn join_namespaces(_targets: &[JoinTarget]) -> Result<()> {
    Err(NscopeError::Unsupported {
        message: "joining namespaces requires Linux".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_reference_fails_before_joining() {
        let targets = [JoinTarget::new("/nonexistent/ns/mnt", NamespaceType::Mount)];
        let err = join_namespaces(&targets).unwrap_err();
        assert!(matches!(err, NscopeError::Join { .. } | NscopeError::Unsupported { .. }));
    }

    #[test]
    fn empty_join_set_is_a_no_op() {
        #[cfg(target_os = "linux")]
        assert!(join_namespaces(&[]).is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn reference_to_another_namespace_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mnt");
        std::fs::write(&path, b"").unwrap();
        let targets = [JoinTarget::new(&path, NamespaceType::Mount)
            .with_expected(NamespaceId::new(4, 999_999))];

        let err = join_namespaces(&targets).unwrap_err();
        assert!(matches!(err, NscopeError::Join { .. }), "{err}");
        assert!(err.to_string().contains("expected mnt:[999999]"), "{err}");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn every_type_joins_with_its_own_flag() {
        use nix::sched::CloneFlags;

        assert_eq!(clone_flags(NamespaceType::Mount), CloneFlags::CLONE_NEWNS);
        assert_eq!(clone_flags(NamespaceType::User), CloneFlags::CLONE_NEWUSER);
        let all = NamespaceType::ALL
            .iter()
            .fold(CloneFlags::empty(), |acc, &t| acc | clone_flags(t));
        assert_eq!(all.bits().count_ones(), 7);
    }

    #[test]
    fn join_target_roundtrips_through_json() {
        let target = JoinTarget::new("/proc/1/ns/user", NamespaceType::User)
            .with_expected(NamespaceId::new(4, 4_026_531_837));
        let json = serde_json::to_string(&target).unwrap();
        assert!(json.contains(r#""ns_type":"user""#));
        assert_eq!(serde_json::from_str::<JoinTarget>(&json).unwrap(), target);

        let unchecked: JoinTarget =
            serde_json::from_str(r#"{"path":"/proc/1/ns/mnt","ns_type":"mnt"}"#).unwrap();
        assert_eq!(unchecked.expected, None);
    }
}
