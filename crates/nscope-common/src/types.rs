//! Namespace identity and type system.
//!
//! A namespace is identified by the device and inode numbers of its
//! namespace-filesystem entry. The textual form used by the kernel in
//! `/proc/<pid>/ns/*` links, `"<type>:[<inode>]"`, only carries the inode
//! number; turning it into an identity needs the device of the namespace
//! filesystem from elsewhere.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Process identifier as seen from some PID namespace.
pub type Pid = u32;

/// The seven kinds of Linux namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceType {
    /// Mount namespace (`CLONE_NEWNS`).
    #[serde(rename = "mnt")]
    Mount,
    /// Control group namespace (`CLONE_NEWCGROUP`).
    Cgroup,
    /// Hostname and NIS domain namespace (`CLONE_NEWUTS`).
    Uts,
    /// System V IPC and POSIX message queue namespace (`CLONE_NEWIPC`).
    Ipc,
    /// User namespace (`CLONE_NEWUSER`).
    User,
    /// PID namespace (`CLONE_NEWPID`).
    Pid,
    /// Network namespace (`CLONE_NEWNET`).
    Net,
}

impl NamespaceType {
    /// Number of namespace types.
    pub const COUNT: usize = 7;

    /// All namespace types, in discovery order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Mount,
        Self::Cgroup,
        Self::Uts,
        Self::Ipc,
        Self::User,
        Self::Pid,
        Self::Net,
    ];

    /// Returns the short name used in the proc filesystem, such as `"mnt"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mount => "mnt",
            Self::Cgroup => "cgroup",
            Self::Uts => "uts",
            Self::Ipc => "ipc",
            Self::User => "user",
            Self::Pid => "pid",
            Self::Net => "net",
        }
    }

    /// Looks up a namespace type by its short name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Position of this type within [`NamespaceType::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether namespaces of this type form a parent/child hierarchy.
    #[must_use]
    pub const fn is_hierarchical(self) -> bool {
        matches!(self, Self::Pid | Self::User)
    }
}

impl fmt::Display for NamespaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a namespace: device and inode number of its nsfs entry.
///
/// The inode number alone is not unique, as several namespace filesystem
/// instances may hand out the same inode numbers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NamespaceId {
    /// Device number of the namespace filesystem.
    pub dev: u64,
    /// Inode number of the namespace.
    pub ino: u64,
}

impl NamespaceId {
    /// The "no namespace" identity.
    pub const NONE: Self = Self { dev: 0, ino: 0 };

    /// Creates an identity from its device and inode numbers.
    #[must_use]
    pub const fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }

    /// Whether this is the "no namespace" identity.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.ino == 0
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ino)
    }
}

/// Parses the textual form `"<type>:[<inode>]"` of a namespace, taking
/// the device number of its namespace filesystem from `dev`.
///
/// Malformed text, unknown type names, and inode numbers that are not
/// positive yield `(NamespaceId::NONE, None)`.
#[must_use]
pub fn id_with_type(text: &str, dev: u64) -> (NamespaceId, Option<NamespaceType>) {
    type_and_inode(text).map_or((NamespaceId::NONE, None), |(t, ino)| {
        (NamespaceId::new(dev, ino), Some(t))
    })
}

/// Splits `"<type>:[<inode>]"` into type and inode number.
#[must_use]
pub fn type_and_inode(text: &str) -> Option<(NamespaceType, u64)> {
    let (name, rest) = text.split_once(":[")?;
    let ino = inode(rest.strip_suffix(']')?)?;
    Some((NamespaceType::from_name(name)?, ino))
}

/// Parses a bare, positive inode number; signs and whitespace are rejected.
#[must_use]
pub fn inode(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok().filter(|&ino| ino > 0)
}

/// Formats a namespace identity in the textual form `"<type>:[<inode>]"`.
#[must_use]
pub fn format_id(id: NamespaceId, ns_type: NamespaceType) -> String {
    format!("{}:[{}]", ns_type.name(), id.ino)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_text() {
        let (id, t) = id_with_type("net:[1]", 4);
        assert_eq!(t, Some(NamespaceType::Net));
        assert_eq!(id, NamespaceId::new(4, 1));
    }

    #[test]
    fn rejects_unknown_type() {
        assert_eq!(id_with_type("foo:[1]", 4), (NamespaceId::NONE, None));
    }

    #[test]
    fn rejects_non_positive_inode() {
        assert_eq!(id_with_type("net:[-1]", 4), (NamespaceId::NONE, None));
        assert_eq!(id_with_type("net:[0]", 4), (NamespaceId::NONE, None));
        assert_eq!(id_with_type("net:[+5]", 4), (NamespaceId::NONE, None));
    }

    #[test]
    fn rejects_malformed_text() {
        for text in ["", "net", "net:[", "net:[]", "net:[12", "net:12]", "net:[1]x", "[1]"] {
            assert_eq!(id_with_type(text, 4), (NamespaceId::NONE, None), "{text}");
            assert_eq!(type_and_inode(text), None, "{text}");
        }
    }

    #[test]
    fn format_inverts_parse() {
        for text in [
            "mnt:[4026531840]",
            "cgroup:[4026531835]",
            "uts:[4026531838]",
            "ipc:[4026531839]",
            "user:[4026531837]",
            "pid:[4026531836]",
            "net:[1]",
        ] {
            let (id, t) = id_with_type(text, 4);
            assert_eq!(format_id(id, t.expect(text)), text);
        }
    }

    #[test]
    fn bare_inodes_must_be_positive_digits() {
        assert_eq!(inode("4026531836"), Some(4_026_531_836));
        for text in ["", "0", "-1", "+1", " 1", "1]", "pid:[1]"] {
            assert_eq!(inode(text), None, "{text}");
        }
    }

    #[test]
    fn short_names_map_both_ways() {
        for t in NamespaceType::ALL {
            assert_eq!(NamespaceType::from_name(t.name()), Some(t));
        }
        assert_eq!(NamespaceType::from_name("time"), None);
    }

    #[test]
    fn index_matches_position() {
        for (idx, t) in NamespaceType::ALL.into_iter().enumerate() {
            assert_eq!(t.index(), idx);
        }
    }

    #[test]
    fn type_serializes_as_short_name() {
        assert_eq!(serde_json::to_string(&NamespaceType::Mount).unwrap(), r#""mnt""#);
        assert_eq!(serde_json::to_string(&NamespaceType::Cgroup).unwrap(), r#""cgroup""#);
    }
}
