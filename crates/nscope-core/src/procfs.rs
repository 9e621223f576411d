//! Reading the process table from the proc filesystem.
//!
//! Processes may vanish at any time while being read, and the namespace
//! links of processes belonging to other users are only readable with
//! ptrace access; both surface as errors for the single process affected.

use std::path::{Path, PathBuf};

use nscope_common::constants::PROC_ROOT;
use nscope_common::error::{NscopeError, Result};
use nscope_common::types::{NamespaceId, NamespaceType, Pid};

/// Details of a single process, as read from `/proc/<pid>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcEntry {
    /// PID as seen from the PID namespace of the proc filesystem.
    pub pid: Pid,
    /// Parent PID, 0 for processes without a visible parent.
    pub ppid: Pid,
    /// Command name from `stat`.
    pub name: String,
    /// Command line arguments.
    pub cmdline: Vec<String>,
    /// The `NSpid` list from `status`: the PID in each PID namespace from
    /// that of the proc filesystem down to the process' own one.
    pub nspids: Vec<Pid>,
}

/// Handle to a mounted proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    /// Creates a handle for the proc filesystem mounted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the mount point of this proc filesystem.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists the PIDs of all processes.
    ///
    /// # Errors
    ///
    /// Returns an error if the proc root cannot be listed.
    pub fn pids(&self) -> Result<Vec<Pid>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| NscopeError::io(&self.root, e))?;
        let mut pids: Vec<Pid> = entries
            .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse().ok())
            .collect();
        pids.sort_unstable();
        Ok(pids)
    }

    /// Reads the details of process `pid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process vanished or its `stat` is malformed.
    pub fn process(&self, pid: Pid) -> Result<ProcEntry> {
        let dir = self.root.join(pid.to_string());
        let stat_path = dir.join("stat");
        let stat = std::fs::read_to_string(&stat_path).map_err(|e| NscopeError::io(&stat_path, e))?;
        let (name, ppid) = parse_stat(&stat).ok_or_else(|| {
            NscopeError::io(
                &stat_path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed stat"),
            )
        })?;
        let nspids = std::fs::read_to_string(dir.join("status"))
            .map(|status| parse_nspids(&status))
            .unwrap_or_default();
        let cmdline = std::fs::read(dir.join("cmdline"))
            .map(|raw| parse_cmdline(&raw))
            .unwrap_or_default();
        Ok(ProcEntry {
            pid,
            ppid,
            name,
            cmdline,
            nspids,
        })
    }

    /// Returns the path of the namespace link of type `ns_type` of `pid`.
    #[must_use]
    pub fn namespace_path(&self, pid: Pid, ns_type: NamespaceType) -> PathBuf {
        self.root.join(pid.to_string()).join("ns").join(ns_type.name())
    }

    /// Returns the identity of the namespace of type `ns_type` that `pid`
    /// is a member of.
    ///
    /// # Errors
    ///
    /// Returns an error if the process vanished or the caller lacks
    /// ptrace access to it.
    pub fn namespace_id(&self, pid: Pid, ns_type: NamespaceType) -> Result<NamespaceId> {
        crate::namespace::namespace_id(self.namespace_path(pid, ns_type))
    }

    /// Returns the path of the calling process' own namespace link.
    #[must_use]
    pub fn own_namespace_path(&self, ns_type: NamespaceType) -> PathBuf {
        self.root.join("self").join("ns").join(ns_type.name())
    }

    /// Returns the identity of the calling process' own namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be stat'ed.
    pub fn own_namespace_id(&self, ns_type: NamespaceType) -> Result<NamespaceId> {
        crate::namespace::namespace_id(self.own_namespace_path(ns_type))
    }

    /// Returns the path of the calling process' mountinfo.
    #[must_use]
    pub fn own_mountinfo_path(&self) -> PathBuf {
        self.root.join("self").join("mountinfo")
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(PROC_ROOT)
    }
}

/// Extracts command name and parent PID from the contents of `stat`.
///
/// The name is enclosed in parentheses and may itself contain spaces and
/// parentheses, so it extends up to the last closing parenthesis.
fn parse_stat(stat: &str) -> Option<(String, Pid)> {
    let open = stat.find('(')?;
    let close = stat.rfind(')')?;
    let name = stat.get(open + 1..close)?.to_owned();
    let mut fields = stat.get(close + 1..)?.split_ascii_whitespace();
    let _state = fields.next()?;
    let ppid = fields.next()?.parse().ok()?;
    Some((name, ppid))
}

fn parse_nspids(status: &str) -> Vec<Pid> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("NSpid:"))
        .map(|pids| {
            pids.split_ascii_whitespace()
                .map_while(|pid| pid.parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

fn parse_cmdline(raw: &[u8]) -> Vec<String> {
    raw.split(|&b| b == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_process(root: &Path, pid: Pid, stat: &str, status: &str) {
        let dir = root.join(pid.to_string());
        std::fs::create_dir_all(dir.join("ns")).unwrap();
        std::fs::write(dir.join("stat"), stat).unwrap();
        std::fs::write(dir.join("status"), status).unwrap();
        std::fs::write(dir.join("cmdline"), b"/bin/sh\0-c\0sleep 1\0").unwrap();
    }

    #[test]
    fn parses_stat_with_awkward_names() {
        let stat = "4242 (we (ird) name) S 17 4242 4242 0 -1 4194560";
        assert_eq!(parse_stat(stat), Some(("we (ird) name".into(), 17)));
        assert_eq!(parse_stat("4242 no-parens S 1"), None);
    }

    #[test]
    fn parses_nspid_lines() {
        let status = "Name:\tsleep\nNSpid:\t4242\t17\t7\nNSsid:\t1\n";
        assert_eq!(parse_nspids(status), vec![4242, 17, 7]);
        assert!(parse_nspids("Name:\tsleep\n").is_empty());
    }

    #[test]
    fn reads_processes_from_fake_proc() {
        let dir = tempfile::tempdir().unwrap();
        fake_process(dir.path(), 1, "1 (init) S 0 1 1", "NSpid:\t1\n");
        fake_process(dir.path(), 42, "42 (sh) S 1 42 42", "NSpid:\t42\t3\n");
        std::fs::create_dir(dir.path().join("sys")).unwrap();

        let procfs = ProcFs::new(dir.path());
        assert_eq!(procfs.pids().unwrap(), vec![1, 42]);

        let entry = procfs.process(42).unwrap();
        assert_eq!(entry.name, "sh");
        assert_eq!(entry.ppid, 1);
        assert_eq!(entry.nspids, vec![42, 3]);
        assert_eq!(entry.cmdline, vec!["/bin/sh", "-c", "sleep 1"]);
    }

    #[test]
    fn vanished_process_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let procfs = ProcFs::new(dir.path());
        assert!(procfs.process(99).is_err());
        assert!(procfs.namespace_id(99, NamespaceType::Net).is_err());
    }

    #[test]
    fn malformed_stat_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        fake_process(dir.path(), 7, "7 no-parens S 1", "");
        let err = ProcFs::new(dir.path()).process(7).unwrap_err();
        assert!(
            matches!(&err, NscopeError::Io { source, .. } if source.kind() == std::io::ErrorKind::InvalidData),
            "{err}"
        );
        assert!(err.to_string().contains("7/stat"), "{err}");
    }

    #[test]
    fn namespace_paths_follow_proc_layout() {
        let procfs = ProcFs::default();
        assert_eq!(
            procfs.namespace_path(7, NamespaceType::Mount),
            PathBuf::from("/proc/7/ns/mnt")
        );
        assert_eq!(
            procfs.own_namespace_path(NamespaceType::User),
            PathBuf::from("/proc/self/ns/user")
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn reads_own_process() {
        let procfs = ProcFs::default();
        let me = procfs.process(std::process::id()).unwrap();
        assert!(!me.name.is_empty());
        assert!(procfs.own_namespace_id(NamespaceType::Pid).is_ok());
    }
}
