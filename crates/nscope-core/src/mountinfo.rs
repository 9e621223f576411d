//! Parsing of `/proc/<pid>/mountinfo`.
//!
//! Each line reads
//! `id parent major:minor root mount-point options [optional...] - fstype source super-options`,
//! with whitespace, backslashes and newlines in paths escaped as octal.

use std::path::{Path, PathBuf};

use nscope_common::error::{NscopeError, Result};

/// A single mount as described by mountinfo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Mount ID.
    pub mount_id: u32,
    /// ID of the parent mount.
    pub parent_id: u32,
    /// Root of the mount within its filesystem. For nsfs mounts this is
    /// the textual namespace identifier, such as `net:[4026532008]`.
    pub root: String,
    /// Mount point relative to the process root.
    pub mount_point: PathBuf,
    /// Filesystem type.
    pub fs_type: String,
}

/// Reads and parses the mountinfo file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_mountinfo(path: impl AsRef<Path>) -> Result<Vec<MountEntry>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| NscopeError::io(path, e))?;
    Ok(parse_mountinfo(&text))
}

/// Parses mountinfo text, skipping malformed lines.
#[must_use]
pub fn parse_mountinfo(text: &str) -> Vec<MountEntry> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<MountEntry> {
    let (head, tail) = line.split_once(" - ")?;
    let mut fields = head.split_ascii_whitespace();
    let mount_id = fields.next()?.parse().ok()?;
    let parent_id = fields.next()?.parse().ok()?;
    let _majmin = fields.next()?;
    let root = unescape(fields.next()?);
    let mount_point = PathBuf::from(unescape(fields.next()?));
    let fs_type = tail.split_ascii_whitespace().next()?.to_owned();
    Some(MountEntry {
        mount_id,
        parent_id,
        root,
        mount_point,
        fs_type,
    })
}

/// Undoes the kernel's `\ooo` octal escaping.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'\\' {
            if let Some(byte) = bytes.get(idx + 1..idx + 4).and_then(octal) {
                out.push(byte);
                idx += 4;
                continue;
            }
        }
        out.push(bytes[idx]);
        idx += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn octal(digits: &[u8]) -> Option<u8> {
    digits.iter().try_fold(0u8, |acc, &d| {
        if (b'0'..=b'7').contains(&d) {
            acc.checked_mul(8)?.checked_add(d - b'0')
        } else {
            None
        }
    })
}
