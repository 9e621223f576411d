//! Namespace-filesystem `ioctl(2)` requests.
//!
//! See `ioctl_ns(2)`: `NS_GET_USERNS`, `NS_GET_PARENT` and
//! `NS_GET_OWNER_UID` all live under the nsfs ioctl type `0xb7`.

use std::fs::File;
use std::io;

#[cfg(target_os = "linux")]
mod nsfs {
    const NSIO: u8 = 0xb7;

    nix::ioctl_none!(ns_get_userns, NSIO, 0x1);
    nix::ioctl_none!(ns_get_parent, NSIO, 0x2);
    nix::ioctl_read_bad!(
        ns_get_owner_uid,
        nix::request_code_none!(NSIO, 0x4),
        libc::uid_t
    );
}

#[cfg(target_os = "linux")]
pub(super) fn user_namespace(file: &File) -> io::Result<File> {
    use std::os::fd::AsRawFd;

    // SAFETY: the descriptor stays open for the lifetime of `file` and
    // NS_GET_USERNS takes no argument.
    let fd = unsafe { nsfs::ns_get_userns(file.as_raw_fd()) }?;
    Ok(adopt(fd))
}

#[cfg(target_os = "linux")]
pub(super) fn parent_namespace(file: &File) -> io::Result<File> {
    use std::os::fd::AsRawFd;

    // SAFETY: the descriptor stays open for the lifetime of `file` and
    // NS_GET_PARENT takes no argument.
    let fd = unsafe { nsfs::ns_get_parent(file.as_raw_fd()) }?;
    Ok(adopt(fd))
}

#[cfg(target_os = "linux")]
pub(super) fn owner_uid(file: &File) -> io::Result<u32> {
    use std::os::fd::AsRawFd;

    let mut uid: libc::uid_t = 0;
    // SAFETY: the descriptor stays open for the lifetime of `file` and the
    // kernel writes exactly one uid_t into `uid`.
    let _ = unsafe { nsfs::ns_get_owner_uid(file.as_raw_fd(), &mut uid) }?;
    Ok(uid)
}

/// Takes ownership of a descriptor freshly returned by the kernel.
#[cfg(target_os = "linux")]
fn adopt(fd: libc::c_int) -> File {
    use std::os::fd::{FromRawFd, OwnedFd};

    // SAFETY: nsfs ioctls returning descriptors hand out a new, open
    // descriptor that nobody else owns.
    File::from(unsafe { OwnedFd::from_raw_fd(fd) })
}

#[cfg(not(target_os = "linux"))]
pub(super) fn user_namespace(_file: &File) -> io::Result<File> {
    Err(unsupported())
}

#[cfg(not(target_os = "linux"))]
pub(super) fn parent_namespace(_file: &File) -> io::Result<File> {
    Err(unsupported())
}

#[cfg(not(target_os = "linux"))]
pub(super) fn owner_uid(_file: &File) -> io::Result<u32> {
    Err(unsupported())
}

#[cfg(not(target_os = "linux"))]
fn unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "nsfs requires Linux")
}
