//! Thin libc wrappers used by the kernel interface.
//!
//! Mirrors the style of a syscall shim: each function is a direct,
//! single-syscall wrapper returning [`std::io::Result`], translating `-1`
//! into `Error::last_os_error()`. Kept separate from [`crate::kernel`] so
//! that module can stay about *which* file gets which operation, not
//! about how the operation is issued.

use std::fs::File;
use std::io::{Error, Result};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};

/// Opens `path` read-write, non-blocking would defeat the blocking
/// `state` write's contract, so this is a plain blocking open.
pub fn open_rw(path: &str) -> Result<File> {
    let c_path = std::ffi::CString::new(path).map_err(Error::other)?;
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_CLOEXEC | libc::O_RDWR) };
    if fd != -1 {
        Ok(unsafe { File::from_raw_fd(fd) })
    } else {
        Err(Error::last_os_error())
    }
}

/// Opens `path` read-only.
pub fn open_ro(path: &str) -> Result<File> {
    let c_path = std::ffi::CString::new(path).map_err(Error::other)?;
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_CLOEXEC | libc::O_RDONLY) };
    if fd != -1 {
        Ok(unsafe { File::from_raw_fd(fd) })
    } else {
        Err(Error::last_os_error())
    }
}

/// Creates a pair of connected pipes: `(read_end, write_end)`. Used to
/// substitute for `WakeupCount`/`State` when the real sysfs files
/// cannot be opened, and as a controllable test fixture for the suspend
/// loop.
pub fn pipe() -> Result<(File, File)> {
    let mut fds: [RawFd; 2] = [0; 2];
    let result = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if result != -1 {
        Ok(unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) })
    } else {
        Err(Error::last_os_error())
    }
}

/// Seeks `file` to the start. `WakeupCount`'s read must bracket every
/// iteration with a seek-to-zero: the read encodes a snapshot the
/// following write-back commits, so the two must bracket every
/// iteration.
pub fn seek_start(file: &File) -> Result<()> {
    let result = unsafe { libc::lseek(file.as_raw_fd(), 0, libc::SEEK_SET) };
    if result != -1 {
        Ok(())
    } else {
        Err(Error::last_os_error())
    }
}

/// Reads whatever is available in a single syscall and returns it as a
/// `String`. Assumes
/// the sysfs file content fits in one read and never blocks forever on
/// a socket/pipe fixture.
pub fn read_once(file: &File) -> Result<String> {
    let mut buf = [0u8; 4096];
    let fd = file.as_raw_fd();
    let n = unsafe { libc::read(fd, buf.as_mut_ptr() as _, buf.len()) };
    if n < 0 {
        return Err(Error::last_os_error());
    }
    Ok(String::from_utf8_lossy(&buf[..n as usize]).into_owned())
}

/// Writes `data` to `file` in a single syscall and returns whether every
/// byte was accepted.
pub fn write_all_or_false(file: &File, data: &str) -> bool {
    let fd = file.as_raw_fd();
    let bytes = data.as_bytes();
    let n = unsafe { libc::write(fd, bytes.as_ptr() as _, bytes.len()) };
    n == bytes.len() as isize
}
