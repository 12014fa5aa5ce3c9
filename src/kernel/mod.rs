//! Kernel interface (component A).
//!
//! Encapsulates the seven filesystem endpoints that drive suspend.
//! Referenced by logical identifier, never by path, outside this module.
//!
//! If `WakeupCount` or `State` fail to open (most commonly: the platform
//! doesn't let this process own suspend, or it's not running on a Linux
//! kernel with `CONFIG_SUSPEND`), this module substitutes a pair of
//! connected pipes, so the suspend loop still runs; it just blocks
//! forever on the `State` write, which is exactly what "never suspend"
//! should look like to the rest of the controller. This fallback is a
//! required behavior, not a best-effort fallback: a platform that
//! doesn't own suspend must still serve wake-lock accounting.

mod paths;

use std::fs::File;
use std::io::{Error, ErrorKind, Result};

use crate::sys;

pub use paths::*;

/// Handles to the kernel endpoints needed to drive the suspend protocol.
///
/// Opened once at startup and held for the lifetime of the process; the
/// suspend loop is the sole writer of `State` and `WakeupCount`, so
/// there is no contention to arbitrate here.
pub struct KernelInterface {
    wakeup_count: File,
    state: File,
    wake_lock: Option<File>,
    wake_unlock: Option<File>,
    // Kept alive only to hold the *other* end of a fallback pipe open;
    // never read from or written to. See `open()`.
    _fallback_keepalive: Option<(File, File)>,
}

impl KernelInterface {
    /// Opens the real sysfs endpoints, falling back to an in-process
    /// pipe pair for `WakeupCount`/`State` if either fails to open.
    ///
    /// The fallback holds the read end of a pipe as `wakeup_count` and
    /// the write end of a second pipe as `state`, with nothing ever
    /// reading or writing the other ends. A read on an empty pipe with
    /// its write end still open blocks forever, and a write to a pipe
    /// nobody drains blocks once the kernel buffer fills, so the
    /// suspend loop blocks indefinitely without ever touching a real
    /// kernel.
    pub fn open() -> Self {
        match (sys::open_rw(WAKEUP_COUNT), sys::open_rw(STATE)) {
            (Ok(wakeup_count), Ok(state)) => Self {
                wakeup_count,
                state,
                wake_lock: None,
                wake_unlock: None,
                _fallback_keepalive: None,
            },
            (wc, st) => {
                if let Err(e) = &wc {
                    log::warn!("failed to open {WAKEUP_COUNT}: {e}, substituting a pipe");
                }
                if let Err(e) = &st {
                    log::warn!("failed to open {STATE}: {e}, substituting a pipe");
                }
                let (wakeup_count, keep_w1) =
                    sys::pipe().expect("failed to create fallback pipe");
                let (keep_r2, state) = sys::pipe().expect("failed to create fallback pipe");
                Self {
                    wakeup_count,
                    state,
                    wake_lock: None,
                    wake_unlock: None,
                    _fallback_keepalive: Some((keep_w1, keep_r2)),
                }
            }
        }
    }

    /// Builds a `KernelInterface` from arbitrary file handles, bypassing
    /// the sysfs paths entirely. Used by tests to hand the suspend loop
    /// controllable file handles directly.
    pub fn from_files(wakeup_count: File, state: File) -> Self {
        Self {
            wakeup_count,
            state,
            wake_lock: None,
            wake_unlock: None,
            _fallback_keepalive: None,
        }
    }

    /// Opens the kernel-passthrough wake_lock/wake_unlock files. Only
    /// meaningful in [`crate::arbiter::Mode::KernelPassthrough`].
    pub fn open_passthrough(&mut self) -> Result<()> {
        self.wake_lock = Some(sys::open_rw(WAKE_LOCK)?);
        self.wake_unlock = Some(sys::open_rw(WAKE_UNLOCK)?);
        Ok(())
    }

    /// Seeks to the start and reads `WakeupCount` in one syscall. The
    /// read is not idempotent in meaning: it encodes a snapshot that the
    /// subsequent write-back commits, so the seek-to-zero + read pair
    /// must bracket every iteration.
    pub fn read_wakeup_count(&self) -> Result<String> {
        // A pipe (the fallback substitute) is not seekable; ESPIPE there
        // is expected, not a failure worth restarting the iteration over.
        match sys::seek_start(&self.wakeup_count) {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == Some(libc::ESPIPE) => {}
            Err(e) => return Err(e),
        }
        let s = sys::read_once(&self.wakeup_count)?;
        if s.is_empty() {
            return Err(Error::new(ErrorKind::UnexpectedEof, "empty wakeup_count"));
        }
        Ok(s)
    }

    /// Writes the previously-read wakeup count back, arming the kernel
    /// for the next suspend attempt. Returns `false` if the kernel
    /// rejected the write (a wakeup raced the read).
    pub fn arm(&self, wakeup_count: &str) -> bool {
        sys::write_all_or_false(&self.wakeup_count, wakeup_count)
    }

    /// Writes `"mem"` to `State`, blocking until the kernel resumes
    /// Blocks until the kernel resumes. Returns whether the write was
    /// accepted.
    pub fn commit(&self) -> bool {
        sys::write_all_or_false(&self.state, "mem")
    }

    /// Writes `name` to the kernel's `wake_lock` file
    /// (kernel-passthrough mode).
    pub fn kernel_wake_lock(&self, name: &str) -> Result<()> {
        match &self.wake_lock {
            Some(f) if sys::write_all_or_false(f, name) => Ok(()),
            Some(_) => Err(Error::other("short write to wake_lock")),
            None => Err(Error::other("wake_lock file not open")),
        }
    }

    /// Writes `name` to the kernel's `wake_unlock` file.
    pub fn kernel_wake_unlock(&self, name: &str) -> Result<()> {
        match &self.wake_unlock {
            Some(f) if sys::write_all_or_false(f, name) => Ok(()),
            Some(_) => Err(Error::other("short write to wake_unlock")),
            None => Err(Error::other("wake_unlock file not open")),
        }
    }

    /// Reads `KernelWakeupReasons`: newline-separated reason lines.
    pub fn read_wakeup_reasons(&self) -> Result<Vec<String>> {
        let file = sys::open_ro(KERNEL_WAKEUP_REASONS)?;
        let s = sys::read_once(&file)?;
        Ok(s.lines().map(str::to_owned).collect())
    }

    /// Reads `KernelSuspendTime`: two whitespace-separated fixed-point
    /// seconds values, `(suspend_time, sleep_time)`. Returns `None` on a
    /// malformed file rather than erroring: a parse failure is treated
    /// as a non-short outcome by callers, not as a failure in itself.
    pub fn read_suspend_time(&self) -> Option<(f64, f64)> {
        let file = sys::open_ro(KERNEL_SUSPEND_TIME).ok()?;
        let s = sys::read_once(&file).ok()?;
        let mut parts = s.split_whitespace();
        let suspend = parts.next()?.parse::<f64>().ok()?;
        let sleep = parts.next()?.parse::<f64>().ok()?;
        Some((suspend, sleep))
    }

    /// Reads every stat file directly under `SuspendStats`, keyed by
    /// file name.
    pub fn read_suspend_stats_dir(&self) -> Result<Vec<(String, String)>> {
        read_sibling_dir(SUSPEND_STATS)
    }

    /// Enumerates subdirectories of `ClassWakeup`, one per kernel wakeup
    /// source, returning `(source_name, sibling_files)`.
    pub fn read_class_wakeup_dir(&self) -> Result<Vec<(String, Vec<(String, String)>)>> {
        let mut out = Vec::new();
        let entries = std::fs::read_dir(CLASS_WAKEUP)?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let siblings = read_sibling_dir(path.to_string_lossy().as_ref()).unwrap_or_default();
            out.push((name, siblings));
        }
        Ok(out)
    }
}

fn read_sibling_dir(dir: &str) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    let entries = std::fs::read_dir(dir)?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Ok(content) = std::fs::read_to_string(&path) {
            out.push((name, content.trim().to_owned()));
        }
    }
    Ok(out)
}
