//! Domain error kinds for the suspend controller.
//!
//! The kernel interface (module [`crate::kernel`]) speaks
//! `std::io::{Error, Result}` directly, since every operation there really
//! is a thin wrapper around a syscall. Everything above that boundary
//! reports failures through [`SuspendError`] instead: most of these
//! conditions (stats-entry-missing, duplicate registration, a dead
//! peer mid-dispatch, empty input) are non-fatal by design and are
//! surfaced to callers as a `bool`/structured status rather than
//! propagated with `?`.

use thiserror::Error;

/// Error kinds produced above the kernel-interface boundary.
#[derive(Error, Debug)]
pub enum SuspendError {
    /// A read of a kernel-exposed file returned an error, or returned no
    /// data where data was required (e.g. an empty `wakeup_count`).
    #[error("failed to read kernel file {path}: {source}")]
    KernelReadFailed {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The write-back of the wakeup count was rejected by the kernel,
    /// meaning a wakeup event raced the read that preceded it.
    #[error("wakeup count changed since read, arm rejected")]
    KernelArmFailed,

    /// The write of `"mem"` to the kernel's `state` file returned a
    /// non-zero/error result.
    #[error("suspend commit failed: {source}")]
    KernelCommitFailed {
        #[source]
        source: std::io::Error,
    },

    /// A release arrived for a `(name, pid)` key that is no longer present
    /// in the stats table, most likely because it was LRU-evicted.
    #[error("wake-lock stats entry for ({name:?}, {pid}) was not found; likely evicted")]
    StatsEntryMissing { name: String, pid: i32 },

    /// The same callback was already registered for the same key.
    #[error("callback already registered")]
    DuplicateRegistration,

    /// A peer died mid-dispatch; the corresponding observer is dropped.
    #[error("observer unavailable, peer died")]
    ServiceUnavailable,

    /// A caller passed an empty lock name or a null/missing callback.
    #[error("empty name or missing callback")]
    NullOrEmptyInput,
}
