//! Core of a user-space opportunistic-suspend controller.
//!
//! Coordinates wake-lock arbitration, the kernel's wakeup-count
//! race-free protocol, adaptive inter-suspend backoff, and bounded
//! wake-lock/wakeup-reason statistics. [`facade::SuspendService`] is the
//! entry point; construct one per process and share it behind an
//! [`std::sync::Arc`].
//!
//! ## Example
//!
//! ```rust
//! use suspend_core::arbiter::Mode;
//! use suspend_core::config::Config;
//! use suspend_core::facade::{SuspendService, WakeLockType};
//!
//! let service = SuspendService::new(&Config::default(), Mode::Counter);
//! let lock = service
//!     .acquire_wake_lock(WakeLockType::Partial, "my-component", std::process::id() as i32)
//!     .unwrap();
//! // ... do work that must not be interrupted by suspend ...
//! lock.release();
//! ```
//!
//! ## Logging
//!
//! This crate logs through the `log` facade only; attach whatever
//! subscriber your binary already uses (`env_logger`, `tracing-log`,
//! etc.) to see its output.

pub mod arbiter;
pub mod callback;
pub mod config;
pub mod error;
pub mod facade;
pub mod kernel;
mod sys;
pub mod stats;
pub mod suspend;

pub use config::Config;
pub use error::SuspendError;
pub use facade::{SuspendService, WakeLockStatsSnapshot, WakeLockType};

/// Ignores `SIGPIPE`, so a dump reader disappearing mid-write doesn't
/// kill the process. Not called automatically; a platform's `main.rs`
/// is expected to call this once during startup, alongside opening the
/// kernel interface and registering RPC services.
pub fn ignore_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}
