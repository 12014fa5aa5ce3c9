//! Bounded statistics (components B and C) plus the data-model snapshot
//! types read live from the kernel.

mod kernel_wakelock;
mod suspend_stats;
mod wakelock;
mod wakeup_reason;

pub use kernel_wakelock::KernelWakeLockInfo;
pub use suspend_stats::SuspendStats;
pub use wakelock::{WakeLockInfo, WakeLockStatsTable};
pub use wakeup_reason::{WakeupInfo, WakeupReasonTable};

use crate::kernel::KernelInterface;

/// Reads the live kernel-wakelock entries from `ClassWakeup`, for
/// callers that want them alongside the caller-tracked wake-lock table.
pub fn read_kernel_wakelocks(kernel: &KernelInterface) -> Vec<KernelWakeLockInfo> {
    match kernel.read_class_wakeup_dir() {
        Ok(sources) => sources
            .into_iter()
            .map(|(name, siblings)| KernelWakeLockInfo::from_siblings(name, &siblings))
            .collect(),
        Err(e) => {
            log::warn!("failed to read wakeup source directory: {e}");
            Vec::new()
        }
    }
}
